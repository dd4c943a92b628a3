//! Backend session schema
//!
//! This module defines the raw session payloads the practice backend returns
//! and the boundary adapter that validates them into canonical sessions.

mod adapter;
mod raw_session;

pub use adapter::*;
pub use raw_session::*;
