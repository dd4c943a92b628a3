//! Therapy Progress - attempt aggregation and status classification for therapy sessions
//!
//! The engine turns per-stimulus trial outcomes recorded during therapy sessions
//! into counts, categorical statuses, session summaries, and multi-session
//! attention reports through a deterministic pipeline: boundary validation →
//! counts aggregation → status classification → report encoding.
//!
//! ## Modules
//!
//! - **Core**: `aggregate`, `classify`, `summary`, `window`, `billing`
//! - **Recording**: `live` keeps the single-writer trial log of an in-progress session
//! - **Outer surfaces**: `schema` (input boundary), `report`, `pipeline`, `ffi`

pub mod aggregate;
pub mod billing;
pub mod classify;
pub mod config;
pub mod error;
pub mod labels;
pub mod live;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod schema;
pub mod summary;
pub mod types;
pub mod window;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use aggregate::{aggregate, sum_counts, MissingStimulusPolicy, StimulusCounts};
pub use billing::{billable_hours, total_for_meetings, Meeting, MeetingTotals};
pub use classify::{classify_predominance, classify_ratio, RatioClassificationPolicy};
pub use config::{CallSite, EngineConfig};
pub use error::ProgressError;
pub use labels::Discipline;
pub use live::LiveSession;
pub use pipeline::{attention_report, billing_report, session_report, ProgressEngine};
pub use summary::{summarize, AccuracyPolicy};
pub use types::{Counts, Session, SessionSummary, Status, StimulusSummary, Trial, TrialOutcome};
pub use window::{aggregate_window, WindowFilters, WindowReport, WindowSize};

// Schema exports
pub use schema::{RawSession, SessionAdapter, ValidationError};

/// Engine version embedded in all reports
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "therapy-progress";
