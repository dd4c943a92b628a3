//! Billing-minutes calculator
//!
//! Converts session durations into billable hours using fixed buckets. Each
//! meeting is bucketed on its own and the results are summed.

use crate::error::ProgressError;
use crate::schema::ValidationError;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Billing cap per meeting
pub const MAX_BILLABLE_HOURS: u32 = 3;

/// Billable hours for a single duration in minutes
pub fn billable_hours(duration_minutes: i64) -> u32 {
    match duration_minutes {
        i64::MIN..=0 => 0,
        1..=89 => 1,
        90..=149 => 2,
        _ => MAX_BILLABLE_HOURS,
    }
}

/// One meeting within a day, times in `HH:MM`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub start: String,
    pub end: String,
}

impl Meeting {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Duration in minutes; `index` locates the meeting in error messages
    fn duration_minutes(&self, index: usize) -> Result<i64, ValidationError> {
        let start = parse_clock(&self.start, index)?;
        let end = parse_clock(&self.end, index)?;

        if end < start {
            return Err(ValidationError::InvalidMeeting {
                index,
                reason: format!("ends at {} before it starts at {}", self.end, self.start),
            });
        }

        Ok((end - start).num_minutes())
    }
}

fn parse_clock(value: &str, index: usize) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| ValidationError::InvalidMeeting {
        index,
        reason: format!("invalid time {:?}, expected HH:MM", value),
    })
}

/// Realized minutes and billed hours over a set of meetings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingTotals {
    pub minutes_realized: i64,
    pub hours_billed: u32,
}

/// Sum durations and per-meeting billed hours
pub fn total_for_meetings(meetings: &[Meeting]) -> Result<MeetingTotals, ProgressError> {
    let mut totals = MeetingTotals::default();

    for (index, meeting) in meetings.iter().enumerate() {
        let minutes = meeting.duration_minutes(index)?;
        totals.minutes_realized += minutes;
        totals.hours_billed += billable_hours(minutes);
    }

    log::debug!(
        "Billed {} hours for {} minutes over {} meetings",
        totals.hours_billed,
        totals.minutes_realized,
        meetings.len()
    );

    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_billable_hour_buckets() {
        assert_eq!(billable_hours(-5), 0);
        assert_eq!(billable_hours(0), 0);
        assert_eq!(billable_hours(1), 1);
        assert_eq!(billable_hours(89), 1);
        assert_eq!(billable_hours(90), 2);
        assert_eq!(billable_hours(149), 2);
        assert_eq!(billable_hours(150), 3);
        assert_eq!(billable_hours(600), 3);
        assert_eq!(billable_hours(i64::MAX), 3);
    }

    #[test]
    fn test_billable_hours_monotonic() {
        for minutes in -10..300 {
            assert!(billable_hours(minutes) <= billable_hours(minutes + 1));
        }
    }

    #[test]
    fn test_each_meeting_bucketed_individually() {
        let two_short = [Meeting::new("08:00", "09:00"), Meeting::new("10:00", "11:00")];
        assert_eq!(
            total_for_meetings(&two_short).unwrap(),
            MeetingTotals {
                minutes_realized: 120,
                hours_billed: 2,
            }
        );

        let one_long = [Meeting::new("08:00", "10:00")];
        assert_eq!(
            total_for_meetings(&one_long).unwrap(),
            MeetingTotals {
                minutes_realized: 120,
                hours_billed: 2,
            }
        );

        let three = [
            Meeting::new("08:00", "08:50"),
            Meeting::new("09:00", "09:50"),
            Meeting::new("10:00", "10:50"),
        ];
        assert_eq!(
            total_for_meetings(&three).unwrap(),
            MeetingTotals {
                minutes_realized: 150,
                hours_billed: 3,
            }
        );
    }

    #[test]
    fn test_zero_length_and_empty() {
        assert_eq!(
            total_for_meetings(&[Meeting::new("14:30", "14:30")]).unwrap(),
            MeetingTotals::default()
        );
        assert_eq!(total_for_meetings(&[]).unwrap(), MeetingTotals::default());
    }

    #[test]
    fn test_reversed_meeting_rejected() {
        let meetings = [Meeting::new("08:00", "09:00"), Meeting::new("17:00", "16:00")];
        let err = total_for_meetings(&meetings).unwrap_err();
        match err {
            ProgressError::Validation(ValidationError::InvalidMeeting { index, .. }) => {
                assert_eq!(index, 1)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_time_rejected() {
        for bad in ["8h", "25:00", "", "08:00:00"] {
            let err = total_for_meetings(&[Meeting::new(bad, "09:00")]).unwrap_err();
            assert!(matches!(
                err,
                ProgressError::Validation(ValidationError::InvalidMeeting { index: 0, .. })
            ));
        }
    }

    #[test]
    fn test_meeting_serde() {
        let meetings: Vec<Meeting> =
            serde_json::from_str(r#"[{"start": "13:00", "end": "15:30"}]"#).unwrap();
        assert_eq!(total_for_meetings(&meetings).unwrap().hours_billed, 3);
    }
}
