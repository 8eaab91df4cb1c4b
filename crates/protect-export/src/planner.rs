//! Splits a requested export range into appliance-sized windows.
//!
//! The export endpoint rejects overly long ranges, so a job's `[start, end)`
//! span is walked in fixed-size steps, with the final window clipped to the
//! requested end.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// One bounded sub-range of an export job.
///
/// Invariant: `end > start` and `end - start` never exceeds the planner's
/// maximum window duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

/// Lazily yield contiguous, non-overlapping windows covering `[start, end)`
/// exactly once, each at most `max` long.
///
/// Yields nothing when `start >= end` or `max` is non-positive.
pub fn split_windows(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    max: TimeDelta,
) -> impl Iterator<Item = TimeWindow> {
    Windows {
        cursor: start,
        end,
        max,
    }
}

struct Windows {
    cursor: DateTime<Utc>,
    end: DateTime<Utc>,
    max: TimeDelta,
}

impl Iterator for Windows {
    type Item = TimeWindow;

    fn next(&mut self) -> Option<TimeWindow> {
        if self.cursor >= self.end || self.max <= TimeDelta::zero() {
            return None;
        }
        let window_end = (self.cursor + self.max).min(self.end);
        let window = TimeWindow {
            start: self.cursor,
            end: window_end,
        };
        self.cursor = window_end;
        Some(window)
    }
}
