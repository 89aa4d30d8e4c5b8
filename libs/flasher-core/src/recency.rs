//! Coarse "last studied" labels.
//!
//! Elapsed time is measured in whole minutes (floored, absolute value) and bucketed:
//! under an hour shows minutes, under a day shows hours, anything longer shows days.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MINUTES_PER_HOUR: i64 = 60;
pub const MINUTES_PER_DAY: i64 = 1440;

/// Human-readable time since a deck was last studied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum RelativeLabel {
    Minutes(i64),
    Hours(i64),
    Days(i64),
}

impl RelativeLabel {
    /// Bucket an elapsed duration. Negative durations (clock skew) count as positive.
    pub fn from_elapsed(elapsed: Duration) -> Self {
        let minutes = elapsed.num_minutes().abs();

        if minutes < MINUTES_PER_HOUR {
            Self::Minutes(minutes)
        } else if minutes < MINUTES_PER_DAY {
            Self::Hours(minutes / MINUTES_PER_HOUR)
        } else {
            Self::Days(minutes / MINUTES_PER_DAY)
        }
    }

    /// Label for a session that happened at `then`, seen from `now`.
    pub fn between(then: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self::from_elapsed(now.signed_duration_since(then))
    }

    /// The number shown in the label.
    pub fn value(&self) -> i64 {
        match *self {
            Self::Minutes(n) | Self::Hours(n) | Self::Days(n) => n,
        }
    }

    fn unit(&self) -> &'static str {
        match self {
            Self::Minutes(_) => "minute",
            Self::Hours(_) => "hour",
            Self::Days(_) => "day",
        }
    }
}

impl fmt::Display for RelativeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.value();
        let plural = if n == 1 { "" } else { "s" };
        write!(f, "{} {}{} ago", n, self.unit(), plural)
    }
}
