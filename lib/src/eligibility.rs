//! Decides whether a will can be claimed now.
//!
//! All comparisons happen in whole Unix seconds. The ledger may store expiry
//! in milliseconds; [`TimeUnit`] converts it before anything is compared.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::WillError;

/// Unit of a raw timestamp read from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
}

impl TimeUnit {
    /// Truncates to whole seconds.
    pub fn to_seconds(self, raw: u64) -> u64 {
        match self {
            TimeUnit::Seconds => raw,
            TimeUnit::Milliseconds => raw / 1000,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = WillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "seconds" => Ok(TimeUnit::Seconds),
            "ms" | "millis" | "milliseconds" => Ok(TimeUnit::Milliseconds),
            other => Err(WillError::Validation(format!("unknown time unit \"{other}\""))),
        }
    }
}

/// Unix time in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub fn from_raw(raw: u64, unit: TimeUnit) -> Self {
        Self(unit.to_seconds(raw))
    }

    pub fn now() -> Self {
        Self(Utc::now().timestamp().max(0) as u64)
    }

    pub fn as_secs(self) -> u64 {
        self.0
    }

    /// RFC 3339 in UTC, or the bare number when outside chrono's range.
    pub fn to_display(self) -> String {
        i64::try_from(self.0)
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| self.0.to_string())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Claimable,
    NotYetEligible { expiry: Timestamp },
}

impl Eligibility {
    pub fn is_claimable(&self) -> bool {
        matches!(self, Eligibility::Claimable)
    }

    /// Turns a rejection into [`WillError::NotYetEligible`], keeping the raw
    /// ledger value for the caller.
    pub fn ensure_claimable(self, raw_expiry: u64) -> Result<(), WillError> {
        match self {
            Eligibility::Claimable => Ok(()),
            Eligibility::NotYetEligible { expiry } => Err(WillError::NotYetEligible {
                expiry_date: expiry.to_display(),
                raw_expiry,
            }),
        }
    }
}

/// Claimable iff the expiry is strictly in the past or the override flag is set.
pub fn evaluate(expiry: Timestamp, override_flag: bool, now: Timestamp) -> Eligibility {
    if expiry < now || override_flag {
        Eligibility::Claimable
    } else {
        Eligibility::NotYetEligible { expiry }
    }
}
