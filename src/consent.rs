//! Consent records and the calendar-month expiration policy.

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CmError;

/// Textual timestamp pattern shared by every storage backend.
pub const TIME_PATTERN: &str = "%Y %m %d %H:%M:%S";

/// A subject's standing decision to release attributes.
///
/// `attributes: None` means consent covers every requested attribute;
/// `Some(list)` restricts release to the listed names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consent {
    pub attributes: Option<Vec<String>>,
    pub months_valid: u32,
    pub created_at: DateTime<Utc>,
}

impl Consent {
    pub fn new(attributes: Option<Vec<String>>, months_valid: u32) -> Self {
        Self::with_created_at(attributes, months_valid, Utc::now())
    }

    /// Timestamps are truncated to whole seconds so a record compares equal
    /// to itself after a trip through the textual storage pattern.
    pub fn with_created_at(
        attributes: Option<Vec<String>>,
        months_valid: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            attributes,
            months_valid,
            created_at: truncate_to_second(created_at),
        }
    }

    /// Expired when at least `min(months_valid, max_months_valid)` whole
    /// calendar months have elapsed since creation. A consent valid for one
    /// month created on Jan 1 is expired on Feb 1.
    pub fn has_expired(&self, max_months_valid: u32) -> Result<bool, CmError> {
        self.has_expired_at(max_months_valid, Utc::now())
    }

    pub fn has_expired_at(
        &self,
        max_months_valid: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, CmError> {
        let effective = self.months_valid.min(max_months_valid);
        Ok(month_delta(self.created_at, now)? >= effective)
    }
}

/// Whole calendar months elapsed from `start` to `now`, at day granularity:
/// the year/month difference, minus one when `now` has not yet reached the
/// start's day of month. A record from the future is a clock error, not a
/// negative delta.
pub fn month_delta(start: DateTime<Utc>, now: DateTime<Utc>) -> Result<u32, CmError> {
    if start > now {
        return Err(CmError::ClockSkew {
            created_at: start,
            now,
        });
    }
    let mut delta =
        (now.year() - start.year()) * 12 + now.month() as i32 - start.month() as i32;
    if now.day() < start.day() {
        delta -= 1;
    }
    Ok(delta.max(0) as u32)
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIME_PATTERN).to_string()
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, CmError> {
    NaiveDateTime::parse_from_str(s, TIME_PATTERN)
        .map(|naive| naive.and_utc())
        .map_err(|e| CmError::Other(format!("unparseable stored timestamp {s:?}: {e}")))
}

fn truncate_to_second(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond(0).unwrap_or(ts)
}
