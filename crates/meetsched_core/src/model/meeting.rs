//! Meeting record.
//!
//! # Invariants
//! - `host_id` resolved to an existing host when the meeting was created.
//! - A meeting never outlives its host; removal goes through the host cascade.

use super::validation::{positive_id, required_text, ValidationError};
use super::{HostId, MeetingId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Storage format for [`Meeting::date`].
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Persisted meeting row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub name: String,
    pub host_id: HostId,
    pub location: String,
    pub date: NaiveDate,
}

/// Validated insert payload for [`Meeting`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMeeting {
    pub name: String,
    pub host_id: HostId,
    pub location: String,
    pub date: NaiveDate,
}

impl NewMeeting {
    pub fn new(
        name: &str,
        host_id: HostId,
        location: &str,
        date: NaiveDate,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required_text("name", name)?,
            host_id: positive_id("host_id", host_id)?,
            location: required_text("location", location)?,
            date,
        })
    }
}

/// Partial update for [`Meeting`].
///
/// `host_id` is deliberately absent: re-hosting would bypass the host check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeetingPatch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = required_text("date", value)?;
    NaiveDate::parse_from_str(&trimmed, DATE_FORMAT).map_err(|_| ValidationError::Malformed {
        field: "date",
        value: trimmed,
    })
}
