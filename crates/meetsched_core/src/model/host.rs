//! Host record: the person who owns meetings.

use super::validation::{optional_email, required_text, ValidationError};
use super::HostId;
use serde::{Deserialize, Serialize};

/// Persisted host row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: HostId,
    pub name: String,
    /// Absent on rows written before contact emails existed.
    pub email: Option<String>,
}

/// Validated insert payload for [`Host`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHost {
    pub name: String,
    pub email: Option<String>,
}

impl NewHost {
    /// Trims and validates raw input.
    pub fn new(name: &str, email: Option<&str>) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required_text("name", name)?,
            email: optional_email("email", email)?,
        })
    }
}

/// Partial update for [`Host`]; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostPatch {
    pub name: Option<String>,
    /// `Some(None)` clears the email.
    pub email: Option<Option<String>>,
}
