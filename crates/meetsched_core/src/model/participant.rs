//! Participant record: someone who responds to meetings.

use super::validation::{optional_email, required_text, ValidationError};
use super::ParticipantId;
use serde::{Deserialize, Serialize};

/// Persisted participant row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    /// Absent on rows written before contact emails existed.
    pub email: Option<String>,
}

/// Validated insert payload for [`Participant`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewParticipant {
    pub name: String,
    pub email: Option<String>,
}

impl NewParticipant {
    pub fn new(name: &str, email: Option<&str>) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required_text("name", name)?,
            email: optional_email("email", email)?,
        })
    }
}

/// Partial update for [`Participant`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantPatch {
    pub name: Option<String>,
    pub email: Option<Option<String>>,
}
