//! Meeting response record and its value encoding.
//!
//! # Invariants
//! - At most one response exists per `(meeting_id, participant_id)` pair.
//! - New writes only produce [`ResponseKind`] values; free text survives only
//!   as [`ResponseValue::Legacy`] when read from older data.

use super::validation::{positive_id, ValidationError};
use super::{MeetingId, ParticipantId, ResponseId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Answer a participant can submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Accepted,
    Declined,
}

impl ResponseKind {
    /// Stored text for this answer.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }

    /// Parses user input case-insensitively.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty("response"));
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "accepted" | "accept" | "yes" => Ok(Self::Accepted),
            "declined" | "decline" | "no" => Ok(Self::Declined),
            _ => Err(ValidationError::Malformed {
                field: "response",
                value: trimmed.to_string(),
            }),
        }
    }
}

impl Display for ResponseKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response value as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseValue {
    Accepted,
    Declined,
    /// Free text written by early builds.
    Legacy(String),
}

impl ResponseValue {
    /// Decodes stored text; unrecognized text is kept verbatim.
    pub fn from_stored(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "accepted" => Self::Accepted,
            "declined" => Self::Declined,
            _ => Self::Legacy(value.to_string()),
        }
    }

    /// Enumerated form, if any.
    pub fn kind(&self) -> Option<ResponseKind> {
        match self {
            Self::Accepted => Some(ResponseKind::Accepted),
            Self::Declined => Some(ResponseKind::Declined),
            Self::Legacy(_) => None,
        }
    }
}

impl From<ResponseKind> for ResponseValue {
    fn from(value: ResponseKind) -> Self {
        match value {
            ResponseKind::Accepted => Self::Accepted,
            ResponseKind::Declined => Self::Declined,
        }
    }
}

impl Display for ResponseValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accepted => f.write_str("Accepted"),
            Self::Declined => f.write_str("Declined"),
            Self::Legacy(text) => f.write_str(text),
        }
    }
}

/// Persisted response row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub id: ResponseId,
    pub meeting_id: MeetingId,
    pub participant_id: ParticipantId,
    pub response: ResponseValue,
}

/// Validated insert payload for [`Response`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResponse {
    pub meeting_id: MeetingId,
    pub participant_id: ParticipantId,
    pub response: ResponseKind,
}

impl NewResponse {
    pub fn new(
        meeting_id: MeetingId,
        participant_id: ParticipantId,
        response: ResponseKind,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            meeting_id: positive_id("meeting_id", meeting_id)?,
            participant_id: positive_id("participant_id", participant_id)?,
            response,
        })
    }
}

/// Partial update for [`Response`]. Only the answer itself can change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponsePatch {
    pub response: Option<ResponseKind>,
}
