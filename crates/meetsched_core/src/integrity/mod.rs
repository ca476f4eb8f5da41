//! Integrity engine: referential rules the store does not enforce itself.
//!
//! # Responsibility
//! - Reject writes that would reference missing hosts, meetings or
//!   participants.
//! - Cascade deletes so no meeting outlives its host and no response
//!   outlives its meeting or participant.
//! - Keep at most one response per `(meeting, participant)` pair.
//!
//! # Invariants
//! - Every rule runs as one store transaction: check and act cannot be
//!   interleaved by another writer, and a failure leaves no partial effect.
//! - Dependents are removed before the row they depend on.

mod cascade;
mod upsert;

pub use cascade::{delete_host, delete_meeting, delete_participant, sweep_orphans};
pub use upsert::{schedule_meeting, submit_response};

use crate::model::ResponseId;
use serde::Serialize;

/// Rows removed by one cascading delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub meetings_removed: usize,
    pub responses_removed: usize,
}

/// Rows removed or merged by [`sweep_orphans`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Meetings whose host no longer exists.
    pub orphan_meetings: usize,
    /// Responses whose meeting or participant no longer exists.
    pub orphan_responses: usize,
    /// Extra responses for a pair that already had one.
    pub duplicate_responses: usize,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.orphan_meetings == 0 && self.orphan_responses == 0 && self.duplicate_responses == 0
    }
}

/// Whether a submission created a new response or replaced the answer of an
/// existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "response_id", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Created(ResponseId),
    Updated(ResponseId),
}

impl SubmitOutcome {
    pub fn response_id(self) -> ResponseId {
        match self {
            Self::Created(id) | Self::Updated(id) => id,
        }
    }
}
