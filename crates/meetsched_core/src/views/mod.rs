//! Reactive read model over the entity store.
//!
//! # Responsibility
//! - Derive every list and join by query; no view keeps its own mutable copy
//!   of entity state.
//! - Recompute views after committed writes to the tables they read.
//!
//! # Invariants
//! - A view is recomputed only from committed state.
//! - A response whose participant no longer resolves is rendered with
//!   [`UNKNOWN_NAME`] and logged as an integrity warning.

mod live;
mod queries;

pub use live::{watch, LiveView};
pub use queries::{
    list_hosts, list_meetings, list_participants, meeting_overviews, responses_for,
    MeetingOverview, ResponseEntry, UNKNOWN_NAME,
};
