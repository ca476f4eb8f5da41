//! Domain model for hosts, participants, meetings and responses.
//!
//! # Responsibility
//! - Define the record shapes persisted by the entity store.
//! - Validate and normalize user input before it reaches storage.
//!
//! # Invariants
//! - Record ids are store-assigned, positive and never reused.
//! - Fields added by later schema versions are `Option`s; absence means unset.

pub mod host;
pub mod meeting;
pub mod participant;
pub mod response;
pub mod validation;

/// Store-assigned row identifier.
pub type RecordId = i64;
pub type HostId = RecordId;
pub type MeetingId = RecordId;
pub type ParticipantId = RecordId;
pub type ResponseId = RecordId;
