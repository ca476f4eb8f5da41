//! Core domain logic for the meeting scheduler.
//! This crate is the single source of truth for referential integrity
//! between hosts, meetings, participants and responses.

pub mod config;
pub mod db;
pub mod error;
pub mod integrity;
pub mod logging;
pub mod model;
pub mod schema;
pub mod service;
pub mod store;
pub mod views;

pub use config::{LogConfig, SchedulerConfig, StoreConfig, StoreLocation};
pub use db::{open_db, open_db_in_memory, open_with_config, DbError, DbResult};
pub use error::{SchedulerError, SchedulerResult};
pub use integrity::{CascadeReport, SubmitOutcome, SweepReport};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::host::{Host, NewHost};
pub use model::meeting::{parse_date, Meeting, NewMeeting};
pub use model::participant::{NewParticipant, Participant};
pub use model::response::{NewResponse, Response, ResponseKind, ResponseValue};
pub use model::validation::ValidationError;
pub use model::{HostId, MeetingId, ParticipantId, RecordId, ResponseId};
pub use schema::{IndexedField, Table};
pub use service::scheduler_service::Scheduler;
pub use store::{EntityStore, StoreError, StoreResult};
pub use views::{LiveView, MeetingOverview, ResponseEntry, UNKNOWN_NAME};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
