//! Schema definitions for the four scheduler tables.
//!
//! # Responsibility
//! - Name every table, column and secondary lookup field in one place.
//! - Let store and integrity code resolve table names through [`Table`]
//!   instead of string literals.
//!
//! # Invariants
//! - `id` is the primary key of every table and is store-assigned.
//! - An [`IndexedField`] always belongs to exactly one table.

use std::fmt::{Display, Formatter};

/// Name of the primary key column shared by all tables.
pub const ID_COLUMN: &str = "id";

/// One persisted entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    Hosts,
    Meetings,
    Participants,
    Responses,
}

impl Table {
    /// Every table, in dependency order (referenced tables first).
    pub const ALL: [Table; 4] = [
        Table::Hosts,
        Table::Meetings,
        Table::Participants,
        Table::Responses,
    ];

    /// SQL table name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Hosts => "hosts",
            Self::Meetings => "meetings",
            Self::Participants => "participants",
            Self::Responses => "responses",
        }
    }

    /// Non-key columns in select order.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Hosts => &["name", "email"],
            Self::Meetings => &["name", "host_id", "location", "date"],
            Self::Participants => &["name", "email"],
            Self::Responses => &["meeting_id", "participant_id", "response"],
        }
    }

    /// Fields this table can be looked up by besides `id`.
    pub fn indexed_fields(self) -> &'static [IndexedField] {
        match self {
            Self::Hosts | Self::Participants => &[],
            Self::Meetings => &[IndexedField::MeetingHost],
            Self::Responses => &[
                IndexedField::ResponseMeeting,
                IndexedField::ResponseParticipant,
            ],
        }
    }

    /// `SELECT id, <columns> FROM <table>` without a trailing clause.
    pub fn select_sql(self) -> String {
        format!(
            "SELECT {ID_COLUMN}, {} FROM {}",
            self.columns().join(", "),
            self.name()
        )
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Secondary (non-primary) lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexedField {
    /// `meetings.host_id`
    MeetingHost,
    /// `responses.meeting_id`
    ResponseMeeting,
    /// `responses.participant_id`
    ResponseParticipant,
}

impl IndexedField {
    pub fn table(self) -> Table {
        match self {
            Self::MeetingHost => Table::Meetings,
            Self::ResponseMeeting | Self::ResponseParticipant => Table::Responses,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::MeetingHost => "host_id",
            Self::ResponseMeeting => "meeting_id",
            Self::ResponseParticipant => "participant_id",
        }
    }
}

impl Display for IndexedField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.table().name(), self.column())
    }
}
