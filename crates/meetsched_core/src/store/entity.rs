//! Row codecs binding each record type to its table.

use super::{StoreError, StoreResult};
use crate::model::host::{Host, HostPatch, NewHost};
use crate::model::meeting::{Meeting, MeetingPatch, NewMeeting, DATE_FORMAT};
use crate::model::participant::{NewParticipant, Participant, ParticipantPatch};
use crate::model::response::{NewResponse, Response, ResponsePatch, ResponseValue};
use crate::model::validation::{optional_email, positive_id, required_text, ValidationError};
use crate::model::RecordId;
use crate::schema::{Table, ID_COLUMN};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::Row;

/// A record type persisted in one [`Table`].
pub trait Entity: Sized {
    const TABLE: Table;
    /// Insert payload; the store assigns the id.
    type New;
    /// Partial update payload.
    type Patch;

    /// Checks an insert payload before it reaches SQL.
    fn validate_new(new: &Self::New) -> Result<(), ValidationError>;
    /// Checks a patch before it reaches SQL.
    fn validate_patch(patch: &Self::Patch) -> Result<(), ValidationError>;
    /// Values for `Self::TABLE.columns()`, in the same order.
    fn insert_values(new: &Self::New) -> Vec<Value>;
    /// `(column, value)` pairs for the fields the patch sets.
    fn patch_values(patch: &Self::Patch) -> Vec<(&'static str, Value)>;
    /// Decodes one row selected with `Self::TABLE.select_sql()`.
    fn from_row(row: &Row<'_>) -> StoreResult<Self>;
}

impl Entity for Host {
    const TABLE: Table = Table::Hosts;
    type New = NewHost;
    type Patch = HostPatch;

    fn validate_new(new: &NewHost) -> Result<(), ValidationError> {
        required_text("name", &new.name)?;
        optional_email("email", new.email.as_deref())?;
        Ok(())
    }

    fn validate_patch(patch: &HostPatch) -> Result<(), ValidationError> {
        validate_contact_patch(patch.name.as_deref(), patch.email.as_ref())
    }

    fn insert_values(new: &NewHost) -> Vec<Value> {
        vec![text(&new.name), optional_text(new.email.as_deref())]
    }

    fn patch_values(patch: &HostPatch) -> Vec<(&'static str, Value)> {
        contact_patch_values(patch.name.as_deref(), patch.email.as_ref())
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get(ID_COLUMN)?,
            name: row.get("name")?,
            email: row.get("email")?,
        })
    }
}

impl Entity for Participant {
    const TABLE: Table = Table::Participants;
    type New = NewParticipant;
    type Patch = ParticipantPatch;

    fn validate_new(new: &NewParticipant) -> Result<(), ValidationError> {
        required_text("name", &new.name)?;
        optional_email("email", new.email.as_deref())?;
        Ok(())
    }

    fn validate_patch(patch: &ParticipantPatch) -> Result<(), ValidationError> {
        validate_contact_patch(patch.name.as_deref(), patch.email.as_ref())
    }

    fn insert_values(new: &NewParticipant) -> Vec<Value> {
        vec![text(&new.name), optional_text(new.email.as_deref())]
    }

    fn patch_values(patch: &ParticipantPatch) -> Vec<(&'static str, Value)> {
        contact_patch_values(patch.name.as_deref(), patch.email.as_ref())
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get(ID_COLUMN)?,
            name: row.get("name")?,
            email: row.get("email")?,
        })
    }
}

impl Entity for Meeting {
    const TABLE: Table = Table::Meetings;
    type New = NewMeeting;
    type Patch = MeetingPatch;

    fn validate_new(new: &NewMeeting) -> Result<(), ValidationError> {
        required_text("name", &new.name)?;
        positive_id("host_id", new.host_id)?;
        required_text("location", &new.location)?;
        Ok(())
    }

    fn validate_patch(patch: &MeetingPatch) -> Result<(), ValidationError> {
        if let Some(name) = patch.name.as_deref() {
            required_text("name", name)?;
        }
        if let Some(location) = patch.location.as_deref() {
            required_text("location", location)?;
        }
        Ok(())
    }

    fn insert_values(new: &NewMeeting) -> Vec<Value> {
        vec![
            text(&new.name),
            Value::Integer(new.host_id),
            text(&new.location),
            date_value(new.date),
        ]
    }

    fn patch_values(patch: &MeetingPatch) -> Vec<(&'static str, Value)> {
        let mut values = Vec::new();
        if let Some(name) = patch.name.as_deref() {
            values.push(("name", text(name)));
        }
        if let Some(location) = patch.location.as_deref() {
            values.push(("location", text(location)));
        }
        if let Some(date) = patch.date {
            values.push(("date", date_value(date)));
        }
        values
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        let date_text: String = row.get("date")?;
        let date = NaiveDate::parse_from_str(date_text.trim(), DATE_FORMAT).map_err(|_| {
            StoreError::InvalidData(format!("invalid date `{date_text}` in meetings.date"))
        })?;

        Ok(Self {
            id: row.get(ID_COLUMN)?,
            name: row.get("name")?,
            host_id: row.get("host_id")?,
            location: row.get("location")?,
            date,
        })
    }
}

impl Entity for Response {
    const TABLE: Table = Table::Responses;
    type New = NewResponse;
    type Patch = ResponsePatch;

    fn validate_new(new: &NewResponse) -> Result<(), ValidationError> {
        positive_id("meeting_id", new.meeting_id)?;
        positive_id("participant_id", new.participant_id)?;
        Ok(())
    }

    fn validate_patch(_patch: &ResponsePatch) -> Result<(), ValidationError> {
        Ok(())
    }

    fn insert_values(new: &NewResponse) -> Vec<Value> {
        vec![
            Value::Integer(new.meeting_id),
            Value::Integer(new.participant_id),
            text(new.response.as_str()),
        ]
    }

    fn patch_values(patch: &ResponsePatch) -> Vec<(&'static str, Value)> {
        patch
            .response
            .map(|kind| vec![("response", text(kind.as_str()))])
            .unwrap_or_default()
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        let stored: String = row.get("response")?;
        Ok(Self {
            id: row.get(ID_COLUMN)?,
            meeting_id: row.get("meeting_id")?,
            participant_id: row.get("participant_id")?,
            response: ResponseValue::from_stored(&stored),
        })
    }
}

/// Reads the id column of any table row.
pub(crate) fn row_id(row: &Row<'_>) -> StoreResult<RecordId> {
    Ok(row.get(ID_COLUMN)?)
}

fn validate_contact_patch(
    name: Option<&str>,
    email: Option<&Option<String>>,
) -> Result<(), ValidationError> {
    if let Some(name) = name {
        required_text("name", name)?;
    }
    if let Some(email) = email {
        optional_email("email", email.as_deref())?;
    }
    Ok(())
}

fn contact_patch_values(
    name: Option<&str>,
    email: Option<&Option<String>>,
) -> Vec<(&'static str, Value)> {
    let mut values = Vec::new();
    if let Some(name) = name {
        values.push(("name", text(name)));
    }
    if let Some(email) = email {
        values.push(("email", optional_text(email.as_deref())));
    }
    values
}

fn text(value: &str) -> Value {
    Value::Text(value.trim().to_string())
}

fn optional_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, text)
}

fn date_value(date: NaiveDate) -> Value {
    Value::Text(date.format(DATE_FORMAT).to_string())
}
