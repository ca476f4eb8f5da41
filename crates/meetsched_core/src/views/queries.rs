//! Read queries backing the live views.

use crate::model::host::Host;
use crate::model::meeting::Meeting;
use crate::model::participant::Participant;
use crate::model::response::ResponseValue;
use crate::model::{MeetingId, ParticipantId, ResponseId};
use crate::schema::{IndexedField, Table, ID_COLUMN};
use crate::store::{StoreReader, StoreResult};
use log::warn;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Stand-in name for a reference that no longer resolves.
pub const UNKNOWN_NAME: &str = "Unknown";

/// One response joined with its participant's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseEntry {
    pub response_id: ResponseId,
    pub participant_id: ParticipantId,
    /// [`UNKNOWN_NAME`] when the participant row is gone.
    pub participant_name: String,
    pub response: ResponseValue,
}

/// A meeting with its host name and responses, as a meetings list shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeetingOverview {
    pub meeting: Meeting,
    /// [`UNKNOWN_NAME`] when the host row is gone.
    pub host_name: String,
    pub responses: Vec<ResponseEntry>,
}

pub fn list_hosts(reader: &StoreReader<'_>) -> StoreResult<Vec<Host>> {
    reader.list_all()
}

pub fn list_meetings(reader: &StoreReader<'_>) -> StoreResult<Vec<Meeting>> {
    reader.list_all()
}

pub fn list_participants(reader: &StoreReader<'_>) -> StoreResult<Vec<Participant>> {
    reader.list_all()
}

/// Responses to `meeting_id` joined with participant names, oldest first.
pub fn responses_for(
    reader: &StoreReader<'_>,
    meeting_id: MeetingId,
) -> StoreResult<Vec<ResponseEntry>> {
    let rows = select_response_rows(reader.connection(), Some(meeting_id))?;
    Ok(rows.into_iter().map(|(_, entry)| entry).collect())
}

/// Every meeting with host name and joined responses, read from one snapshot.
pub fn meeting_overviews(reader: &StoreReader<'_>) -> StoreResult<Vec<MeetingOverview>> {
    reader.snapshot(|reader| {
        let meetings = reader.list_all::<Meeting>()?;
        let host_names: HashMap<_, _> = reader
            .list_all::<Host>()?
            .into_iter()
            .map(|host| (host.id, host.name))
            .collect();

        let mut responses_by_meeting: BTreeMap<MeetingId, Vec<ResponseEntry>> = BTreeMap::new();
        for (meeting_id, entry) in select_response_rows(reader.connection(), None)? {
            responses_by_meeting.entry(meeting_id).or_default().push(entry);
        }

        Ok(meetings
            .into_iter()
            .map(|meeting| {
                let host_name = host_names.get(&meeting.host_id).cloned().unwrap_or_else(|| {
                    warn!(
                        "event=orphan_detected module=views status=warn kind=meeting meeting_id={} host_id={}",
                        meeting.id, meeting.host_id
                    );
                    UNKNOWN_NAME.to_string()
                });
                let responses = responses_by_meeting.remove(&meeting.id).unwrap_or_default();
                MeetingOverview {
                    meeting,
                    host_name,
                    responses,
                }
            })
            .collect())
    })
}

fn select_response_rows(
    conn: &Connection,
    meeting_id: Option<MeetingId>,
) -> StoreResult<Vec<(MeetingId, ResponseEntry)>> {
    let responses = Table::Responses.name();
    let participants = Table::Participants.name();
    let meeting_column = IndexedField::ResponseMeeting.column();
    let participant_column = IndexedField::ResponseParticipant.column();

    let mut sql = format!(
        "SELECT
            r.{ID_COLUMN} AS response_id,
            r.{meeting_column} AS meeting_id,
            r.{participant_column} AS participant_id,
            p.name AS participant_name,
            r.response AS response
         FROM {responses} r
         LEFT JOIN {participants} p ON p.{ID_COLUMN} = r.{participant_column}"
    );
    let mut bind_values = Vec::new();
    if let Some(meeting_id) = meeting_id {
        sql.push_str(&format!(" WHERE r.{meeting_column} = ?1"));
        bind_values.push(Value::Integer(meeting_id));
    }
    sql.push_str(&format!(" ORDER BY r.{ID_COLUMN} ASC;"));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        let response_id: ResponseId = row.get("response_id")?;
        let meeting_id: MeetingId = row.get("meeting_id")?;
        let participant_id: ParticipantId = row.get("participant_id")?;
        let participant_name = match row.get::<_, Option<String>>("participant_name")? {
            Some(name) => name,
            None => {
                warn!(
                    "event=orphan_detected module=views status=warn kind=response response_id={} participant_id={}",
                    response_id, participant_id
                );
                UNKNOWN_NAME.to_string()
            }
        };
        let stored: String = row.get("response")?;

        entries.push((
            meeting_id,
            ResponseEntry {
                response_id,
                participant_id,
                participant_name,
                response: ResponseValue::from_stored(&stored),
            },
        ));
    }
    Ok(entries)
}
