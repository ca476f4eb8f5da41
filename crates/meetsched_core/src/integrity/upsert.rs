//! Reference-checked inserts and the response upsert rule.

use super::SubmitOutcome;
use crate::error::{SchedulerError, SchedulerResult};
use crate::model::meeting::{Meeting, NewMeeting};
use crate::model::response::{NewResponse, Response, ResponseKind, ResponsePatch};
use crate::model::{MeetingId, ParticipantId, RecordId};
use crate::schema::Table;
use crate::store::{Entity, EntityStore, StoreTx};
use log::{info, warn};
use std::time::Instant;

/// Creates a meeting after confirming its host exists.
///
/// The host check and the insert share one transaction, so a concurrent
/// host delete cannot slip in between.
pub fn schedule_meeting(store: &mut EntityStore, new: &NewMeeting) -> SchedulerResult<RecordId> {
    Meeting::validate_new(new)?;
    let result: SchedulerResult<RecordId> =
        store.with_transaction(&[Table::Hosts, Table::Meetings], |tx| {
            require_row(tx, Table::Hosts, new.host_id)?;
            Ok(tx.create::<Meeting>(new)?)
        });

    match &result {
        Ok(meeting_id) => info!(
            "event=meeting_schedule module=integrity status=ok meeting_id={meeting_id} host_id={}",
            new.host_id
        ),
        Err(err) => warn!(
            "event=meeting_schedule module=integrity status=error host_id={} error_code={}",
            new.host_id,
            err.code()
        ),
    }
    result
}

/// Records `kind` as the answer of `participant_id` to `meeting_id`.
///
/// Updates the existing response for the pair in place (keeping its id) or
/// creates one. Duplicate rows for the pair left by older data are removed
/// in the same transaction.
pub fn submit_response(
    store: &mut EntityStore,
    meeting_id: MeetingId,
    participant_id: ParticipantId,
    kind: ResponseKind,
) -> SchedulerResult<SubmitOutcome> {
    let new = NewResponse::new(meeting_id, participant_id, kind)?;
    let started_at = Instant::now();

    let result: SchedulerResult<SubmitOutcome> = store.with_transaction(
        &[Table::Meetings, Table::Participants, Table::Responses],
        |tx| {
            require_row(tx, Table::Meetings, meeting_id)?;
            require_row(tx, Table::Participants, participant_id)?;

            let existing = tx.find_responses_by_pair(meeting_id, participant_id)?;
            let Some((kept, duplicates)) = existing.split_first() else {
                return Ok(SubmitOutcome::Created(tx.create::<Response>(&new)?));
            };

            tx.update::<Response>(
                kept.id,
                &ResponsePatch {
                    response: Some(kind),
                },
            )?;
            for duplicate in duplicates {
                tx.delete::<Response>(duplicate.id)?;
            }
            if !duplicates.is_empty() {
                warn!(
                    "event=response_duplicates_merged module=integrity status=ok meeting_id={meeting_id} participant_id={participant_id} removed={}",
                    duplicates.len()
                );
            }
            Ok(SubmitOutcome::Updated(kept.id))
        },
    );

    match &result {
        Ok(outcome) => info!(
            "event=response_submit module=integrity status=ok meeting_id={meeting_id} participant_id={participant_id} outcome={outcome:?} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => warn!(
            "event=response_submit module=integrity status=error meeting_id={meeting_id} participant_id={participant_id} error_code={}",
            err.code()
        ),
    }
    result
}

fn require_row(tx: &StoreTx<'_>, table: Table, id: RecordId) -> SchedulerResult<()> {
    if !tx.exists(table, id)? {
        return Err(SchedulerError::IntegrityViolation { missing: table, id });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{schedule_meeting, submit_response};
    use crate::error::SchedulerError;
    use crate::integrity::SubmitOutcome;
    use crate::model::host::{Host, NewHost};
    use crate::model::meeting::NewMeeting;
    use crate::model::participant::{NewParticipant, Participant};
    use crate::model::response::{ResponseKind, ResponseValue};
    use crate::schema::Table;
    use crate::store::EntityStore;
    use chrono::NaiveDate;

    fn seeded() -> (EntityStore, i64, i64) {
        let mut store = EntityStore::open_in_memory().unwrap();
        let host_id = store.create::<Host>(&NewHost::new("Host", None).unwrap()).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
        let meeting_id =
            schedule_meeting(&mut store, &NewMeeting::new("Review", host_id, "Room 2", date).unwrap())
                .unwrap();
        let participant_id = store
            .create::<Participant>(&NewParticipant::new("Pat", None).unwrap())
            .unwrap();
        (store, meeting_id, participant_id)
    }

    #[test]
    fn schedule_meeting_rejects_missing_host() {
        let mut store = EntityStore::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
        let err = schedule_meeting(&mut store, &NewMeeting::new("X", 7, "Y", date).unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::IntegrityViolation {
                missing: Table::Hosts,
                id: 7
            }
        ));
    }

    #[test]
    fn second_submission_updates_in_place() {
        let (mut store, meeting_id, participant_id) = seeded();

        let first =
            submit_response(&mut store, meeting_id, participant_id, ResponseKind::Accepted).unwrap();
        let second =
            submit_response(&mut store, meeting_id, participant_id, ResponseKind::Declined).unwrap();

        assert!(matches!(first, SubmitOutcome::Created(_)));
        assert_eq!(second, SubmitOutcome::Updated(first.response_id()));
        let rows = store.find_responses_by_pair(meeting_id, participant_id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].response, ResponseValue::Declined);
    }

    #[test]
    fn submission_for_missing_participant_writes_nothing() {
        let (mut store, meeting_id, _) = seeded();
        let err =
            submit_response(&mut store, meeting_id, 999, ResponseKind::Accepted).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::IntegrityViolation {
                missing: Table::Participants,
                id: 999
            }
        ));
        assert!(store.find_responses_by_pair(meeting_id, 999).unwrap().is_empty());
    }

    #[test]
    fn submission_with_blank_ids_is_a_validation_error() {
        let (mut store, _, participant_id) = seeded();
        let err = submit_response(&mut store, 0, participant_id, ResponseKind::Accepted).unwrap_err();
        assert!(matches!(err, SchedulerError::Validation(_)));
    }
}
