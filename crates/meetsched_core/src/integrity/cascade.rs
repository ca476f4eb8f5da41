//! Cascading delete rules and orphan repair.

use super::{CascadeReport, SweepReport};
use crate::error::{SchedulerError, SchedulerResult};
use crate::model::host::Host;
use crate::model::meeting::Meeting;
use crate::model::participant::Participant;
use crate::model::response::Response;
use crate::model::{HostId, MeetingId, ParticipantId, RecordId};
use crate::schema::{IndexedField, Table};
use crate::store::{EntityStore, StoreTx};
use log::{info, warn};
use std::collections::{BTreeSet, HashSet};
use std::time::Instant;

/// Cascades span every table so they serialize against all other writers.
const CASCADE_SCOPE: [Table; 4] = Table::ALL;

/// Deletes a host, its meetings and every response to those meetings.
///
/// An id that matches no host, including zero or negative ids, is
/// reported as `NotFound`.
///
/// Meetings go before the host and each meeting's responses go before the
/// meeting, so no committed state ever holds an orphan.
pub fn delete_host(store: &mut EntityStore, host_id: HostId) -> SchedulerResult<CascadeReport> {
    logged_cascade("host", host_id, || {
        store.with_transaction(&CASCADE_SCOPE, |tx| -> SchedulerResult<CascadeReport> {
            require_existing(tx, Table::Hosts, host_id)?;

            let mut report = CascadeReport::default();
            for meeting_id in tx.find_ids_by_index(IndexedField::MeetingHost, host_id)? {
                report.responses_removed += remove_meeting(tx, meeting_id)?;
                report.meetings_removed += 1;
            }
            tx.delete::<Host>(host_id)?;
            Ok(report)
        })
    })
}

/// Deletes a meeting and its responses.
pub fn delete_meeting(
    store: &mut EntityStore,
    meeting_id: MeetingId,
) -> SchedulerResult<CascadeReport> {
    logged_cascade("meeting", meeting_id, || {
        store.with_transaction(&CASCADE_SCOPE, |tx| -> SchedulerResult<CascadeReport> {
            require_existing(tx, Table::Meetings, meeting_id)?;
            let responses_removed = remove_meeting(tx, meeting_id)?;
            Ok(CascadeReport {
                meetings_removed: 1,
                responses_removed,
            })
        })
    })
}

/// Deletes a participant and only the responses that participant gave.
pub fn delete_participant(
    store: &mut EntityStore,
    participant_id: ParticipantId,
) -> SchedulerResult<CascadeReport> {
    logged_cascade("participant", participant_id, || {
        store.with_transaction(&CASCADE_SCOPE, |tx| -> SchedulerResult<CascadeReport> {
            require_existing(tx, Table::Participants, participant_id)?;
            let responses_removed =
                tx.delete_by_index(IndexedField::ResponseParticipant, participant_id)?;
            tx.delete::<Participant>(participant_id)?;
            Ok(CascadeReport {
                meetings_removed: 0,
                responses_removed,
            })
        })
    })
}

/// Removes rows that violate the reference rules and merges duplicate
/// responses.
///
/// Databases written by early builds can hold meetings of deleted hosts,
/// responses of deleted meetings or participants, and several responses for
/// one pair. Of duplicates the newest row is kept since it carries the last
/// submitted answer.
pub fn sweep_orphans(store: &mut EntityStore) -> SchedulerResult<SweepReport> {
    let started_at = Instant::now();
    let result: SchedulerResult<SweepReport> = store.with_transaction(&CASCADE_SCOPE, |tx| {
        let host_ids: HashSet<RecordId> = tx.list_all::<Host>()?.iter().map(|h| h.id).collect();
        let participant_ids: HashSet<RecordId> = tx
            .list_all::<Participant>()?
            .iter()
            .map(|p| p.id)
            .collect();

        let mut report = SweepReport::default();
        let mut meeting_ids = HashSet::new();
        for meeting in tx.list_all::<Meeting>()? {
            if host_ids.contains(&meeting.host_id) {
                meeting_ids.insert(meeting.id);
                continue;
            }
            report.orphan_responses += remove_meeting(tx, meeting.id)?;
            report.orphan_meetings += 1;
        }

        let mut seen_pairs = BTreeSet::new();
        // Newest first so the row kept for a pair is the latest answer.
        for response in tx.list_all::<Response>()?.into_iter().rev() {
            if !meeting_ids.contains(&response.meeting_id)
                || !participant_ids.contains(&response.participant_id)
            {
                tx.delete::<Response>(response.id)?;
                report.orphan_responses += 1;
            } else if !seen_pairs.insert((response.meeting_id, response.participant_id)) {
                tx.delete::<Response>(response.id)?;
                report.duplicate_responses += 1;
            }
        }
        Ok(report)
    });

    match &result {
        Ok(report) => info!(
            "event=orphan_sweep module=integrity status=ok orphan_meetings={} orphan_responses={} duplicate_responses={} duration_ms={}",
            report.orphan_meetings,
            report.orphan_responses,
            report.duplicate_responses,
            started_at.elapsed().as_millis()
        ),
        Err(err) => warn!(
            "event=orphan_sweep module=integrity status=error error_code={}",
            err.code()
        ),
    }
    result
}

fn remove_meeting(tx: &mut StoreTx<'_>, meeting_id: MeetingId) -> SchedulerResult<usize> {
    let removed = tx.delete_by_index(IndexedField::ResponseMeeting, meeting_id)?;
    tx.delete::<Meeting>(meeting_id)?;
    Ok(removed)
}

fn require_existing(tx: &StoreTx<'_>, table: Table, id: RecordId) -> SchedulerResult<()> {
    if !tx.exists(table, id)? {
        return Err(SchedulerError::NotFound { table, id });
    }
    Ok(())
}

fn logged_cascade(
    entity: &'static str,
    id: RecordId,
    run: impl FnOnce() -> SchedulerResult<CascadeReport>,
) -> SchedulerResult<CascadeReport> {
    let started_at = Instant::now();
    let result = run();
    match &result {
        Ok(report) => info!(
            "event=cascade_delete module=integrity status=ok entity={entity} id={id} meetings_removed={} responses_removed={} duration_ms={}",
            report.meetings_removed,
            report.responses_removed,
            started_at.elapsed().as_millis()
        ),
        Err(err) => warn!(
            "event=cascade_delete module=integrity status=error entity={entity} id={id} error_code={}",
            err.code()
        ),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::{delete_host, delete_meeting, sweep_orphans};
    use crate::error::SchedulerError;
    use crate::integrity::{schedule_meeting, CascadeReport};
    use crate::model::host::{Host, NewHost};
    use crate::model::meeting::{Meeting, NewMeeting};
    use crate::schema::Table;
    use crate::store::EntityStore;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn host_without_meetings_is_deleted_alone() {
        let mut store = EntityStore::open_in_memory().unwrap();
        let host_id = store.create::<Host>(&NewHost::new("Solo", None).unwrap()).unwrap();

        let report = delete_host(&mut store, host_id).unwrap();
        assert_eq!(report, CascadeReport::default());
        assert!(store.get::<Host>(host_id).unwrap().is_none());
    }

    #[test]
    fn missing_meeting_is_not_found() {
        let mut store = EntityStore::open_in_memory().unwrap();
        let err = delete_meeting(&mut store, 5).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::NotFound {
                table: Table::Meetings,
                id: 5
            }
        ));
    }

    #[test]
    fn sweep_removes_meetings_of_vanished_hosts() {
        let mut store = EntityStore::open_in_memory().unwrap();
        let host_id = store.create::<Host>(&NewHost::new("Gone", None).unwrap()).unwrap();
        let meeting_id =
            schedule_meeting(&mut store, &NewMeeting::new("M", host_id, "L", date()).unwrap())
                .unwrap();
        // Bypass the cascade the way early builds did.
        store.delete::<Host>(host_id).unwrap();

        let report = sweep_orphans(&mut store).unwrap();
        assert_eq!(report.orphan_meetings, 1);
        assert!(store.get::<Meeting>(meeting_id).unwrap().is_none());
        assert!(sweep_orphans(&mut store).unwrap().is_clean());
    }
}
