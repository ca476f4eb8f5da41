use chrono::NaiveDate;
use meetsched_core::{
    EntityStore, ResponseKind, ResponseValue, Scheduler, SchedulerError, SubmitOutcome, Table,
    ValidationError,
};

fn seeded() -> (Scheduler, i64, i64) {
    let mut scheduler = Scheduler::open_in_memory().unwrap();
    let host = scheduler.add_host("Ada", None).unwrap();
    let meeting = scheduler
        .schedule_meeting(
            "Kickoff",
            host,
            "Room 1",
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        )
        .unwrap();
    let participant = scheduler.add_participant("Pat", None).unwrap();
    (scheduler, meeting, participant)
}

#[test]
fn second_submission_replaces_first_in_place() {
    let (mut scheduler, meeting, participant) = seeded();

    let first = scheduler
        .submit_response(meeting, participant, ResponseKind::Accepted)
        .unwrap();
    let second = scheduler
        .submit_response(meeting, participant, ResponseKind::Declined)
        .unwrap();

    assert!(matches!(first, SubmitOutcome::Created(_)));
    assert_eq!(second, SubmitOutcome::Updated(first.response_id()));

    let rows = scheduler
        .store()
        .find_responses_by_pair(meeting, participant)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].response, ResponseValue::Declined);
}

#[test]
fn last_successful_submission_wins() {
    let (mut scheduler, meeting, participant) = seeded();
    let sequence = [
        ResponseKind::Declined,
        ResponseKind::Accepted,
        ResponseKind::Accepted,
        ResponseKind::Declined,
    ];
    for kind in sequence {
        scheduler.submit_response(meeting, participant, kind).unwrap();
    }
    // A rejected call must not disturb the stored answer.
    scheduler
        .submit_response(meeting, participant + 100, ResponseKind::Accepted)
        .unwrap_err();

    let entries = scheduler.responses_for(meeting).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].response, ResponseValue::Declined);
}

#[test]
fn responses_to_missing_references_are_integrity_violations() {
    let (mut scheduler, meeting, participant) = seeded();

    let missing_meeting = scheduler
        .submit_response(meeting + 1, participant, ResponseKind::Accepted)
        .unwrap_err();
    assert!(matches!(
        missing_meeting,
        SchedulerError::IntegrityViolation {
            missing: Table::Meetings,
            ..
        }
    ));

    let missing_participant = scheduler
        .submit_response(meeting, participant + 1, ResponseKind::Accepted)
        .unwrap_err();
    assert_eq!(missing_participant.code(), "integrity_violation");
    assert!(scheduler.responses_for(meeting).unwrap().is_empty());
}

#[test]
fn invalid_input_is_rejected_before_any_write() {
    let mut scheduler = Scheduler::open_in_memory().unwrap();

    let err = scheduler.add_host("   ", None).unwrap_err();
    assert!(matches!(
        err,
        SchedulerError::Validation(ValidationError::Empty("name"))
    ));
    let err = scheduler.add_participant("Pat", Some("not-an-email")).unwrap_err();
    assert!(matches!(
        err,
        SchedulerError::Validation(ValidationError::Malformed { field: "email", .. })
    ));
    assert!(scheduler.list_hosts().unwrap().is_empty());
    assert!(scheduler.list_participants().unwrap().is_empty());

    assert!(ResponseKind::parse("maybe").is_err());
    assert!(scheduler.submit_response(0, 1, ResponseKind::Accepted).is_err());
}

#[test]
fn legacy_duplicates_collapse_on_next_submission() {
    let (mut scheduler, meeting, participant) = seeded();
    scheduler
        .store()
        .connection()
        .execute(
            "INSERT INTO responses (meeting_id, participant_id, response) VALUES (?1, ?2, 'sure'), (?1, ?2, 'Accepted');",
            [meeting, participant],
        )
        .unwrap();
    let oldest = scheduler
        .store()
        .find_responses_by_pair(meeting, participant)
        .unwrap()[0]
        .id;

    let outcome = scheduler
        .submit_response(meeting, participant, ResponseKind::Declined)
        .unwrap();

    assert_eq!(outcome, SubmitOutcome::Updated(oldest));
    let rows = scheduler
        .store()
        .find_responses_by_pair(meeting, participant)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].response, ResponseValue::Declined);
}

#[test]
fn legacy_free_text_reads_back_verbatim() {
    let store = EntityStore::open_in_memory().unwrap();
    store
        .connection()
        .execute_batch(
            "INSERT INTO participants (name) VALUES ('Grace');
             INSERT INTO hosts (name) VALUES ('Ada');
             INSERT INTO meetings (name, host_id, location, date) VALUES ('Old', 1, 'Hall', '2023-11-30');
             INSERT INTO responses (meeting_id, participant_id, response) VALUES (1, 1, 'I will try');",
        )
        .unwrap();
    let scheduler = Scheduler::new(store);

    let entries = scheduler.responses_for(1).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].participant_name, "Grace");
    assert_eq!(
        entries[0].response,
        ResponseValue::Legacy("I will try".to_string())
    );
    assert_eq!(entries[0].response.to_string(), "I will try");
}
