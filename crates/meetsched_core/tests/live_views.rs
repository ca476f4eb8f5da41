use chrono::NaiveDate;
use meetsched_core::{ResponseKind, ResponseValue, Scheduler, UNKNOWN_NAME};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
}

#[test]
fn list_view_follows_commits_to_its_table() {
    let mut scheduler = Scheduler::open_in_memory().unwrap();
    let hosts = scheduler.watch_hosts().unwrap();
    let participants = scheduler.watch_participants().unwrap();
    assert!(hosts.current().is_empty());
    assert_eq!(hosts.revision(), 0);

    let host = scheduler.add_host("Ada", Some("ada@example.com")).unwrap();
    assert_eq!(hosts.revision(), 1);
    let current = hosts.current();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].id, host);
    assert_eq!(current[0].email.as_deref(), Some("ada@example.com"));

    // Host writes never reach the participants view.
    assert_eq!(participants.revision(), 0);
    scheduler.add_participant("Pat", None).unwrap();
    assert_eq!(participants.revision(), 1);
    assert_eq!(hosts.revision(), 1);
}

#[test]
fn failed_write_does_not_refresh_views() {
    let mut scheduler = Scheduler::open_in_memory().unwrap();
    let meetings = scheduler.watch_meetings().unwrap();

    scheduler
        .schedule_meeting("Orphan", 42, "Nowhere", day(1))
        .unwrap_err();

    assert_eq!(meetings.revision(), 0);
    assert!(meetings.current().is_empty());
}

#[test]
fn responses_view_empties_after_meeting_delete() {
    let mut scheduler = Scheduler::open_in_memory().unwrap();
    let host = scheduler.add_host("Ada", None).unwrap();
    let meeting = scheduler.schedule_meeting("Demo", host, "Lab", day(2)).unwrap();
    let participant = scheduler.add_participant("Pat", None).unwrap();
    let responses = scheduler.watch_responses_for(meeting).unwrap();

    scheduler
        .submit_response(meeting, participant, ResponseKind::Accepted)
        .unwrap();
    let entries = responses.current();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].participant_name, "Pat");
    assert_eq!(entries[0].response, ResponseValue::Accepted);

    scheduler
        .submit_response(meeting, participant, ResponseKind::Declined)
        .unwrap();
    assert_eq!(responses.current()[0].response, ResponseValue::Declined);

    scheduler.delete_meeting(meeting).unwrap();
    assert!(responses.current().is_empty());
    assert!(responses.last_error().is_none());
}

#[test]
fn cascades_never_expose_unknown_names() {
    let mut scheduler = Scheduler::open_in_memory().unwrap();
    let overviews = scheduler.watch_meeting_overviews().unwrap();
    let host = scheduler.add_host("Ada", None).unwrap();
    let other_host = scheduler.add_host("Bob", None).unwrap();
    let first = scheduler.schedule_meeting("One", host, "A", day(3)).unwrap();
    let second = scheduler.schedule_meeting("Two", other_host, "B", day(4)).unwrap();
    let pat = scheduler.add_participant("Pat", None).unwrap();
    let sam = scheduler.add_participant("Sam", None).unwrap();
    for meeting in [first, second] {
        for participant in [pat, sam] {
            scheduler
                .submit_response(meeting, participant, ResponseKind::Accepted)
                .unwrap();
        }
    }

    let assert_no_unknown = |overviews: &[meetsched_core::MeetingOverview]| {
        for overview in overviews {
            assert_ne!(overview.host_name, UNKNOWN_NAME);
            for entry in &overview.responses {
                assert_ne!(entry.participant_name, UNKNOWN_NAME);
            }
        }
    };

    scheduler.delete_participant(sam).unwrap();
    overviews.with_current(|current| assert_no_unknown(current.as_slice()));
    scheduler.delete_host(host).unwrap();
    overviews.with_current(|current| assert_no_unknown(current.as_slice()));

    let current = overviews.current();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].meeting.id, second);
    assert_eq!(current[0].host_name, "Bob");
    assert_eq!(current[0].responses.len(), 1);
    assert_eq!(current[0].responses[0].participant_id, pat);
}

#[test]
fn overview_serializes_for_front_ends() {
    let mut scheduler = Scheduler::open_in_memory().unwrap();
    let host = scheduler.add_host("Ada", None).unwrap();
    let meeting = scheduler.schedule_meeting("Demo", host, "Lab", day(5)).unwrap();
    let participant = scheduler.add_participant("Pat", None).unwrap();
    scheduler
        .submit_response(meeting, participant, ResponseKind::Declined)
        .unwrap();

    let overviews = scheduler.meeting_overviews().unwrap();
    let json = serde_json::to_value(&overviews).unwrap();

    assert_eq!(json[0]["host_name"], "Ada");
    assert_eq!(json[0]["meeting"]["date"], "2025-07-05");
    assert_eq!(json[0]["responses"][0]["participant_name"], "Pat");
}

#[test]
fn dropped_views_stop_listening() {
    let mut scheduler = Scheduler::open_in_memory().unwrap();
    let hosts = scheduler.watch_hosts().unwrap();
    let kept = scheduler.watch_participants().unwrap();
    assert_eq!(scheduler.store().listener_count(), 2);

    drop(hosts);
    scheduler.add_host("Ada", None).unwrap();

    assert_eq!(scheduler.store().listener_count(), 1);
    assert_eq!(kept.revision(), 0);
}

#[test]
fn response_of_vanished_participant_renders_unknown() {
    let mut scheduler = Scheduler::open_in_memory().unwrap();
    let host = scheduler.add_host("Ada", None).unwrap();
    let meeting = scheduler.schedule_meeting("Demo", host, "Lab", day(6)).unwrap();
    // Older builds left responses behind when a participant was removed.
    scheduler
        .store()
        .connection()
        .execute(
            "INSERT INTO responses (meeting_id, participant_id, response) VALUES (?1, 77, 'Accepted');",
            [meeting],
        )
        .unwrap();

    let entries = scheduler.responses_for(meeting).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].participant_id, 77);
    assert_eq!(entries[0].participant_name, UNKNOWN_NAME);
    assert_eq!(entries[0].response, ResponseValue::Accepted);

    let overviews = scheduler.meeting_overviews().unwrap();
    assert_eq!(overviews[0].responses[0].participant_name, UNKNOWN_NAME);
}

#[test]
fn meeting_of_vanished_host_renders_unknown() {
    let mut scheduler = Scheduler::open_in_memory().unwrap();
    let host = scheduler.add_host("Ada", None).unwrap();
    let meeting = scheduler.schedule_meeting("Demo", host, "Lab", day(7)).unwrap();
    scheduler
        .store()
        .connection()
        .execute("DELETE FROM hosts WHERE id = ?1;", [host])
        .unwrap();

    let overviews = scheduler.meeting_overviews().unwrap();
    assert_eq!(overviews.len(), 1);
    assert_eq!(overviews[0].meeting.id, meeting);
    assert_eq!(overviews[0].host_name, UNKNOWN_NAME);

    let report = scheduler.sweep_orphans().unwrap();
    assert_eq!(report.orphan_meetings, 1);
    assert!(scheduler.meeting_overviews().unwrap().is_empty());
}

#[test]
fn raw_connection_writes_do_not_refresh_views() {
    let mut scheduler = Scheduler::open_in_memory().unwrap();
    let hosts = scheduler.watch_hosts().unwrap();

    scheduler
        .store()
        .connection()
        .execute("INSERT INTO hosts (name) VALUES ('Seeded');", [])
        .unwrap();
    assert_eq!(hosts.revision(), 0);
    assert!(hosts.current().is_empty());

    // The next store write recomputes from the table and picks the row up.
    scheduler.add_host("Ada", None).unwrap();
    assert_eq!(hosts.revision(), 1);
    assert_eq!(hosts.current().len(), 2);
}
