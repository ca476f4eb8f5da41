use meetsched_core::db::migrations::{apply_migrations_up_to, latest_version};
use meetsched_core::db::{open_db, open_db_in_memory, DbError};
use meetsched_core::{
    EntityStore, Host, Participant, Response, ResponseValue, Scheduler, SchedulerError,
    StoreError,
};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "hosts");
    assert_table_exists(&conn, "meetings");
    assert_table_exists(&conn, "participants");
    assert_table_exists(&conn, "responses");
    assert_index_exists(&conn, "idx_responses_meeting_participant");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("meetsched.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "responses");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn first_schema_database_upgrades_and_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.db");

    let mut legacy = Connection::open(&path).unwrap();
    apply_migrations_up_to(&mut legacy, 1).unwrap();
    assert_eq!(schema_version(&legacy), 1);
    legacy
        .execute_batch(
            "INSERT INTO hosts (name) VALUES ('Ada');
             INSERT INTO participants (name) VALUES ('Grace');
             INSERT INTO meetings (name, host_id, location, date)
                 VALUES ('Kickoff', 1, 'Room 1', '2024-02-01');
             INSERT INTO responses (meeting_id, participant_id, response)
                 VALUES (1, 1, 'maybe, running late');",
        )
        .unwrap();
    drop(legacy);

    let store = EntityStore::try_new(open_db(&path).unwrap()).unwrap();
    assert_eq!(schema_version(store.connection()), latest_version());

    let host = store.get::<Host>(1).unwrap().unwrap();
    assert_eq!(host.name, "Ada");
    assert_eq!(host.email, None);
    let participant = store.get::<Participant>(1).unwrap().unwrap();
    assert_eq!(participant.email, None);

    let response = store.get::<Response>(1).unwrap().unwrap();
    assert_eq!(
        response.response,
        ResponseValue::Legacy("maybe, running late".to_string())
    );
    assert_eq!(response.response.kind(), None);
}

#[test]
fn undecodable_legacy_date_is_a_permanent_failure() {
    let mut scheduler = Scheduler::open_in_memory().unwrap();
    let host = scheduler.add_host("Ada", None).unwrap();
    scheduler
        .store()
        .connection()
        .execute(
            "INSERT INTO meetings (name, host_id, location, date) VALUES ('Old', ?1, 'Hall', 'Mon Jan 01 2024');",
            [host],
        )
        .unwrap();

    let err = scheduler.list_meetings().unwrap_err();
    assert!(matches!(
        err,
        SchedulerError::StoreFailure(StoreError::InvalidData(_))
    ));
    assert!(!err.is_retryable());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    assert!(
        sqlite_object_exists(conn, "table", table_name),
        "expected table `{table_name}` to exist"
    );
}

fn assert_index_exists(conn: &Connection, index_name: &str) {
    assert!(
        sqlite_object_exists(conn, "index", index_name),
        "expected index `{index_name}` to exist"
    );
}

fn sqlite_object_exists(conn: &Connection, kind: &str, name: &str) -> bool {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2);",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    exists == 1
}
