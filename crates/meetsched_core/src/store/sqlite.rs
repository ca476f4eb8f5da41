//! SQLite-backed entity store and scoped transactions.
//!
//! # Responsibility
//! - Build table SQL from schema definitions, never from ad hoc literals.
//! - Run multi-table writes under `BEGIN IMMEDIATE` so writers serialize.
//! - Deliver the set of committed tables to change listeners.
//!
//! # Invariants
//! - `StoreTx` rolls back when dropped without `commit`.
//! - `touched` only records tables where a row actually changed.

use super::entity::{row_id, Entity};
use super::{StoreError, StoreResult};
use crate::config::StoreConfig;
use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{open_db_in_memory, open_with_config};
use crate::model::response::Response;
use crate::model::{MeetingId, ParticipantId, RecordId};
use crate::schema::{IndexedField, Table, ID_COLUMN};
use log::{debug, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::time::Instant;

/// Tables changed by one committed transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    tables: BTreeSet<Table>,
}

impl ChangeSet {
    pub fn contains(&self, table: Table) -> bool {
        self.tables.contains(&table)
    }

    /// Whether any of `tables` changed.
    pub fn touches_any(&self, tables: &[Table]) -> bool {
        tables.iter().any(|table| self.tables.contains(table))
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Table> + '_ {
        self.tables.iter().copied()
    }

    fn describe(&self) -> String {
        self.iter().map(Table::name).collect::<Vec<_>>().join(",")
    }
}

impl FromIterator<Table> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = Table>>(iter: I) -> Self {
        Self {
            tables: iter.into_iter().collect(),
        }
    }
}

/// Whether a listener wants further notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Active,
    /// Nobody observes this listener anymore; the store drops it.
    Detached,
}

/// Receives committed table changes.
///
/// Called on the store's own connection right after commit, so reads made
/// through `reader` see exactly the committed state.
pub trait ChangeListener {
    fn on_commit(&mut self, reader: &StoreReader<'_>, changes: &ChangeSet) -> ListenerState;
}

/// Read-only view over a store connection.
#[derive(Clone, Copy)]
pub struct StoreReader<'conn> {
    conn: &'conn Connection,
}

impl<'conn> StoreReader<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Connection for joined read queries.
    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    pub fn get<E: Entity>(&self, id: RecordId) -> StoreResult<Option<E>> {
        select_by_id(self.conn, id)
    }

    pub fn list_all<E: Entity>(&self) -> StoreResult<Vec<E>> {
        select_all(self.conn)
    }

    pub fn find_by_index<E: Entity>(
        &self,
        field: IndexedField,
        value: RecordId,
    ) -> StoreResult<Vec<E>> {
        select_by_index(self.conn, field, value)
    }

    /// All responses for one `(meeting, participant)` pair, oldest first.
    pub fn find_responses_by_pair(
        &self,
        meeting_id: MeetingId,
        participant_id: ParticipantId,
    ) -> StoreResult<Vec<Response>> {
        select_responses_by_pair(self.conn, meeting_id, participant_id)
    }

    /// Runs several reads against one snapshot.
    ///
    /// Outside a write transaction this opens a deferred read transaction so
    /// a writer on another connection cannot interleave between statements.
    pub fn snapshot<T>(&self, read: impl FnOnce(&Self) -> StoreResult<T>) -> StoreResult<T> {
        if !self.conn.is_autocommit() {
            return read(self);
        }
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let value = read(self)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Keyed-record store owning one migrated SQLite connection.
pub struct EntityStore {
    conn: Connection,
    listeners: Vec<Box<dyn ChangeListener>>,
}

impl EntityStore {
    /// Wraps a migrated connection after checking its layout.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(&conn)?;
        Ok(Self {
            conn,
            listeners: Vec::new(),
        })
    }

    /// Opens (and migrates) the database described by `config`.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        Self::try_new(open_with_config(config)?)
    }

    /// Opens a fresh in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Raw connection handle.
    ///
    /// Statements run through it bypass validation, integrity rules and
    /// change listeners. Meant for inspection and for seeding rows in the
    /// shape older builds wrote them.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Registers a listener for committed changes.
    pub fn add_listener(&mut self, listener: Box<dyn ChangeListener>) {
        self.listeners.push(listener);
    }

    /// Number of listeners still registered.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Read handle over the committed state.
    pub fn reader(&self) -> StoreReader<'_> {
        StoreReader::new(&self.conn)
    }

    pub fn get<E: Entity>(&self, id: RecordId) -> StoreResult<Option<E>> {
        self.reader().get(id)
    }

    pub fn list_all<E: Entity>(&self) -> StoreResult<Vec<E>> {
        self.reader().list_all()
    }

    pub fn find_by_index<E: Entity>(
        &self,
        field: IndexedField,
        value: RecordId,
    ) -> StoreResult<Vec<E>> {
        self.reader().find_by_index(field, value)
    }

    pub fn find_responses_by_pair(
        &self,
        meeting_id: MeetingId,
        participant_id: ParticipantId,
    ) -> StoreResult<Vec<Response>> {
        self.reader().find_responses_by_pair(meeting_id, participant_id)
    }

    pub fn create<E: Entity>(&mut self, new: &E::New) -> StoreResult<RecordId> {
        self.with_transaction(&[E::TABLE], |tx| tx.create::<E>(new))
    }

    pub fn update<E: Entity>(&mut self, id: RecordId, patch: &E::Patch) -> StoreResult<()> {
        self.with_transaction(&[E::TABLE], |tx| tx.update::<E>(id, patch))
    }

    pub fn delete<E: Entity>(&mut self, id: RecordId) -> StoreResult<()> {
        self.with_transaction(&[E::TABLE], |tx| tx.delete::<E>(id))
    }

    /// Runs `body` inside one exclusive write transaction over `tables`.
    ///
    /// Commits when `body` returns `Ok`; any `Err` (from `body` or commit)
    /// rolls everything back. Listeners are notified only after commit.
    pub fn with_transaction<T, E, F>(&mut self, tables: &[Table], body: F) -> Result<T, E>
    where
        F: FnOnce(&mut StoreTx<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let started_at = Instant::now();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let mut store_tx = StoreTx::new(tx, tables);

        let value = match body(&mut store_tx) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "event=store_tx module=store status=rolled_back scope={} duration_ms={}",
                    describe_tables(tables),
                    started_at.elapsed().as_millis()
                );
                return Err(err);
            }
        };

        let changes = store_tx.commit()?;
        debug!(
            "event=store_tx module=store status=committed scope={} changed={} duration_ms={}",
            describe_tables(tables),
            changes.describe(),
            started_at.elapsed().as_millis()
        );

        if !changes.is_empty() {
            self.notify(&changes);
        }
        Ok(value)
    }

    fn notify(&mut self, changes: &ChangeSet) {
        let reader = StoreReader::new(&self.conn);
        self.listeners
            .retain_mut(|listener| listener.on_commit(&reader, changes) == ListenerState::Active);
    }
}

/// Write handle for one scoped transaction.
pub struct StoreTx<'conn> {
    tx: Transaction<'conn>,
    scope: BTreeSet<Table>,
    touched: BTreeSet<Table>,
}

impl<'conn> StoreTx<'conn> {
    fn new(tx: Transaction<'conn>, tables: &[Table]) -> Self {
        Self {
            tx,
            scope: tables.iter().copied().collect(),
            touched: BTreeSet::new(),
        }
    }

    fn commit(self) -> StoreResult<ChangeSet> {
        self.tx.commit()?;
        Ok(self.touched.into_iter().collect())
    }

    fn ensure_in_scope(&self, table: Table) -> StoreResult<()> {
        if !self.scope.contains(&table) {
            return Err(StoreError::TableNotInScope(table));
        }
        Ok(())
    }

    pub fn get<E: Entity>(&self, id: RecordId) -> StoreResult<Option<E>> {
        self.ensure_in_scope(E::TABLE)?;
        select_by_id(&self.tx, id)
    }

    /// Whether a row with `id` exists in `table`.
    pub fn exists(&self, table: Table, id: RecordId) -> StoreResult<bool> {
        self.ensure_in_scope(table)?;
        let exists: i64 = self.tx.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {ID_COLUMN} = ?1);",
                table.name()
            ),
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    pub fn list_all<E: Entity>(&self) -> StoreResult<Vec<E>> {
        self.ensure_in_scope(E::TABLE)?;
        select_all(&self.tx)
    }

    pub fn find_by_index<E: Entity>(
        &self,
        field: IndexedField,
        value: RecordId,
    ) -> StoreResult<Vec<E>> {
        self.ensure_in_scope(E::TABLE)?;
        select_by_index(&self.tx, field, value)
    }

    /// Ids of rows whose indexed `field` equals `value`, ascending.
    pub fn find_ids_by_index(
        &self,
        field: IndexedField,
        value: RecordId,
    ) -> StoreResult<Vec<RecordId>> {
        self.ensure_in_scope(field.table())?;
        ensure_indexed(field.table(), field)?;
        let mut stmt = self.tx.prepare(&format!(
            "SELECT {ID_COLUMN} FROM {} WHERE {} = ?1 ORDER BY {ID_COLUMN} ASC;",
            field.table().name(),
            field.column()
        ))?;
        let mut rows = stmt.query([value])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row_id(row)?);
        }
        Ok(ids)
    }

    pub fn find_responses_by_pair(
        &self,
        meeting_id: MeetingId,
        participant_id: ParticipantId,
    ) -> StoreResult<Vec<Response>> {
        self.ensure_in_scope(Table::Responses)?;
        select_responses_by_pair(&self.tx, meeting_id, participant_id)
    }

    pub fn create<E: Entity>(&mut self, new: &E::New) -> StoreResult<RecordId> {
        self.ensure_in_scope(E::TABLE)?;
        E::validate_new(new)?;

        let columns = E::TABLE.columns();
        let placeholders = (1..=columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        self.tx.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({placeholders});",
                E::TABLE.name(),
                columns.join(", ")
            ),
            params_from_iter(E::insert_values(new)),
        )?;

        self.touched.insert(E::TABLE);
        Ok(self.tx.last_insert_rowid())
    }

    /// Applies `patch` to row `id`. An empty patch only checks existence.
    pub fn update<E: Entity>(&mut self, id: RecordId, patch: &E::Patch) -> StoreResult<()> {
        self.ensure_in_scope(E::TABLE)?;
        E::validate_patch(patch)?;

        let assignments = E::patch_values(patch);
        if assignments.is_empty() {
            if !self.exists(E::TABLE, id)? {
                return Err(StoreError::NotFound { table: E::TABLE, id });
            }
            return Ok(());
        }

        let set_clause = assignments
            .iter()
            .enumerate()
            .map(|(index, (column, _))| format!("{column} = ?{}", index + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let mut bind_values = vec![Value::Integer(id)];
        bind_values.extend(assignments.into_iter().map(|(_, value)| value));

        let changed = self.tx.execute(
            &format!(
                "UPDATE {} SET {set_clause} WHERE {ID_COLUMN} = ?1;",
                E::TABLE.name()
            ),
            params_from_iter(bind_values),
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { table: E::TABLE, id });
        }

        self.touched.insert(E::TABLE);
        Ok(())
    }

    pub fn delete<E: Entity>(&mut self, id: RecordId) -> StoreResult<()> {
        self.ensure_in_scope(E::TABLE)?;
        let changed = self.tx.execute(
            &format!("DELETE FROM {} WHERE {ID_COLUMN} = ?1;", E::TABLE.name()),
            [id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { table: E::TABLE, id });
        }

        self.touched.insert(E::TABLE);
        Ok(())
    }

    /// Deletes every row whose indexed `field` equals `value`.
    ///
    /// Returns the number of removed rows; zero is not an error.
    pub fn delete_by_index(&mut self, field: IndexedField, value: RecordId) -> StoreResult<usize> {
        let table = field.table();
        self.ensure_in_scope(table)?;
        ensure_indexed(table, field)?;
        let removed = self.tx.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1;",
                table.name(),
                field.column()
            ),
            [value],
        )?;
        if removed > 0 {
            self.touched.insert(table);
        }
        Ok(removed)
    }
}

fn select_entities<E: Entity>(
    conn: &Connection,
    clause: &str,
    bind_values: Vec<Value>,
) -> StoreResult<Vec<E>> {
    let mut stmt = conn.prepare(&format!("{} {clause};", E::TABLE.select_sql()))?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(E::from_row(row)?);
    }
    Ok(items)
}

fn select_by_id<E: Entity>(conn: &Connection, id: RecordId) -> StoreResult<Option<E>> {
    let mut items = select_entities::<E>(
        conn,
        &format!("WHERE {ID_COLUMN} = ?1"),
        vec![Value::Integer(id)],
    )?;
    Ok(items.pop())
}

fn select_all<E: Entity>(conn: &Connection) -> StoreResult<Vec<E>> {
    select_entities(conn, &format!("ORDER BY {ID_COLUMN} ASC"), Vec::new())
}

fn select_by_index<E: Entity>(
    conn: &Connection,
    field: IndexedField,
    value: RecordId,
) -> StoreResult<Vec<E>> {
    ensure_indexed(E::TABLE, field)?;
    select_entities(
        conn,
        &format!("WHERE {} = ?1 ORDER BY {ID_COLUMN} ASC", field.column()),
        vec![Value::Integer(value)],
    )
}

fn select_responses_by_pair(
    conn: &Connection,
    meeting_id: MeetingId,
    participant_id: ParticipantId,
) -> StoreResult<Vec<Response>> {
    select_entities(
        conn,
        &format!(
            "WHERE {} = ?1 AND {} = ?2 ORDER BY {ID_COLUMN} ASC",
            IndexedField::ResponseMeeting.column(),
            IndexedField::ResponseParticipant.column()
        ),
        vec![Value::Integer(meeting_id), Value::Integer(participant_id)],
    )
}

fn ensure_indexed(table: Table, field: IndexedField) -> StoreResult<()> {
    if !table.indexed_fields().contains(&field) {
        return Err(StoreError::FieldNotIndexed { table, field });
    }
    Ok(())
}

fn describe_tables(tables: &[Table]) -> String {
    tables.iter().map(|table| table.name()).collect::<Vec<_>>().join(",")
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in Table::ALL {
        if !table_exists(conn, table.name())? {
            return Err(StoreError::MissingRequiredTable(table.name()));
        }
        for &column in std::iter::once(&ID_COLUMN).chain(table.columns()) {
            if !table_has_column(conn, table.name(), column)? {
                return Err(StoreError::MissingRequiredColumn {
                    table: table.name(),
                    column,
                });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
