//! Live views: query results refreshed on commit.

use crate::schema::Table;
use crate::store::{ChangeListener, ChangeSet, EntityStore, ListenerState, StoreReader, StoreResult};
use log::warn;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

type ViewQuery<T> = Box<dyn Fn(&StoreReader<'_>) -> StoreResult<T>>;

#[derive(Debug)]
struct ViewState<T> {
    value: T,
    revision: u64,
    last_error: Option<String>,
}

/// Consumer handle for a live view.
///
/// Cloning shares the same state. Once every handle is dropped the store
/// stops refreshing the view.
#[derive(Debug)]
pub struct LiveView<T> {
    state: Arc<RwLock<ViewState<T>>>,
}

impl<T> Clone for LiveView<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Clone> LiveView<T> {
    /// Latest computed value.
    pub fn current(&self) -> T {
        read_state(&self.state).value.clone()
    }
}

impl<T> LiveView<T> {
    /// Number of recomputations since the view was created.
    pub fn revision(&self) -> u64 {
        read_state(&self.state).revision
    }

    /// Error from the most recent refresh, if it failed.
    ///
    /// The previous value stays visible until a refresh succeeds.
    pub fn last_error(&self) -> Option<String> {
        read_state(&self.state).last_error.clone()
    }

    /// Reads the latest value without cloning it.
    pub fn with_current<R>(&self, read: impl FnOnce(&T) -> R) -> R {
        read(&read_state(&self.state).value)
    }
}

struct LiveQuery<T> {
    name: &'static str,
    tables: Vec<Table>,
    query: ViewQuery<T>,
    state: Weak<RwLock<ViewState<T>>>,
}

impl<T> ChangeListener for LiveQuery<T> {
    fn on_commit(&mut self, reader: &StoreReader<'_>, changes: &ChangeSet) -> ListenerState {
        let Some(state) = self.state.upgrade() else {
            return ListenerState::Detached;
        };
        if !changes.touches_any(&self.tables) {
            return ListenerState::Active;
        }

        match (self.query)(reader) {
            Ok(value) => {
                let mut guard = write_state(&state);
                guard.value = value;
                guard.revision += 1;
                guard.last_error = None;
            }
            Err(err) => {
                warn!(
                    "event=view_refresh module=views status=error view={} error={}",
                    self.name, err
                );
                write_state(&state).last_error = Some(err.to_string());
            }
        }
        ListenerState::Active
    }
}

/// Registers a live view over `tables` and computes its first value.
///
/// `query` runs against the committed state after every transaction that
/// changed one of `tables`.
pub fn watch<T, Q>(
    store: &mut EntityStore,
    name: &'static str,
    tables: &[Table],
    query: Q,
) -> StoreResult<LiveView<T>>
where
    T: 'static,
    Q: Fn(&StoreReader<'_>) -> StoreResult<T> + 'static,
{
    let initial = query(&store.reader())?;
    let state = Arc::new(RwLock::new(ViewState {
        value: initial,
        revision: 0,
        last_error: None,
    }));

    store.add_listener(Box::new(LiveQuery {
        name,
        tables: tables.to_vec(),
        query: Box::new(query),
        state: Arc::downgrade(&state),
    }));
    Ok(LiveView { state })
}

fn read_state<T>(state: &RwLock<ViewState<T>>) -> RwLockReadGuard<'_, ViewState<T>> {
    state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_state<T>(state: &RwLock<ViewState<T>>) -> RwLockWriteGuard<'_, ViewState<T>> {
    state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
