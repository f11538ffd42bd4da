//! Remote store seam.
//!
//! The review core never talks to the network directly. It reads and writes
//! rows through [`RemoteStore`], which the CLI implements over PostgREST and
//! tests implement with [`memory::MemoryStore`].

use crate::model::{PartialRowUpdate, RowId, RowOrder, TagMapping};

/// Errors returned by a [`RemoteStore`] call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// The store answered with a non-success status.
    #[error("store returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode store response: {0}")]
    Decode(String),

    /// The worker running the call panicked.
    #[error("update worker panicked")]
    WorkerPanicked,

    /// No worker thread could be started for the call.
    #[error("could not start update worker: {0}")]
    SpawnFailed(String),
}

/// Read-all and update-by-id access to the reviewed table.
///
/// Implementations must be shareable across the worker threads a save fans
/// out to.
pub trait RemoteStore: Sync {
    /// Fetch every row in the requested order.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the listing cannot be fetched or decoded.
    fn list_rows(&self, order: RowOrder) -> Result<Vec<TagMapping>, StoreError>;

    /// Apply `fields` to the row `id`. Only fields present in `fields` change.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the update is not confirmed by the store.
    fn update_row(&self, id: RowId, fields: &PartialRowUpdate) -> Result<(), StoreError>;
}

impl<S: RemoteStore + ?Sized> RemoteStore for &S {
    fn list_rows(&self, order: RowOrder) -> Result<Vec<TagMapping>, StoreError> {
        (**self).list_rows(order)
    }

    fn update_row(&self, id: RowId, fields: &PartialRowUpdate) -> Result<(), StoreError> {
        (**self).update_row(id, fields)
    }
}

pub mod memory {
    //! In-memory [`RemoteStore`] with failure injection, for tests and demos.

    use super::{RemoteStore, StoreError};
    use crate::model::{PartialRowUpdate, RowId, RowOrder, SortColumn, TagMapping};
    use std::collections::{BTreeMap, HashSet};
    use std::sync::{Mutex, MutexGuard, PoisonError};

    #[derive(Debug, Default)]
    struct Inner {
        rows: BTreeMap<RowId, TagMapping>,
        fail_list: bool,
        fail_updates: HashSet<RowId>,
        list_calls: usize,
        update_log: Vec<(RowId, PartialRowUpdate)>,
    }

    /// Thread-safe table held in memory.
    #[derive(Debug, Default)]
    pub struct MemoryStore {
        inner: Mutex<Inner>,
    }

    impl MemoryStore {
        #[must_use]
        pub fn new(rows: impl IntoIterator<Item = TagMapping>) -> Self {
            let store = Self::default();
            {
                let mut inner = store.lock();
                for row in rows {
                    inner.rows.insert(row.id, row);
                }
            }
            store
        }

        fn lock(&self) -> MutexGuard<'_, Inner> {
            self.inner.lock().unwrap_or_else(PoisonError::into_inner)
        }

        /// Make the next listings fail until cleared.
        pub fn fail_listing(&self, fail: bool) {
            self.lock().fail_list = fail;
        }

        /// Make updates to `id` fail until cleared.
        pub fn fail_updates_for(&self, id: RowId) {
            self.lock().fail_updates.insert(id);
        }

        pub fn clear_failures(&self) {
            let mut inner = self.lock();
            inner.fail_list = false;
            inner.fail_updates.clear();
        }

        /// Current stored copy of a row.
        #[must_use]
        pub fn row(&self, id: RowId) -> Option<TagMapping> {
            self.lock().rows.get(&id).cloned()
        }

        /// Every update call received, including failed ones, in arrival order.
        #[must_use]
        pub fn update_log(&self) -> Vec<(RowId, PartialRowUpdate)> {
            self.lock().update_log.clone()
        }

        #[must_use]
        pub fn list_calls(&self) -> usize {
            self.lock().list_calls
        }
    }

    impl RemoteStore for MemoryStore {
        fn list_rows(&self, order: RowOrder) -> Result<Vec<TagMapping>, StoreError> {
            let mut inner = self.lock();
            inner.list_calls += 1;
            if inner.fail_list {
                return Err(StoreError::Status {
                    status: 503,
                    body: "listing disabled".to_string(),
                });
            }

            let mut rows: Vec<TagMapping> = inner.rows.values().cloned().collect();
            rows.sort_by(|a, b| {
                let ord = match order.column {
                    SortColumn::Frequency => a.frequency.cmp(&b.frequency),
                };
                let ord = if order.descending { ord.reverse() } else { ord };
                ord.then_with(|| a.id.cmp(&b.id))
            });
            Ok(rows)
        }

        fn update_row(&self, id: RowId, fields: &PartialRowUpdate) -> Result<(), StoreError> {
            let mut inner = self.lock();
            inner.update_log.push((id, fields.clone()));
            if inner.fail_updates.contains(&id) {
                return Err(StoreError::Transport(format!("injected failure for row {id}")));
            }

            let Some(row) = inner.rows.get_mut(&id) else {
                return Err(StoreError::Status {
                    status: 404,
                    body: format!("row {id} not found"),
                });
            };
            if let Some(action) = fields.action {
                row.action = action;
            }
            if let Some(notes) = &fields.notes {
                row.notes = if notes.is_empty() {
                    None
                } else {
                    Some(notes.clone())
                };
            }
            Ok(())
        }
    }

}
