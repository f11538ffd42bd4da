//! Batch save of tracked edits.
//!
//! A save turns every dirty row into one partial update, dispatches the
//! updates concurrently on scoped worker threads, joins all of them, and only
//! then decides which baselines may be promoted.
//!
//! # Policies
//!
//! - [`SavePolicy::AllOrNothing`]: any failed call leaves the whole batch
//!   pending, including rows whose update was confirmed.
//! - [`SavePolicy::PerRow`]: confirmed rows are promoted; only failed rows
//!   stay pending.

use std::thread;

use serde::{Deserialize, Serialize};

use crate::error::ReviewError;
use crate::model::{PartialRowUpdate, RowId};
use crate::store::{RemoteStore, StoreError};
use crate::tracker::EditTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SavePolicy {
    #[default]
    AllOrNothing,
    PerRow,
}

/// One planned update call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowUpdate {
    pub id: RowId,
    pub fields: PartialRowUpdate,
}

/// A rejected update call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFailure {
    pub id: RowId,
    pub error: StoreError,
}

/// Result of one save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing was pending; the store was not called.
    NothingToSave,
    /// Every update was confirmed; the tracker is empty.
    Saved { count: usize },
    /// At least one update failed.
    Failed {
        failures: Vec<UpdateFailure>,
        total: usize,
        /// Rows promoted despite the failure (always 0 under all-or-nothing).
        promoted: usize,
    },
}

impl SaveOutcome {
    /// Number of rows now persisted and no longer pending.
    #[must_use]
    pub const fn saved_count(&self) -> usize {
        match self {
            Self::NothingToSave => 0,
            Self::Saved { count } => *count,
            Self::Failed { promoted, .. } => *promoted,
        }
    }

    /// Collapse into the count of saved rows or a [`ReviewError::Save`].
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Save`] when any update failed.
    pub fn into_result(self) -> Result<usize, ReviewError> {
        match self {
            Self::NothingToSave => Ok(0),
            Self::Saved { count } => Ok(count),
            Self::Failed {
                failures, total, ..
            } => Err(ReviewError::Save {
                failed: failures.len(),
                total,
            }),
        }
    }
}

/// Build one update per dirty row, in id order.
#[must_use]
pub fn plan_updates(tracker: &EditTracker) -> Vec<RowUpdate> {
    tracker
        .pending_ids()
        .into_iter()
        .map(|id| RowUpdate {
            id,
            fields: tracker.pending_update(id),
        })
        .collect()
}

/// Wave size used when no positive `max_in_flight` is configured.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

/// Issue every update and wait for all of them.
///
/// Calls are issued in waves of at most `max_in_flight` (or
/// [`DEFAULT_MAX_IN_FLIGHT`] when unset or 0); every call is still made.
/// A worker that cannot be spawned is reported as a failed call for its row.
/// Results are returned in the order of `updates`.
pub fn dispatch<S: RemoteStore + ?Sized>(
    store: &S,
    updates: &[RowUpdate],
    max_in_flight: Option<usize>,
) -> Vec<(RowId, Result<(), StoreError>)> {
    let wave = max_in_flight
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_MAX_IN_FLIGHT);
    let mut results = Vec::with_capacity(updates.len());

    for chunk in updates.chunks(wave) {
        thread::scope(|scope| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|update| {
                    let spawned = thread::Builder::new()
                        .name(format!("tagreview-update-{}", update.id))
                        .spawn_scoped(scope, move || store.update_row(update.id, &update.fields));
                    (update.id, spawned)
                })
                .collect();

            for (id, spawned) in handles {
                let outcome = match spawned {
                    Ok(handle) => handle.join().unwrap_or(Err(StoreError::WorkerPanicked)),
                    Err(err) => {
                        tracing::warn!(id, error = %err, "failed to spawn update worker");
                        Err(StoreError::SpawnFailed(err.to_string()))
                    }
                };
                results.push((id, outcome));
            }
        });
    }

    results
}

/// Flushes an [`EditTracker`] to a [`RemoteStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    pub policy: SavePolicy,
    pub max_in_flight: Option<usize>,
}

impl Reconciler {
    #[must_use]
    pub const fn new(policy: SavePolicy) -> Self {
        Self {
            policy,
            max_in_flight: None,
        }
    }

    #[must_use]
    pub const fn with_max_in_flight(mut self, max_in_flight: Option<usize>) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Save every pending edit in `tracker`.
    ///
    /// The tracker and its baselines are only mutated after every call has
    /// completed.
    pub fn save<S: RemoteStore + ?Sized>(&self, tracker: &mut EditTracker, store: &S) -> SaveOutcome {
        let updates = plan_updates(tracker);
        if updates.is_empty() {
            tracing::debug!("save requested with no pending edits");
            return SaveOutcome::NothingToSave;
        }

        let total = updates.len();
        tracing::info!(total, policy = ?self.policy, "dispatching row updates");
        let results = dispatch(store, &updates, self.max_in_flight);

        let mut failures = Vec::new();
        let mut confirmed = Vec::new();
        for (id, result) in results {
            match result {
                Ok(()) => confirmed.push(id),
                Err(error) => {
                    tracing::warn!(row = id, "row update failed: {error}");
                    failures.push(UpdateFailure { id, error });
                }
            }
        }

        if failures.is_empty() {
            tracker.promote_all();
            tracing::info!(count = total, "all row updates confirmed");
            return SaveOutcome::Saved { count: total };
        }

        let promoted = match self.policy {
            SavePolicy::AllOrNothing => 0,
            SavePolicy::PerRow => {
                for id in &confirmed {
                    tracker.promote(*id);
                }
                confirmed.len()
            }
        };
        tracing::warn!(
            failed = failures.len(),
            total,
            promoted,
            "save finished with failures"
        );

        SaveOutcome::Failed {
            failures,
            total,
            promoted,
        }
    }
}
