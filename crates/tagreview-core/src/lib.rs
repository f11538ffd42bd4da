//! tagreview-core library.
//!
//! Row model, pending-edit tracking, and batch reconciliation against a
//! remote table.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums for review operations; `anyhow::Result`
//!   for configuration loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod tracker;

pub use error::{ErrorCode, ReviewError};
pub use model::{Action, PartialRowUpdate, RowId, RowOrder, TagMapping};
pub use reconcile::{Reconciler, SaveOutcome, SavePolicy};
pub use session::{ReviewEvent, ReviewSession};
pub use store::{RemoteStore, StoreError};
pub use tracker::EditTracker;
