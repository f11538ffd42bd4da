pub mod apply;
pub mod completions;
pub mod config;
pub mod list;
pub mod show;
pub mod stats;

use anyhow::Result;
use tagreview_core::config::EffectiveConfig;
use tagreview_core::{Reconciler, ReviewError, ReviewEvent, ReviewSession};

use crate::output::{CliError, OutputMode, render_error};
use crate::remote::PostgrestStore;

/// Render `err` in the active output mode and turn it into a failed command.
pub fn fail<T>(output: OutputMode, err: &ReviewError) -> Result<T> {
    render_error(output, &CliError::from(err))?;
    Err(anyhow::anyhow!("[{}] {err}", err.error_code()))
}

/// Build the PostgREST client from resolved settings.
pub fn connect(config: &EffectiveConfig, output: OutputMode) -> Result<PostgrestStore> {
    match config.require_store() {
        Ok(settings) => Ok(PostgrestStore::new(settings)),
        Err(err) => fail(output, &err),
    }
}

/// Fetch every row into a fresh session.
pub fn load_session(
    store: &PostgrestStore,
    reconciler: &Reconciler,
    output: OutputMode,
) -> Result<ReviewSession> {
    let mut session = ReviewSession::new();
    match session.apply(ReviewEvent::Reload, store, reconciler) {
        Ok(()) => Ok(session),
        Err(err) => fail(output, &err),
    }
}

/// Collapse optional text to a display value.
pub fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(text) if !text.trim().is_empty() => text,
        _ => "-",
    }
}
