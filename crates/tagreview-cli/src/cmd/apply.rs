//! `tagreview apply`: stage review decisions from the command line and save
//! them as one batch.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tagreview_core::config::EffectiveConfig;
use tagreview_core::model::{Action, RowId};
use tagreview_core::reconcile::{RowUpdate, SaveOutcome, SavePolicy, plan_updates};
use tagreview_core::{Reconciler, ReviewError, ReviewEvent, ReviewSession};

use super::{connect, fail, load_session};
use crate::output::{OutputMode, render};
use crate::remote::PostgrestStore;

#[derive(Args, Debug, Default)]
pub struct ApplyArgs {
    /// Mark a row approved (repeatable).
    #[arg(long = "approve", value_name = "ID")]
    pub approve: Vec<RowId>,

    /// Mark a row rejected (repeatable).
    #[arg(long = "reject", value_name = "ID")]
    pub reject: Vec<RowId>,

    /// Clear a row's decision (repeatable).
    #[arg(long = "unset", value_name = "ID")]
    pub unset: Vec<RowId>,

    /// Set a row's action by name, e.g. `--set 12=approved` (repeatable).
    #[arg(long = "set", value_name = "ID=ACTION", value_parser = parse_assignment)]
    pub set: Vec<(RowId, String)>,

    /// Replace a row's notes, e.g. `--note 12="keep both"`; empty clears them.
    #[arg(long = "note", value_name = "ID=TEXT", value_parser = parse_assignment)]
    pub note: Vec<(RowId, String)>,

    /// Print the update payloads instead of sending them.
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_assignment(raw: &str) -> Result<(RowId, String), String> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VALUE, got '{raw}'"))?;
    let id = id
        .trim()
        .parse::<RowId>()
        .map_err(|err| format!("invalid row id '{id}': {err}"))?;
    Ok((id, value.to_string()))
}

impl ApplyArgs {
    /// Turn flags into session events, in flag-group order.
    fn events(&self) -> Result<Vec<ReviewEvent>, ReviewError> {
        let mut events = Vec::new();
        let fixed = [
            (&self.approve, Action::Approved),
            (&self.reject, Action::Reject),
            (&self.unset, Action::Unset),
        ];
        for (ids, action) in fixed {
            events.extend(ids.iter().map(|&id| ReviewEvent::SetAction { id, action }));
        }
        for (id, text) in &self.set {
            events.push(ReviewEvent::SetAction {
                id: *id,
                action: text.parse()?,
            });
        }
        for (id, notes) in &self.note {
            events.push(ReviewEvent::SetNotes {
                id: *id,
                notes: notes.clone(),
            });
        }
        Ok(events)
    }
}

#[derive(Debug, Serialize)]
struct FailedRow {
    id: RowId,
    error: String,
}

#[derive(Debug, Serialize)]
struct ApplyReport {
    dry_run: bool,
    policy: SavePolicy,
    staged: usize,
    saved: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    planned: Vec<RowUpdate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failed: Vec<FailedRow>,
}

fn render_report(report: &ApplyReport, w: &mut dyn Write) -> std::io::Result<()> {
    if report.dry_run {
        if report.planned.is_empty() {
            return writeln!(w, "Nothing to save.");
        }
        for update in &report.planned {
            let body = serde_json::to_string(&update.fields).unwrap_or_default();
            writeln!(w, "PATCH id={} {body}", update.id)?;
        }
        return Ok(());
    }

    if report.staged == 0 {
        return writeln!(w, "Nothing to save.");
    }
    if report.failed.is_empty() {
        return writeln!(w, "{} change(s) saved successfully!", report.saved);
    }
    for row in &report.failed {
        writeln!(w, "failed id={}: {}", row.id, row.error)?;
    }
    if report.saved > 0 {
        writeln!(w, "{} change(s) saved; failed rows are still pending.", report.saved)?;
    }
    Ok(())
}

fn stage(
    session: &mut ReviewSession,
    events: Vec<ReviewEvent>,
    store: &PostgrestStore,
    reconciler: &Reconciler,
) -> Result<(), ReviewError> {
    for event in events {
        session.apply(event, store, reconciler)?;
    }
    Ok(())
}

pub fn run_apply(
    args: &ApplyArgs,
    config: &EffectiveConfig,
    output: OutputMode,
    quiet: bool,
) -> Result<()> {
    // Reject bad action names before touching the network.
    let events = match args.events() {
        Ok(events) => events,
        Err(err) => return fail(output, &err),
    };

    let store = connect(config, output)?;
    let reconciler = config.project.save.reconciler();
    let mut session = load_session(&store, &reconciler, output)?;
    if let Err(err) = stage(&mut session, events, &store, &reconciler) {
        return fail(output, &err);
    }

    let staged = session.tracker().len();
    let mut report = ApplyReport {
        dry_run: args.dry_run,
        policy: reconciler.policy,
        staged,
        saved: 0,
        planned: Vec::new(),
        failed: Vec::new(),
    };

    if args.dry_run {
        report.planned = plan_updates(session.tracker());
        return render(output, &report, render_report);
    }

    let outcome = session.save(&store, &reconciler);
    report.saved = outcome.saved_count();
    let error = match outcome {
        SaveOutcome::Failed {
            failures, total, ..
        } => {
            let err = ReviewError::Save {
                failed: failures.len(),
                total,
            };
            report.failed = failures
                .into_iter()
                .map(|failure| FailedRow {
                    id: failure.id,
                    error: failure.error.to_string(),
                })
                .collect();
            Some(err)
        }
        SaveOutcome::Saved { .. } | SaveOutcome::NothingToSave => None,
    };

    if !(quiet && error.is_none() && !output.is_json()) {
        render(output, &report, render_report)?;
    }
    match error {
        Some(err) => fail(output, &err),
        None => Ok(()),
    }
}
