//! `tagreview show`: one row with the AI's reasoning and review notes.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use tagreview_core::config::EffectiveConfig;
use tagreview_core::model::{RowId, TagMapping};
use tagreview_core::ReviewError;

use super::{connect, fail, load_session, or_dash};
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Row id.
    pub id: RowId,
}

fn created_label(row: &TagMapping) -> String {
    row.created_at.map_or_else(
        || "-".to_string(),
        |ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

fn render_text(row: &TagMapping, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "id\t{}", row.id)?;
    writeln!(w, "old_tag\t{}", row.old_tag.as_deref().unwrap_or_default())?;
    writeln!(w, "new_tag\t{}", row.new_tag.as_deref().unwrap_or_default())?;
    writeln!(w, "action\t{}", row.action)?;
    writeln!(
        w,
        "frequency\t{}",
        row.frequency.map_or_else(String::new, |f| f.to_string())
    )?;
    writeln!(w, "ai_suggestion\t{}", row.ai_suggestion.as_deref().unwrap_or_default())?;
    writeln!(w, "ai_new_name\t{}", row.ai_new_name.as_deref().unwrap_or_default())?;
    writeln!(w, "ai_reasoning\t{}", row.ai_reasoning.as_deref().unwrap_or_default())?;
    writeln!(w, "notes\t{}", row.notes_text())
}

fn render_pretty(row: &TagMapping, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(
        w,
        &format!(
            "Row #{}: {} -> {}",
            row.id,
            or_dash(row.old_tag.as_deref()),
            or_dash(row.new_tag.as_deref())
        ),
    )?;
    pretty_kv(w, "Action", row.action.to_string())?;
    pretty_kv(
        w,
        "Frequency",
        row.frequency.map_or_else(|| "-".to_string(), |f| f.to_string()),
    )?;
    pretty_kv(w, "Created", created_label(row))?;
    pretty_kv(w, "AI suggestion", or_dash(row.ai_suggestion.as_deref()))?;
    pretty_kv(w, "AI new name", or_dash(row.ai_new_name.as_deref()))?;
    writeln!(w)?;
    writeln!(w, "Reasoning")?;
    pretty_rule(w)?;
    writeln!(w, "{}", or_dash(row.ai_reasoning.as_deref()))?;
    writeln!(w)?;
    writeln!(w, "Notes")?;
    pretty_rule(w)?;
    writeln!(w, "{}", or_dash(row.notes.as_deref()))
}

pub fn run_show(args: &ShowArgs, config: &EffectiveConfig, output: OutputMode) -> Result<()> {
    let store = connect(config, output)?;
    let session = load_session(&store, &config.project.save.reconciler(), output)?;

    let Some(row) = session.row(args.id) else {
        return fail(output, &ReviewError::RowNotFound(args.id));
    };

    render_mode(output, row, render_text, render_pretty)
}
