//! `tagreview stats`: review progress counts.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use tagreview_core::config::EffectiveConfig;
use tagreview_core::session::ReviewStats;

use super::{connect, load_session};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug, Default)]
pub struct StatsArgs {}

fn percent(part: usize, total: usize) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = part as f64 / total as f64;
    format!("{:.0}%", ratio * 100.0)
}

fn render_text(stats: &ReviewStats, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "total\t{}", stats.total)?;
    writeln!(w, "approved\t{}", stats.approved)?;
    writeln!(w, "rejected\t{}", stats.rejected)?;
    writeln!(w, "unset\t{}", stats.unset)
}

fn render_pretty(stats: &ReviewStats, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Review progress")?;
    pretty_kv(w, "Total", stats.total.to_string())?;
    pretty_kv(
        w,
        "Approved",
        format!("{} ({})", stats.approved, percent(stats.approved, stats.total)),
    )?;
    pretty_kv(
        w,
        "Rejected",
        format!("{} ({})", stats.rejected, percent(stats.rejected, stats.total)),
    )?;
    pretty_kv(
        w,
        "Unreviewed",
        format!("{} ({})", stats.unset, percent(stats.unset, stats.total)),
    )
}

pub fn run_stats(_args: &StatsArgs, config: &EffectiveConfig, output: OutputMode) -> Result<()> {
    let store = connect(config, output)?;
    let session = load_session(&store, &config.project.save.reconciler(), output)?;
    render_mode(output, &session.stats(), render_text, render_pretty)
}
