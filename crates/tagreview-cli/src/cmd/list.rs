//! `tagreview list`: rows in review order.

use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use tagreview_core::config::EffectiveConfig;
use tagreview_core::model::{Action, TagMapping};
use tagreview_core::ReviewError;

use super::{connect, fail, load_session, or_dash};
use crate::output::{OutputMode, Renderable, render_list};

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Only rows with this action (approved, reject, unset).
    #[arg(long)]
    pub action: Option<String>,

    /// Show at most this many rows.
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

/// Borrowed row wrapper so listings render without cloning.
pub struct RowLine<'a>(pub &'a TagMapping);

impl Renderable for RowLine<'_> {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let row = self.0;
        writeln!(
            w,
            "#{:<6} {:>6}  {} -> {}  [{}]",
            row.id,
            row.frequency.map_or_else(|| "-".to_string(), |f| f.to_string()),
            or_dash(row.old_tag.as_deref()),
            or_dash(row.new_tag.as_deref()),
            row.action
        )?;
        if let Some(suggestion) = row.ai_suggestion.as_deref().filter(|s| !s.is_empty()) {
            writeln!(
                w,
                "        ai: {suggestion} ({})",
                or_dash(row.ai_new_name.as_deref())
            )?;
        }
        Ok(())
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(&mut *w, self.0)?;
        writeln!(w)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        let row = self.0;
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            row.id,
            row.frequency.map_or_else(String::new, |f| f.to_string()),
            row.old_tag.as_deref().unwrap_or_default(),
            row.new_tag.as_deref().unwrap_or_default(),
            row.action,
            row.ai_suggestion.as_deref().unwrap_or_default()
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["ID", "FREQ", "OLD", "NEW", "ACTION", "AI"]
    }
}

/// Keep rows matching `action`, then cut to `limit`.
pub fn select_rows<'a>(
    rows: &'a [TagMapping],
    action: Option<Action>,
    limit: Option<usize>,
) -> Vec<RowLine<'a>> {
    rows.iter()
        .filter(|row| action.is_none_or(|wanted| row.action == wanted))
        .take(limit.unwrap_or(usize::MAX))
        .map(RowLine)
        .collect()
}

pub fn run_list(args: &ListArgs, config: &EffectiveConfig, output: OutputMode) -> Result<()> {
    let action = match args.action.as_deref().map(str::parse::<Action>).transpose() {
        Ok(action) => action,
        Err(err) => return fail(output, &ReviewError::from(err)),
    };

    let store = connect(config, output)?;
    let session = load_session(&store, &config.project.save.reconciler(), output)?;
    let lines = select_rows(session.rows(), action, args.limit);
    tracing::debug!(shown = lines.len(), total = session.rows().len(), "listing rows");

    if lines.is_empty() && output == OutputMode::Pretty {
        println!("No rows.");
        return Ok(());
    }
    render_list(&lines, output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<TagMapping> {
        vec![
            TagMapping {
                old_tag: Some("js".into()),
                new_tag: Some("javascript".into()),
                frequency: Some(12),
                action: Action::Approved,
                ..TagMapping::new(1)
            },
            TagMapping {
                frequency: Some(4),
                ..TagMapping::new(2)
            },
            TagMapping {
                frequency: Some(2),
                action: Action::Approved,
                ..TagMapping::new(3)
            },
        ]
    }

    #[test]
    fn action_filter_and_limit_compose() {
        let rows = rows();
        let ids: Vec<_> = select_rows(&rows, Some(Action::Approved), None)
            .iter()
            .map(|line| line.0.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);

        let limited = select_rows(&rows, None, Some(2));
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn text_row_is_tab_separated_in_header_order() {
        let rows = rows();
        let mut buf = Vec::new();
        RowLine(&rows[0]).render_table(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "1\t12\tjs\tjavascript\tapproved\t\n"
        );
        assert_eq!(RowLine::table_headers().len(), 6);
    }

    #[test]
    fn json_row_uses_table_column_names() {
        let rows = rows();
        let mut buf = Vec::new();
        RowLine(&rows[1]).render_json(&mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["id"], 2);
        assert_eq!(value["Action"], serde_json::Value::Null);
        assert_eq!(value["Frequency"], 4);
    }
}
