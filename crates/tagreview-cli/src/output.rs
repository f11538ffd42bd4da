//! Output layer shared by every command: pretty for humans, compact text for
//! pipes and scripts, or stable JSON.
//!
//! The mode comes from `--format` (or the hidden `--json`), then `FORMAT`,
//! then the user config `output` key. With none of those set, a terminal
//! gets [`OutputMode::Pretty`] and a pipe gets [`OutputMode::Text`].
//!
//! Rendering goes through [`Renderable`] for row-shaped results and through
//! [`render`] / [`render_mode`] closures for one-off payloads.

use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, IsTerminal, Write};
use tagreview_core::ReviewError;

/// Width of the dashed rule under pretty headings.
pub const PRETTY_RULE_WIDTH: usize = 72;

pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Heading plus rule.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// `Key:` padded to a fixed column, then the value.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<14} {}", format!("{key}:"), value.as_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Sections and aligned fields for a terminal.
    Pretty,
    /// Plain text rows for pipes and scripts.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }

    /// Map a resolved config value (`pretty`, `text`, `json`) to a mode.
    ///
    /// Unknown values fall back to TTY detection.
    pub fn from_resolved(value: &str) -> Self {
        parse_mode(value).unwrap_or_else(|| tty_default(io::stdout().is_terminal()))
    }
}

fn parse_mode(raw: &str) -> Option<OutputMode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "json" => Some(OutputMode::Json),
        "text" => Some(OutputMode::Text),
        "pretty" => Some(OutputMode::Pretty),
        _ => None,
    }
}

const fn tty_default(is_tty: bool) -> OutputMode {
    if is_tty {
        OutputMode::Pretty
    } else {
        OutputMode::Text
    }
}

fn resolve_output_mode_inner(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    format_env: Option<&str>,
    is_tty: bool,
) -> OutputMode {
    if let Some(mode) = format_flag {
        return mode;
    }
    if json_flag {
        return OutputMode::Json;
    }
    format_env
        .and_then(parse_mode)
        .unwrap_or_else(|| tty_default(is_tty))
}

/// Resolve the output mode from flags, `FORMAT`, and TTY detection alone.
///
/// Used before configuration is loaded, so config errors can still be
/// rendered in the requested format.
pub fn resolve_output_mode(format_flag: Option<OutputMode>, json_flag: bool) -> OutputMode {
    let env_val = std::env::var("FORMAT").ok();
    let is_tty = io::stdout().is_terminal();
    resolve_output_mode_inner(format_flag, json_flag, env_val.as_deref(), is_tty)
}

/// A result type that can be rendered in every output mode.
pub trait Renderable {
    /// Labelled, multi-line output for humans.
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()>;

    /// A single self-contained JSON object.
    fn render_json(&self, w: &mut dyn Write) -> io::Result<()>;

    /// One text row, fields in [`Renderable::table_headers`] order.
    fn render_table(&self, w: &mut dyn Write) -> io::Result<()>;

    fn table_headers() -> &'static [&'static str]
    where
        Self: Sized,
    {
        &[]
    }
}

/// Write a list of [`Renderable`] items to `out`.
///
/// JSON mode always emits an array, even when empty.
pub fn render_list_to<R: Renderable>(
    out: &mut dyn Write,
    items: &[R],
    mode: OutputMode,
) -> io::Result<()> {
    match mode {
        OutputMode::Pretty => {
            for item in items {
                item.render_human(out)?;
            }
        }
        OutputMode::Text => {
            if !items.is_empty() && !R::table_headers().is_empty() {
                writeln!(out, "{}", R::table_headers().join("\t"))?;
            }
            for item in items {
                item.render_table(out)?;
            }
        }
        OutputMode::Json => {
            write!(out, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(out, ",")?;
                }
                writeln!(out)?;
                let mut buf = Vec::new();
                item.render_json(&mut buf)?;
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                out.write_all(&buf)?;
            }
            writeln!(out, "\n]")?;
        }
    }
    Ok(())
}

pub fn render_list<R: Renderable>(items: &[R], mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    render_list_to(&mut out, items, mode)
}

/// Write `value` to stdout: serde JSON, or one of the two human renderers.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

/// Like [`render_mode`] when text and pretty output are the same.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl Fn(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    render_mode(mode, value, &human_fn, &human_fn)
}

/// Error payload printed to stderr; JSON mode wraps it as `{"error": ...}`.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable code, e.g. `E4001`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    pub fn with_details(
        message: impl Into<String>,
        suggestion: impl Into<String>,
        error_code: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            suggestion: Some(suggestion.into()),
            error_code: Some(error_code.into()),
        }
    }
}

impl From<&ReviewError> for CliError {
    fn from(err: &ReviewError) -> Self {
        Self {
            message: err.to_string(),
            suggestion: Some(err.suggestion()),
            error_code: Some(err.error_code().to_string()),
        }
    }
}

fn render_error_to(out: &mut dyn Write, mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({ "error": error });
            serde_json::to_writer_pretty(&mut *out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            writeln!(out, "error: {}", error.message)?;
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    render_error_to(&mut out, mode, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagreview_core::StoreError;

    #[test]
    fn format_flag_wins_over_json_and_env() {
        let mode = resolve_output_mode_inner(Some(OutputMode::Text), true, Some("pretty"), true);
        assert_eq!(mode, OutputMode::Text);
    }

    #[test]
    fn json_flag_wins_over_env() {
        let mode = resolve_output_mode_inner(None, true, Some("text"), true);
        assert_eq!(mode, OutputMode::Json);
    }

    #[test]
    fn format_env_is_case_insensitive() {
        assert_eq!(
            resolve_output_mode_inner(None, false, Some("JSON"), true),
            OutputMode::Json
        );
    }

    #[test]
    fn unknown_env_falls_through_to_tty() {
        assert_eq!(
            resolve_output_mode_inner(None, false, Some("yaml"), true),
            OutputMode::Pretty
        );
        assert_eq!(
            resolve_output_mode_inner(None, false, None, false),
            OutputMode::Text
        );
    }

    struct Tally(&'static str, u32);

    impl Renderable for Tally {
        fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
            writeln!(w, "{} x{}", self.0, self.1)
        }

        fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
            serde_json::to_writer(&mut *w, &serde_json::json!({ "tag": self.0, "uses": self.1 }))?;
            writeln!(w)
        }

        fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
            writeln!(w, "{}\t{}", self.0, self.1)
        }

        fn table_headers() -> &'static [&'static str] {
            &["TAG", "USES"]
        }
    }

    fn rendered(items: &[Tally], mode: OutputMode) -> String {
        let mut buf = Vec::new();
        render_list_to(&mut buf, items, mode).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn text_list_has_header_then_rows() {
        let out = rendered(
            &[Tally("rust", 1), Tally("go", 2)],
            OutputMode::Text,
        );
        assert_eq!(out, "TAG\tUSES\nrust\t1\ngo\t2\n");
    }

    #[test]
    fn empty_text_list_prints_nothing() {
        assert_eq!(rendered(&[], OutputMode::Text), "");
    }

    #[test]
    fn json_list_is_a_valid_array() {
        let out = rendered(
            &[Tally("rust", 1), Tally("go", 2)],
            OutputMode::Json,
        );
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(value[1]["uses"], 2);

        let empty: serde_json::Value =
            serde_json::from_str(&rendered(&[], OutputMode::Json)).unwrap();
        assert_eq!(empty, serde_json::json!([]));
    }

    #[test]
    fn cli_error_from_review_error_carries_code_and_hint() {
        let err = ReviewError::Load(StoreError::Transport("refused".into()));
        let cli_err = CliError::from(&err);
        assert!(cli_err.message.contains("refused"));
        assert_eq!(cli_err.error_code.as_deref(), Some("E4001"));
        assert!(cli_err.suggestion.is_some());
    }

    #[test]
    fn json_error_is_wrapped() {
        let mut buf = Vec::new();
        let err = CliError::with_details("bad input", "try again", "E2005");
        render_error_to(&mut buf, OutputMode::Json, &err).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["error"]["message"], "bad input");
        assert_eq!(value["error"]["suggestion"], "try again");
        assert_eq!(value["error"]["error_code"], "E2005");
    }

    #[test]
    fn text_error_without_suggestion_is_one_line() {
        let mut buf = Vec::new();
        let err = CliError {
            message: "boom".into(),
            suggestion: None,
            error_code: None,
        };
        render_error_to(&mut buf, OutputMode::Text, &err).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "error: boom\n");
    }
}
