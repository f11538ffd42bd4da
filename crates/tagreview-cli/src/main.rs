#![forbid(unsafe_code)]

mod cmd;
mod output;
mod remote;
mod tui;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use tagreview_core::ErrorCode;
use tagreview_core::config::resolve_config;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tagreview: review AI-proposed tag mappings",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Output format (pretty, text, json). Defaults to pretty on a TTY.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Review",
        about = "Open the interactive review table",
        long_about = "Open the full-screen review table. Rows load in descending frequency; \
                      edits stay local until saved with `s`.",
        after_help = "EXAMPLES:\n    # Review against the configured store\n    tagreview review\n\n    # Point at a store for this session only\n    TAGREVIEW_URL=https://xyz.supabase.co tagreview review"
    )]
    Review,

    #[command(
        next_help_heading = "Read",
        about = "List rows in review order",
        long_about = "List tag mapping rows in descending frequency, optionally filtered by action.",
        after_help = "EXAMPLES:\n    # Rows nobody has decided on yet\n    tagreview list --action unset\n\n    # Top ten as JSON\n    tagreview list -n 10 --format json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one row in full",
        long_about = "Show one row including the AI's reasoning and the review notes.",
        after_help = "EXAMPLES:\n    # Inspect row 42\n    tagreview show 42"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show review progress",
        long_about = "Count rows by action.",
        after_help = "EXAMPLES:\n    # Progress summary\n    tagreview stats\n\n    # Machine-readable\n    tagreview stats --format json"
    )]
    Stats(cmd::stats::StatsArgs),

    #[command(
        next_help_heading = "Write",
        about = "Apply review decisions without the TUI",
        long_about = "Stage action and note edits from flags, then save them as one batch \
                      using the configured save policy.",
        after_help = "EXAMPLES:\n    # Approve two rows and reject one\n    tagreview apply --approve 3 --approve 7 --reject 9\n\n    # Annotate and preview the payloads\n    tagreview apply --set 12=reject --note 12=\"duplicate of 4\" --dry-run"
    )]
    Apply(cmd::apply::ApplyArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Inspect or change configuration",
        long_about = "Show resolved configuration or set and unset keys in the project \
                      (.tagreview/config.toml) or user scope.",
        after_help = "EXAMPLES:\n    # Resolved settings\n    tagreview config show\n\n    # Save one row at a time and keep the ones that succeed\n    tagreview config set save.policy per-row"
    )]
    Config(cmd::config::ConfigArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Bash\n    tagreview completions bash > ~/.local/share/bash-completion/completions/tagreview"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

impl Cli {
    /// Output mode from flags and `FORMAT` alone, before config is read.
    fn fallback_output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

fn default_filter(verbose: bool, quiet: bool, interactive: bool) -> &'static str {
    if interactive {
        // Log lines would tear the alternate screen.
        "off"
    } else if quiet {
        "error"
    } else if verbose || env::var("DEBUG").is_ok() {
        "tagreview=debug,info"
    } else {
        "tagreview=info,warn"
    }
}

fn init_tracing(verbose: bool, quiet: bool, interactive: bool) {
    let filter = EnvFilter::try_from_env("TAGREVIEW_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, quiet, interactive)));

    let format = env::var("TAGREVIEW_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(
        cli.verbose,
        cli.quiet,
        matches!(cli.command, Commands::Review),
    );

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let fallback = cli.fallback_output_mode();

    match cli.command {
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            return cmd::completions::run_completions(args.shell, &mut command);
        }
        Commands::Config(ref args) => {
            return cmd::config::run_config(args, &project_root, fallback);
        }
        _ => {}
    }

    let config = match resolve_config(&project_root, cli.json) {
        Ok(config) => config,
        Err(err) => {
            let code = ErrorCode::ConfigParseError;
            render_error(
                fallback,
                &CliError::with_details(
                    format!("{err:#}"),
                    code.hint().unwrap_or_default(),
                    code.code(),
                ),
            )?;
            anyhow::bail!("[{code}] {err:#}");
        }
    };
    let output = cli
        .format
        .unwrap_or_else(|| OutputMode::from_resolved(&config.resolved_output));

    match cli.command {
        Commands::Review => {
            let store = cmd::connect(&config, output)?;
            tui::run_review(&config, store)
        }
        Commands::List(ref args) => cmd::list::run_list(args, &config, output),
        Commands::Show(ref args) => cmd::show::run_show(args, &config, output),
        Commands::Stats(ref args) => cmd::stats::run_stats(args, &config, output),
        Commands::Apply(ref args) => cmd::apply::run_apply(args, &config, output, cli.quiet),
        Commands::Config(_) | Commands::Completions(_) => Ok(()),
    }
}
