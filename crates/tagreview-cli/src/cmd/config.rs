use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tagreview_core::config::{EffectiveConfig, project_config_path, resolve_config};
use toml::Value;

use crate::output::OutputMode;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the merged configuration, or one raw file
    Show(ShowArgs),
    /// Write one key to the project or user file
    Set(SetArgs),
    /// Remove one key from the project or user file
    Unset(UnsetArgs),
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// Print .tagreview/config.toml as written
    #[arg(long, conflicts_with = "user")]
    project: bool,

    /// Print the user config file as written
    #[arg(long)]
    user: bool,
}

#[derive(Args, Debug)]
struct SetArgs {
    /// Scope to mutate
    #[arg(long, default_value = "project")]
    scope: ConfigScope,

    /// Dot path key (e.g. store.url, save.policy, output)
    key: String,

    /// New value
    value: String,
}

#[derive(Args, Debug)]
struct UnsetArgs {
    /// Scope to mutate
    #[arg(long, default_value = "project")]
    scope: ConfigScope,

    /// Dot path key (e.g. store.url, save.policy, output)
    key: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum ConfigScope {
    Project,
    User,
}

pub fn run_config(args: &ConfigArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    match &args.command {
        ConfigCommand::Show(show) => run_show(show, project_root, output),
        ConfigCommand::Set(set) => run_set(set, project_root, output),
        ConfigCommand::Unset(unset) => run_unset(unset, project_root, output),
    }
}

fn user_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("tagreview/config.toml"))
        .ok_or_else(|| anyhow!("Could not determine the user config directory"))
}

fn scope_path(scope: ConfigScope, project_root: &Path) -> Result<PathBuf> {
    match scope {
        ConfigScope::Project => Ok(project_config_path(project_root)),
        ConfigScope::User => user_config_path(),
    }
}

const fn scope_label(scope: ConfigScope) -> &'static str {
    match scope {
        ConfigScope::Project => "project",
        ConfigScope::User => "user",
    }
}

fn run_show(args: &ShowArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    if args.project || args.user {
        let scope = if args.user {
            ConfigScope::User
        } else {
            ConfigScope::Project
        };
        let mut value = load_toml_table(&scope_path(scope, project_root)?)?;
        redact_table(&mut value);
        print_toml_or_json(&value, output)?;
        return Ok(());
    }

    let effective = resolve_config(project_root, output.is_json())?;
    print_effective(&effective, output)
}

fn run_set(args: &SetArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let path = scope_path(args.scope, project_root)?;
    let mut value = load_toml_table(&path)?;
    apply_set(&mut value, args.scope, &args.key, &args.value)?;
    write_toml_table(&path, &value)?;
    tracing::info!(key = %args.key, scope = scope_label(args.scope), "config key set");
    render_mutation(output, "set", scope_label(args.scope), &args.key)
}

fn run_unset(args: &UnsetArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let path = scope_path(args.scope, project_root)?;
    let mut value = load_toml_table(&path)?;
    apply_unset(&mut value, args.scope, &args.key)?;
    write_toml_table(&path, &value)?;
    render_mutation(output, "unset", scope_label(args.scope), &args.key)
}

/// Split `section.leaf`; top-level keys have no section.
fn split_known_key(scope: ConfigScope, key: &str) -> Result<(Option<&str>, &str)> {
    let (section, leaf) = match key.split_once('.') {
        Some((section, leaf)) => (Some(section), leaf),
        None => (None, key),
    };

    let store_key = matches!(
        (section, leaf),
        (Some("store"), "url" | "api_key" | "table" | "timeout_secs")
    );
    let valid = match scope {
        ConfigScope::Project => {
            store_key
                || matches!(
                    (section, leaf),
                    (Some("save"), "policy" | "max_in_flight") | (Some("review"), "toast_secs")
                )
        }
        ConfigScope::User => store_key || matches!((section, leaf), (None, "output")),
    };

    if valid {
        Ok((section, leaf))
    } else {
        bail!("Unsupported key `{key}` for {} scope", scope_label(scope));
    }
}

fn parse_value(key: &str, leaf: &str, raw: &str) -> Result<Value> {
    match leaf {
        "timeout_secs" | "max_in_flight" | "toast_secs" => {
            let number: i64 = raw
                .parse()
                .with_context(|| format!("{key} expects a whole number"))?;
            if number < 0 {
                bail!("{key} must not be negative");
            }
            Ok(Value::Integer(number))
        }
        "policy" => match raw {
            "all-or-nothing" | "per-row" => Ok(Value::String(raw.to_string())),
            _ => bail!("{key} expects all-or-nothing or per-row"),
        },
        _ => Ok(Value::String(raw.to_string())),
    }
}

fn root_table(root: &mut Value) -> Result<&mut toml::map::Map<String, Value>> {
    root.as_table_mut()
        .ok_or_else(|| anyhow!("Config root must be a TOML table"))
}

fn apply_set(root: &mut Value, scope: ConfigScope, key: &str, raw: &str) -> Result<()> {
    let (section, leaf) = split_known_key(scope, key)?;
    let parsed = parse_value(key, leaf, raw)?;
    let table = root_table(root)?;

    let Some(section) = section else {
        table.insert(leaf.to_string(), parsed);
        return Ok(());
    };

    let section_table = table
        .entry(section.to_string())
        .or_insert_with(|| Value::Table(toml::map::Map::new()))
        .as_table_mut()
        .ok_or_else(|| anyhow!("Section {section} must be a TOML table"))?;
    section_table.insert(leaf.to_string(), parsed);
    Ok(())
}

fn apply_unset(root: &mut Value, scope: ConfigScope, key: &str) -> Result<()> {
    let (section, leaf) = split_known_key(scope, key)?;
    let table = root_table(root)?;

    let Some(section) = section else {
        table.remove(leaf);
        return Ok(());
    };

    if let Some(section_table) = table.get_mut(section).and_then(Value::as_table_mut) {
        section_table.remove(leaf);
        if section_table.is_empty() {
            table.remove(section);
        }
    }
    Ok(())
}

fn redact_table(root: &mut Value) {
    if let Some(key) = root
        .get_mut("store")
        .and_then(Value::as_table_mut)
        .and_then(|store| store.get_mut("api_key"))
    {
        *key = Value::String("<redacted>".to_string());
    }
}

fn load_toml_table(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(Value::Table(toml::map::Map::new()));
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let value: Value =
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;

    if !value.is_table() {
        bail!("{} must contain a top-level TOML table", path.display());
    }

    Ok(value)
}

fn write_toml_table(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let serialized = toml::to_string_pretty(value)?;
    std::fs::write(path, serialized).with_context(|| format!("Failed to write {}", path.display()))
}

fn print_toml_or_json(value: &Value, output: OutputMode) -> Result<()> {
    match output {
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputMode::Text | OutputMode::Pretty => print!("{}", toml::to_string_pretty(value)?),
    }
    Ok(())
}

/// Flat `key=value` lines for the resolved configuration, key redacted.
fn effective_lines(value: &EffectiveConfig) -> Vec<(String, String)> {
    let mut lines = vec![("resolved_output".to_string(), value.resolved_output.clone())];
    match &value.store {
        Some(store) => {
            lines.push(("store.url".into(), store.url.clone()));
            lines.push((
                "store.api_key".into(),
                if store.api_key.is_some() {
                    "<redacted>".into()
                } else {
                    "<unset>".into()
                },
            ));
            lines.push(("store.table".into(), store.table.clone()));
            lines.push((
                "store.timeout_secs".into(),
                store
                    .timeout_secs
                    .map_or_else(|| "<unset>".to_string(), |t| t.to_string()),
            ));
        }
        None => lines.push(("store.url".into(), "<unset>".into())),
    }

    let policy = match value.project.save.policy {
        tagreview_core::SavePolicy::AllOrNothing => "all-or-nothing",
        tagreview_core::SavePolicy::PerRow => "per-row",
    };
    lines.push(("save.policy".into(), policy.into()));
    lines.push((
        "save.max_in_flight".into(),
        value
            .project
            .save
            .max_in_flight
            .map_or_else(|| "<unset>".to_string(), |n| n.to_string()),
    ));
    lines.push((
        "review.toast_secs".into(),
        value.project.review.toast_secs.to_string(),
    ));
    lines
}

fn print_effective(value: &EffectiveConfig, output: OutputMode) -> Result<()> {
    match output {
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputMode::Text => {
            for (key, val) in effective_lines(value) {
                println!("{key}={val}");
            }
        }
        OutputMode::Pretty => {
            for (key, val) in effective_lines(value) {
                println!("{key:<20} {val}");
            }
        }
    }
    Ok(())
}

fn render_mutation(output: OutputMode, action: &str, scope: &str, key: &str) -> Result<()> {
    match output {
        OutputMode::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "ok": true,
                    "action": action,
                    "scope": scope,
                    "key": key,
                }))?
            );
        }
        OutputMode::Text => println!("ok=true action={action} scope={scope} key={key}"),
        OutputMode::Pretty => println!("{action} {key} in {scope} config"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagreview_core::config::{EnvOverrides, ProjectConfig, UserConfig, merge_config};

    fn empty() -> Value {
        Value::Table(toml::map::Map::new())
    }

    #[test]
    fn set_and_unset_round_trip_a_project_key() {
        let mut root = empty();
        apply_set(&mut root, ConfigScope::Project, "store.url", "https://x.supabase.co").unwrap();
        apply_set(&mut root, ConfigScope::Project, "save.max_in_flight", "4").unwrap();
        assert_eq!(root["store"]["url"].as_str(), Some("https://x.supabase.co"));
        assert_eq!(root["save"]["max_in_flight"].as_integer(), Some(4));

        apply_unset(&mut root, ConfigScope::Project, "store.url").unwrap();
        assert!(root.get("store").is_none());
        assert!(root.get("save").is_some());
    }

    #[test]
    fn user_scope_accepts_top_level_output() {
        let mut root = empty();
        apply_set(&mut root, ConfigScope::User, "output", "json").unwrap();
        assert_eq!(root["output"].as_str(), Some("json"));
        assert!(apply_set(&mut root, ConfigScope::Project, "output", "json").is_err());
    }

    #[test]
    fn policy_and_numbers_are_validated() {
        let mut root = empty();
        assert!(apply_set(&mut root, ConfigScope::Project, "save.policy", "sometimes").is_err());
        assert!(apply_set(&mut root, ConfigScope::Project, "review.toast_secs", "-1").is_err());
        assert!(apply_set(&mut root, ConfigScope::Project, "store.bogus", "1").is_err());
        apply_set(&mut root, ConfigScope::Project, "save.policy", "per-row").unwrap();
        assert_eq!(root["save"]["policy"].as_str(), Some("per-row"));
    }

    #[test]
    fn raw_view_redacts_api_key() {
        let mut root = empty();
        apply_set(&mut root, ConfigScope::Project, "store.api_key", "secret").unwrap();
        redact_table(&mut root);
        assert_eq!(root["store"]["api_key"].as_str(), Some("<redacted>"));
    }

    #[test]
    fn effective_lines_never_show_the_key() {
        let env = EnvOverrides {
            url: Some("https://x.supabase.co".into()),
            api_key: Some("secret".into()),
            ..EnvOverrides::default()
        };
        let config = merge_config(ProjectConfig::default(), UserConfig::default(), &env, true);
        let lines = effective_lines(&config);
        assert!(lines.iter().all(|(_, v)| v != "secret"));
        assert!(lines.contains(&("store.table".to_string(), "Tag_Mapping".to_string())));
        assert!(lines.contains(&("save.policy".to_string(), "all-or-nothing".to_string())));
    }
}
