use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ReviewError;
use crate::reconcile::{Reconciler, SavePolicy};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub save: SaveConfig,
    #[serde(default)]
    pub review: ReviewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, serialize_with = "redact_key")]
    pub api_key: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            table: default_table(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveConfig {
    #[serde(default)]
    pub policy: SavePolicy,
    #[serde(default)]
    pub max_in_flight: Option<usize>,
}

impl SaveConfig {
    #[must_use]
    pub const fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.policy).with_max_in_flight(self.max_in_flight)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default = "default_toast_secs")]
    pub toast_secs: u64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            toast_secs: default_toast_secs(),
        }
    }
}

impl ReviewConfig {
    #[must_use]
    pub const fn toast_ttl(&self) -> Duration {
        Duration::from_secs(self.toast_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub store: Option<StoreConfig>,
}

/// Connection settings after config files and environment are merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreSettings {
    pub url: String,
    #[serde(serialize_with = "redact_key")]
    pub api_key: Option<String>,
    pub table: String,
    pub timeout_secs: Option<u64>,
}

impl StoreSettings {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[allow(clippy::ref_option)]
fn redact_key<S: serde::Serializer>(key: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    match key {
        Some(_) => serializer.serialize_str("<redacted>"),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    #[serde(skip)]
    pub user: UserConfig,
    pub store: Option<StoreSettings>,
    pub resolved_output: String,
}

impl EffectiveConfig {
    /// Store settings, or [`ReviewError::NotConfigured`] when no URL is known.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::NotConfigured`] if no store URL was resolved.
    pub fn require_store(&self) -> Result<&StoreSettings, ReviewError> {
        self.store.as_ref().ok_or(ReviewError::NotConfigured)
    }
}

#[must_use]
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".tagreview/config.toml")
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("tagreview/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Environment values that override file configuration.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub table: Option<String>,
    pub format: Option<String>,
}

impl EnvOverrides {
    /// Read `TAGREVIEW_*` variables, falling back to the Supabase names.
    #[must_use]
    pub fn from_env() -> Self {
        fn first(names: &[&str]) -> Option<String> {
            names
                .iter()
                .filter_map(|name| env::var(name).ok())
                .find(|value| !value.trim().is_empty())
        }

        Self {
            url: first(&["TAGREVIEW_URL", "SUPABASE_URL"]),
            api_key: first(&["TAGREVIEW_API_KEY", "SUPABASE_ANON_KEY"]),
            table: first(&["TAGREVIEW_TABLE"]),
            format: first(&["FORMAT"]),
        }
    }
}

pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;
    Ok(merge_config(project, user, &EnvOverrides::from_env(), cli_json))
}

/// Merge file configuration with environment overrides.
///
/// Store precedence, per field: environment, project file, user file.
#[must_use]
pub fn merge_config(
    project: ProjectConfig,
    user: UserConfig,
    env: &EnvOverrides,
    cli_json: bool,
) -> EffectiveConfig {
    let user_store = user.store.clone().unwrap_or_default();
    let url = env
        .url
        .clone()
        .or_else(|| project.store.url.clone())
        .or(user_store.url);
    let store = url.map(|url| StoreSettings {
        url: url.trim_end_matches('/').to_string(),
        api_key: env
            .api_key
            .clone()
            .or_else(|| project.store.api_key.clone())
            .or(user_store.api_key),
        table: env.table.clone().unwrap_or_else(|| {
            if project.store.table == default_table() {
                user_store.table
            } else {
                project.store.table.clone()
            }
        }),
        timeout_secs: project.store.timeout_secs.or(user_store.timeout_secs),
    });

    let resolved_output = resolve_output(
        cli_json,
        user.output.clone(),
        env.format.clone(),
        std::io::stdout().is_terminal(),
    );

    EffectiveConfig {
        project,
        user,
        store,
        resolved_output,
    }
}

fn resolve_output(
    cli_json: bool,
    user_output: Option<String>,
    env_format: Option<String>,
    is_tty: bool,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if is_tty {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

fn default_table() -> String {
    "Tag_Mapping".to_string()
}

const fn default_toast_secs() -> u64 {
    5
}
