// Configuration loading and validation (clanwatch.toml).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::notify::{RenderSettings, DEFAULT_PROFILE_URL};
use crate::roster::{RosterMember, TrackedRoster};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "CLANWATCH_CONFIG";

const CONFIG_FILE: &str = "clanwatch.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// The tracked roster.
    pub players: Vec<RosterMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// WebSocket endpoint of the match feed.
    pub url: String,
    /// `Origin` header sent on connect. The public feed rejects clients
    /// without one.
    #[serde(default = "default_origin")]
    pub origin: Option<String>,
    #[serde(default = "default_recent_matches")]
    pub recent_matches_per_account: usize,
    #[serde(default = "default_receive_attempts")]
    pub receive_attempts: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default = "default_post_delay")]
    pub post_delay_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Hold finished matches back until every player has a result.
    #[serde(default)]
    pub await_scores: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            await_scores: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_profile_url")]
    pub profile_url: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            profile_url: default_profile_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

fn default_origin() -> Option<String> {
    Some("https://www.aoe2.net".to_string())
}

fn default_recent_matches() -> usize {
    5
}

fn default_receive_attempts() -> usize {
    3
}

fn default_post_delay() -> u64 {
    5
}

fn default_interval() -> u64 {
    50
}

fn default_profile_url() -> String {
    DEFAULT_PROFILE_URL.to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Config {
    pub fn roster(&self) -> TrackedRoster {
        TrackedRoster::new(self.players.clone())
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            profile_url: self.render.profile_url.clone(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_secs)
    }

    pub fn post_delay(&self) -> Duration {
        Duration::from_secs(self.webhook.post_delay_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate the config file at `path`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    parse_config(&text, path)
}

/// Parse and validate config text. `path` is only used in error messages.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

/// Copy `defaults/clanwatch.toml` to `config/clanwatch.toml` when the latter
/// is missing. Returns the path that was written, if any.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let default_path = base_dir.join("defaults").join(CONFIG_FILE);
    let config_dir = base_dir.join("config");
    let target = config_dir.join(CONFIG_FILE);

    if target.exists() {
        return Ok(None);
    }
    if !default_path.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "neither {} nor {} found; run from the project root or set {CONFIG_ENV}",
                target.display(),
                default_path.display()
            ),
        });
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;
    std::fs::copy(&default_path, &target).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {}: {e}", default_path.display()),
    })?;

    Ok(Some(target))
}

/// Load the config named by `CLANWATCH_CONFIG`, or `config/clanwatch.toml`
/// under the current directory (initialized from `defaults/` if missing).
pub fn load_config() -> Result<Config, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return load_config_from(Path::new(&path));
    }

    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd.join("config").join(CONFIG_FILE))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.players.is_empty() {
        return Err(invalid("players", "must list at least one account"));
    }

    let mut seen = HashSet::new();
    for member in &config.players {
        if !seen.insert(member.profile_id) {
            return Err(invalid(
                "players.profile_id",
                format!("duplicate account {}", member.profile_id),
            ));
        }
    }

    let url = &config.source.url;
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        return Err(invalid("source.url", format!("must be a ws:// or wss:// URL, got {url}")));
    }

    let hook = &config.webhook.url;
    if !(hook.starts_with("http://") || hook.starts_with("https://")) {
        return Err(invalid("webhook.url", "must be an http:// or https:// URL"));
    }

    let positive: &[(&str, u64)] = &[
        ("polling.interval_secs", config.polling.interval_secs),
        ("http.timeout_secs", config.http.timeout_secs),
        (
            "source.recent_matches_per_account",
            config.source.recent_matches_per_account as u64,
        ),
        ("source.receive_attempts", config.source.receive_attempts as u64),
    ];
    for (field, value) in positive {
        if *value == 0 {
            return Err(invalid(field, "must be > 0"));
        }
    }

    if config.render.profile_url.is_empty() {
        return Err(invalid("render.profile_url", "must not be empty"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
