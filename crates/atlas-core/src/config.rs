//! Configuration — YAML config + env var overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Known provider presets
const PROVIDER_PRESETS: &[(&str, Option<&str>)] = &[
    ("openai", Some("https://api.openai.com/v1")),
    ("openrouter", Some("https://openrouter.ai/api/v1")),
];

/// Provider-specific API key env vars (checked before OPENAI_API_KEY fallback)
const PROVIDER_KEY_ENV_VARS: &[(&str, &str)] = &[("openrouter", "OPENROUTER_API_KEY")];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// "openai" | "openrouter" | "custom"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Planner model name
    #[serde(default = "default_model")]
    pub model: String,

    /// API key (set here or via env var)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL for Chat Completions API (auto-set for known providers)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Set to false to run with the echo fallback planner only
    #[serde(default = "default_true")]
    pub planner_enabled: bool,

    /// Timeout for planner and weather HTTP calls
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// SQLite file, relative paths resolve against the config directory
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Seconds between scheduler ticks
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,

    /// Speak replies and reminders through a TTS program when one is installed
    #[serde(default)]
    pub speech: bool,

    /// Use desktop notifications for reminders when available
    #[serde(default = "default_true")]
    pub desktop_notifications: bool,

    /// Port for atlas-web
    #[serde(default = "default_web_port")]
    pub web_port: u16,

    /// Resolved project root (set at load time, not serialized from YAML)
    #[serde(skip)]
    pub project_root: PathBuf,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_true() -> bool {
    true
}
fn default_request_timeout() -> u64 {
    30
}
fn default_database_path() -> String {
    "assistant.db".into()
}
fn default_poll_interval() -> u64 {
    10
}
fn default_web_port() -> u16 {
    8000
}

impl Config {
    /// Load config from a YAML file with env var overrides.
    /// `config_path` is the path to config.yaml.
    pub fn load(config_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config: {}", config_path.display()))?;

        let mut config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config.yaml")?;

        config.project_root = resolve_root(config_path);
        config.apply_env()?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields defaults (env overrides still apply).
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.is_file() {
            return Self::load(config_path);
        }
        let mut config = Config {
            project_root: resolve_root(config_path),
            ..Config::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Provider (env var override)
        if let Ok(p) = std::env::var("ATLAS_PROVIDER") {
            self.provider = p;
        }

        // Base URL: env var > config > provider preset
        if let Ok(url) = std::env::var("ATLAS_BASE_URL") {
            self.base_url = Some(url);
        } else if self.base_url.is_none() {
            self.base_url = PROVIDER_PRESETS
                .iter()
                .find(|(p, _)| *p == self.provider)
                .and_then(|(_, url)| url.map(String::from));
        }

        // API key: provider-specific env var > OPENAI_API_KEY > config
        let provider_key_var = PROVIDER_KEY_ENV_VARS
            .iter()
            .find(|(p, _)| *p == self.provider)
            .map(|(_, var)| *var);

        if let Some(var) = provider_key_var {
            if let Ok(key) = std::env::var(var) {
                self.api_key = Some(key);
            }
        }
        if self.api_key.is_none() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                self.api_key = Some(key);
            }
        }

        if let Ok(m) = std::env::var("ATLAS_MODEL") {
            self.model = m;
        }

        if let Ok(db) = std::env::var("ATLAS_DB_PATH") {
            self.database_path = db;
        }

        if let Ok(secs) = std::env::var("ATLAS_POLL_INTERVAL") {
            self.poll_interval_seconds = secs
                .parse()
                .with_context(|| format!("ATLAS_POLL_INTERVAL is not a number: {secs}"))?;
        }

        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.provider == "custom" && self.base_url.is_none() {
            anyhow::bail!(
                "Provider 'custom' requires base_url in config.yaml or ATLAS_BASE_URL env var"
            );
        }
        if self.poll_interval_seconds == 0 {
            anyhow::bail!("poll_interval_seconds must be at least 1");
        }
        Ok(())
    }

    /// Whether the planner has what it needs to reach a reasoning service.
    /// Keyless custom endpoints (local servers) count as configured.
    pub fn planner_configured(&self) -> bool {
        self.planner_enabled
            && self.base_url.is_some()
            && (self.api_key.is_some() || self.provider == "custom")
    }

    pub fn database_file(&self) -> PathBuf {
        let p = Path::new(&self.database_path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.project_root.join(p)
        }
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_seconds)
    }
}

fn resolve_root(config_path: &Path) -> PathBuf {
    let parent = config_path.parent().unwrap_or(Path::new("."));
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    parent
        .canonicalize()
        .unwrap_or_else(|_| parent.to_path_buf())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            planner_enabled: true,
            request_timeout_seconds: default_request_timeout(),
            database_path: default_database_path(),
            poll_interval_seconds: default_poll_interval(),
            speech: false,
            desktop_notifications: true,
            web_port: default_web_port(),
            project_root: PathBuf::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_defaults() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "provider: openai\nmodel: gpt-4o-mini").unwrap();

        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.poll_interval_seconds, 10);
        assert_eq!(config.database_path, "assistant.db");
        assert!(config.desktop_notifications);
        assert!(!config.speech);
    }

    #[test]
    fn test_load_config_custom_values() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            "provider: custom\nmodel: llama3\nbase_url: http://localhost:11434/v1\npoll_interval_seconds: 3\nspeech: true"
        )
        .unwrap();

        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config.provider, "custom");
        assert_eq!(config.model, "llama3");
        assert_eq!(
            config.base_url.as_deref(),
            Some("http://localhost:11434/v1")
        );
        assert_eq!(config.poll_interval_seconds, 3);
        assert!(config.speech);
        assert!(config.planner_configured());
    }

    #[test]
    fn test_custom_without_base_url_fails() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "provider: custom\nmodel: llama3").unwrap();

        let result = Config::load(tmp.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_poll_interval_fails() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "poll_interval_seconds: 0").unwrap();
        assert!(Config::load(tmp.path()).is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config.web_port, 8000);
        assert!(config.database_file().ends_with("assistant.db"));
        assert!(config.database_file().starts_with(&config.project_root));
    }

    #[test]
    fn test_planner_disabled_is_not_configured() {
        let config = Config {
            planner_enabled: false,
            api_key: Some("k".into()),
            base_url: Some("https://api.openai.com/v1".into()),
            ..Config::default()
        };
        assert!(!config.planner_configured());
    }
}
