//! Runtime configuration
//!
//! Layers, later wins: built-in defaults, `<config dir>/doccollab/config.toml`,
//! then `DOCCOLLAB_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};

/// Default backend URL, a local Supabase stack
const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:54321";

pub const ENV_BACKEND_URL: &str = "DOCCOLLAB_BACKEND_URL";
pub const ENV_ANON_KEY: &str = "DOCCOLLAB_ANON_KEY";
pub const ENV_SITE_URL: &str = "DOCCOLLAB_SITE_URL";
pub const ENV_AUTOSAVE_MS: &str = "DOCCOLLAB_AUTOSAVE_MS";

/// Shape of `config.toml`
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
struct FileConfig {
    backend_url: Option<String>,
    anon_key: Option<String>,
    site_url: Option<String>,
    autosave_ms: Option<u64>,
    roster_limit: Option<usize>,
}

/// Application configuration wrapper.
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
}

impl Config {
    pub fn new(app: AppConfig) -> Self {
        Self { app }
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        Ok(Self::new(builder.build()?))
    }

    /// Load from the default config file (if present) and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        Self::load_from(path.as_deref(), |key| std::env::var(key).ok())
    }

    /// Load from an optional TOML file and an environment lookup
    pub fn load_from<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match path {
            Some(path) if path.exists() => read_file(path)?,
            _ => FileConfig::default(),
        };

        let mut builder = AppConfig::builder().backend_url(DEFAULT_BACKEND_URL);

        if let Some(url) = file.backend_url {
            builder = builder.backend_url(url);
        }
        if let Some(key) = file.anon_key {
            builder = builder.anon_key(key);
        }
        if let Some(site) = file.site_url {
            builder = builder.site_url(site);
        }
        if let Some(ms) = file.autosave_ms {
            builder = builder.autosave_delay(Duration::from_millis(ms));
        }
        if let Some(limit) = file.roster_limit {
            builder = builder.roster_limit(limit);
        }

        if let Some(url) = env(ENV_BACKEND_URL) {
            builder = builder.backend_url(url);
        }
        if let Some(key) = env(ENV_ANON_KEY) {
            builder = builder.anon_key(key);
        }
        if let Some(site) = env(ENV_SITE_URL) {
            builder = builder.site_url(site);
        }
        if let Some(ms) = env(ENV_AUTOSAVE_MS) {
            let ms = ms
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::OutOfRange("autosave_delay"))?;
            builder = builder.autosave_delay(Duration::from_millis(ms));
        }

        Self::with_builder(builder)
    }

    /// `<config dir>/doccollab/config.toml`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("doccollab").join("config.toml"))
    }

    /// `<data dir>/doccollab/session.json`, where the signed-in session is kept
    pub fn session_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("doccollab").join("session.json"))
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    pub fn rest_url(&self, table: &str) -> String {
        self.app.rest_url(table)
    }

    pub fn auth_url(&self, path: &str) -> String {
        self.app.auth_url(path)
    }

    pub fn anon_key(&self) -> &str {
        &self.app.anon_key
    }

    pub fn autosave_delay(&self) -> Duration {
        self.app.autosave_delay
    }

    pub fn roster_limit(&self) -> usize {
        self.app.roster_limit
    }

    pub fn suggestion_limit(&self) -> usize {
        self.app.suggestion_limit
    }

    pub fn preview_chars(&self) -> usize {
        self.app.preview_chars
    }

    pub fn password_reset_redirect(&self) -> Option<String> {
        self.app.password_reset_redirect()
    }
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    toml::from_str(&raw).map_err(|e| ConfigError::File {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
