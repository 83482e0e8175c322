//! Application configuration module
//!
//! Provides the validated backend configuration shared by every client component.

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Quiet period after the last edit before autosave fires
pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(2000);
/// How many users are fetched for the mention roster
pub const DEFAULT_ROSTER_LIMIT: usize = 50;
/// How many mention suggestions the popup shows
pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;
/// Length of the plain-text preview on document cards
pub const DEFAULT_PREVIEW_CHARS: usize = 150;

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Backend base URL, e.g. `https://project.supabase.co`
    pub backend_url: Url,
    /// Public anon key sent as `apikey` on every request
    pub anon_key: String,
    /// Public site URL used to build password reset links
    pub site_url: Option<Url>,
    pub autosave_delay: Duration,
    pub roster_limit: usize,
    pub suggestion_limit: usize,
    pub preview_chars: usize,
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// URL of a PostgREST table endpoint
    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base(), table)
    }

    /// URL of a GoTrue endpoint
    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base(), path.trim_start_matches('/'))
    }

    /// Where password reset emails should send the user back to
    pub fn password_reset_redirect(&self) -> Option<String> {
        self.site_url
            .as_ref()
            .map(|site| format!("{}/reset-password", site.as_str().trim_end_matches('/')))
    }

    fn base(&self) -> &str {
        self.backend_url.as_str().trim_end_matches('/')
    }
}

/// Builder for AppConfig
#[derive(Debug, Default, Clone)]
pub struct AppConfigBuilder {
    backend_url: Option<String>,
    anon_key: Option<String>,
    site_url: Option<String>,
    autosave_delay: Option<Duration>,
    roster_limit: Option<usize>,
    suggestion_limit: Option<usize>,
    preview_chars: Option<usize>,
}

impl AppConfigBuilder {
    /// Set the backend URL
    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    /// Set the anon key
    pub fn anon_key(mut self, key: impl Into<String>) -> Self {
        self.anon_key = Some(key.into());
        self
    }

    /// Set the public site URL
    pub fn site_url(mut self, url: impl Into<String>) -> Self {
        self.site_url = Some(url.into());
        self
    }

    pub fn autosave_delay(mut self, delay: Duration) -> Self {
        self.autosave_delay = Some(delay);
        self
    }

    pub fn roster_limit(mut self, limit: usize) -> Self {
        self.roster_limit = Some(limit);
        self
    }

    pub fn suggestion_limit(mut self, limit: usize) -> Self {
        self.suggestion_limit = Some(limit);
        self
    }

    pub fn preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = Some(chars);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let raw_url = self.backend_url.ok_or(ConfigError::MissingValue("backend_url"))?;
        let backend_url = parse_http_url(&raw_url)?;

        let anon_key = self
            .anon_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingValue("anon_key"))?;

        let site_url = self.site_url.as_deref().map(parse_http_url).transpose()?;

        let autosave_delay = self.autosave_delay.unwrap_or(DEFAULT_AUTOSAVE_DELAY);
        if autosave_delay.is_zero() {
            return Err(ConfigError::OutOfRange("autosave_delay"));
        }

        let suggestion_limit = self.suggestion_limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT);
        if suggestion_limit == 0 {
            return Err(ConfigError::OutOfRange("suggestion_limit"));
        }

        Ok(AppConfig {
            backend_url,
            anon_key,
            site_url,
            autosave_delay,
            roster_limit: self.roster_limit.unwrap_or(DEFAULT_ROSTER_LIMIT),
            suggestion_limit,
            preview_chars: self.preview_chars.unwrap_or(DEFAULT_PREVIEW_CHARS),
        })
    }
}

fn parse_http_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidUrl(format!("{raw}: unsupported scheme {other}"))),
    }
}

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("value out of range: {0}")]
    OutOfRange(&'static str),
    #[error("could not read config file {path}: {message}")]
    File { path: String, message: String },
}
