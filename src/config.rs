//! Store and client configuration from JSON files and environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cookies::{CookieOptions, SameSitePolicy};
use crate::session::UserFields;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid store options: {0}")]
    InvalidOptions(#[from] serde_json::Error),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// =============================================================================
// STORE OPTIONS
// =============================================================================

/// Construction options for [`crate::AuthStore`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Fields merged over `{roles: [], name: null}` to form the default user.
    pub default_user: UserFields,
    /// Attributes used for every token cookie write and removal.
    pub token_cookie: CookieOptions,
}

impl StoreOptions {
    /// Parse options from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOptions`] if the JSON does not match.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Read and parse options from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, or
    /// [`ConfigError::InvalidOptions`] if it does not parse.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_owned(), source })?;
        Self::from_json(&raw)
    }

    /// Options with the token cookie taken from the environment.
    ///
    /// - `AUTH_COOKIE_PATH`, `AUTH_COOKIE_DOMAIN`
    /// - `AUTH_COOKIE_SECURE`, `AUTH_COOKIE_HTTP_ONLY`: boolean words
    /// - `AUTH_COOKIE_SAME_SITE`: `strict`, `lax`, or `none`
    /// - `AUTH_COOKIE_EXPIRES_DAYS`: integer day count
    #[must_use]
    pub fn from_env() -> Self {
        Self { default_user: UserFields::new(), token_cookie: cookie_options_from_env() }
    }
}

fn cookie_options_from_env() -> CookieOptions {
    CookieOptions {
        path: env_string("AUTH_COOKIE_PATH"),
        domain: env_string("AUTH_COOKIE_DOMAIN"),
        secure: env_bool("AUTH_COOKIE_SECURE").unwrap_or(false),
        http_only: env_bool("AUTH_COOKIE_HTTP_ONLY").unwrap_or(false),
        same_site: env_string("AUTH_COOKIE_SAME_SITE").and_then(|raw| SameSitePolicy::parse(&raw)),
        expires_days: env_string("AUTH_COOKIE_EXPIRES_DAYS").and_then(|raw| raw.trim().parse::<i64>().ok()),
    }
}

// =============================================================================
// CLIENT CONFIG
// =============================================================================

/// Settings for [`crate::HttpClient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_owned(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Build client config from environment variables.
    ///
    /// Optional:
    /// - `AUTH_API_BASE_URL`: default `http://127.0.0.1:3000`
    /// - `AUTH_REQUEST_TIMEOUT_SECS`: default 30
    /// - `AUTH_CONNECT_TIMEOUT_SECS`: default 10
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env_string("AUTH_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        Self {
            base_url,
            request_timeout_secs: env_parse_u64("AUTH_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout_secs: env_parse_u64("AUTH_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

// =============================================================================
// ENV HELPERS
// =============================================================================

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    env_string(key).and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    env_string(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
