//! Global configuration parsing, validation, and credential loading.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Keychain service name under which provider credentials are stored.
pub const KEYRING_SERVICE: &str = "template-broadcast";

/// Key of the template-image entry used when a template name is unmapped.
pub const DEFAULT_IMAGE_KEY: &str = "default";

/// Messaging provider (WhatsApp Cloud API) connectivity settings.
///
/// The access token is loaded at runtime via OS keychain or environment
/// variable, never from the TOML config file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ProviderConfig {
    /// Phone number node used for sending and health checks.
    pub phone_number_id: String,
    /// Business account node that owns the message templates.
    pub waba_id: String,
    /// Graph API version path segment.
    #[serde(default = "default_graph_version")]
    pub graph_version: String,
    /// Graph API base URL without trailing slash.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Timeout for the template catalog fetch.
    #[serde(default = "default_template_timeout")]
    pub template_timeout_seconds: u64,
    /// Timeout for the phone number health check.
    #[serde(default = "default_health_timeout")]
    pub health_timeout_seconds: u64,
    /// Timeout for a single message send; 0 means no timeout.
    #[serde(default)]
    pub send_timeout_seconds: u64,
    /// Page size requested from the template listing endpoint.
    #[serde(default = "default_template_page_limit")]
    pub template_page_limit: u32,
    /// Bearer token (populated at runtime).
    #[serde(skip)]
    pub access_token: String,
}

impl ProviderConfig {
    /// Versioned API root, e.g. `https://graph.facebook.com/v24.0`.
    #[must_use]
    pub fn api_root(&self) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            self.graph_version
        )
    }

    /// Catalog fetch timeout as a [`Duration`].
    #[must_use]
    pub fn template_timeout(&self) -> Duration {
        Duration::from_secs(self.template_timeout_seconds)
    }

    /// Health check timeout as a [`Duration`].
    #[must_use]
    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_seconds)
    }

    /// Per-send timeout, `None` when unbounded.
    #[must_use]
    pub fn send_timeout(&self) -> Option<Duration> {
        (self.send_timeout_seconds > 0).then(|| Duration::from_secs(self.send_timeout_seconds))
    }
}

fn default_graph_version() -> String {
    "v24.0".into()
}

fn default_api_base_url() -> String {
    "https://graph.facebook.com".into()
}

fn default_template_timeout() -> u64 {
    10
}

fn default_health_timeout() -> u64 {
    5
}

fn default_template_page_limit() -> u32 {
    100
}

/// Broadcast pacing and catalog caching.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct BroadcastConfig {
    /// Pause after every send attempt, in milliseconds.
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,
    /// How long a successfully fetched template catalog stays fresh.
    #[serde(default = "default_catalog_ttl")]
    pub catalog_ttl_seconds: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            send_interval_ms: default_send_interval_ms(),
            catalog_ttl_seconds: default_catalog_ttl(),
        }
    }
}

impl BroadcastConfig {
    /// Inter-send pause as a [`Duration`].
    #[must_use]
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    /// Catalog freshness window as a [`Duration`].
    #[must_use]
    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl_seconds)
    }
}

fn default_send_interval_ms() -> u64 {
    2500
}

fn default_catalog_ttl() -> u64 {
    300
}

fn default_db_path() -> PathBuf {
    PathBuf::from("broadcast.db")
}

fn default_http_port() -> u16 {
    8000
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// `SQLite` database file holding groups and contacts.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// HTTP port for the operator control surface.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Provider connectivity settings.
    pub provider: ProviderConfig,
    /// Pacing and cache settings.
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    /// Header image links keyed by template name; must contain `default`.
    #[serde(default)]
    pub template_images: HashMap<String, String>,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the provider access token from OS keychain with env-var fallback.
    ///
    /// Tries the `template-broadcast` keyring service first, then falls
    /// back to the `WHATSAPP_ACCESS_TOKEN` environment variable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither source provides the token.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.provider.access_token =
            load_credential("whatsapp_access_token", "WHATSAPP_ACCESS_TOKEN").await?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.provider.phone_number_id.trim().is_empty() {
            return Err(AppError::Config(
                "provider.phone_number_id must not be empty".into(),
            ));
        }

        if self.provider.waba_id.trim().is_empty() {
            return Err(AppError::Config("provider.waba_id must not be empty".into()));
        }

        if self.provider.template_timeout_seconds == 0 {
            return Err(AppError::Config(
                "provider.template_timeout_seconds must be greater than zero".into(),
            ));
        }

        if !self.template_images.contains_key(DEFAULT_IMAGE_KEY) {
            return Err(AppError::Config(format!(
                "template_images must contain a '{DEFAULT_IMAGE_KEY}' entry"
            )));
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    env::var(env_key)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            AppError::Config(format!(
                "credential {keyring_key} not found in keychain service '{KEYRING_SERVICE}' or {env_key} env var"
            ))
        })
}
