//! Console Bridge CLI Configuration
//!
//! Settings live in the `[config]` table of a TOML file. Loading is layered
//! with figment: built-in defaults, then the file, then command line
//! overrides. A missing file is not an error; the defaults are used.

use std::path::Path;
use std::time::Duration;

use console_bridge_core::config::{
    DEFAULT_ENDPOINT_URL, DEFAULT_GROUP_ID, DEFAULT_GROUP_NAME, DEFAULT_NICKNAME,
    DEFAULT_PLATFORM, DEFAULT_USER_ID,
};
use console_bridge_core::{ConnectPolicy, EndpointConfig, GroupContext, Identity, SessionConfig};
use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};
use url::Url;

pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 10;
pub const DEFAULT_CONNECT_INTERVAL_MS: u64 = 1000;

// ----------------------------------------------------------------------------
// Configuration Types
// ----------------------------------------------------------------------------

/// Contents of the configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub config: BridgeSettings,
}

/// The `[config]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeSettings {
    #[serde(rename = "MAIMCORE_URL")]
    pub url: String,

    #[serde(
        rename = "MAIMCORE_TOKEN",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub token: Option<String>,

    #[serde(rename = "PLATFORM_NAME")]
    pub platform: String,

    #[serde(rename = "CONSOLE_USER_ID")]
    pub user_id: String,

    #[serde(rename = "CONSOLE_NICKNAME")]
    pub nickname: String,

    /// Empty disables the group context
    #[serde(rename = "CONSOLE_GROUP_ID", deserialize_with = "string_or_integer")]
    pub group_id: String,

    #[serde(rename = "CONSOLE_GROUP_NAME")]
    pub group_name: String,

    #[serde(rename = "CONNECT_ATTEMPTS")]
    pub connect_attempts: u32,

    #[serde(rename = "CONNECT_INTERVAL_MS")]
    pub connect_interval_ms: u64,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT_URL.to_string(),
            token: None,
            platform: DEFAULT_PLATFORM.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
            nickname: DEFAULT_NICKNAME.to_string(),
            group_id: DEFAULT_GROUP_ID.to_string(),
            group_name: DEFAULT_GROUP_NAME.to_string(),
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            connect_interval_ms: DEFAULT_CONNECT_INTERVAL_MS,
        }
    }
}

/// Values given on the command line, applied over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub no_group: bool,
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Load `path` over the defaults, then apply `overrides`
    pub fn load_with_overrides(path: &Path, overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if path.is_file() {
            info!("Loading configuration from {}", path.display());
            figment = figment.merge(Toml::file(path));
        } else {
            warn!(
                "Configuration file {} not found, using defaults",
                path.display()
            );
        }

        if let Some(url) = &overrides.url {
            figment = figment.merge(("config.MAIMCORE_URL", url.as_str()));
        }
        if overrides.no_group {
            figment = figment.merge(("config.CONSOLE_GROUP_ID", ""));
        }

        let config: AppConfig = figment.extract().map_err(|e| {
            ConfigError::Loading(format!("Failed to load {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<(), ConfigError> {
        let settings = &self.config;

        let url = Url::parse(&settings.url).map_err(|e| {
            ConfigError::Validation(format!("MAIMCORE_URL {:?} is not a URL: {}", settings.url, e))
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ConfigError::Validation(format!(
                "MAIMCORE_URL must use ws or wss, got {}",
                url.scheme()
            )));
        }

        if settings.platform.trim().is_empty() {
            return Err(ConfigError::Validation(
                "PLATFORM_NAME must not be empty".to_string(),
            ));
        }
        if settings.user_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "CONSOLE_USER_ID must not be empty".to_string(),
            ));
        }
        if settings.connect_attempts == 0 {
            return Err(ConfigError::Validation(
                "CONNECT_ATTEMPTS must be greater than 0".to_string(),
            ));
        }
        if settings.connect_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "CONNECT_INTERVAL_MS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Session configuration described by these settings
    pub fn session_config(&self) -> SessionConfig {
        let settings = &self.config;

        let mut endpoint = EndpointConfig::new(&settings.url, &settings.platform);
        endpoint.token = settings.token.clone().filter(|token| !token.is_empty());

        let group_id = settings.group_id.trim();
        let group = (!group_id.is_empty())
            .then(|| GroupContext::new(&settings.platform, group_id, &settings.group_name));

        SessionConfig {
            sender: Identity::new(&settings.platform, &settings.user_id, &settings.nickname),
            endpoint,
            group,
            connect: ConnectPolicy::new(
                settings.connect_attempts,
                Duration::from_millis(settings.connect_interval_ms),
            ),
        }
    }
}

/// Group ids may be written as `"1"` or `1`
fn string_or_integer<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Integer(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Integer(number) => number.to_string(),
    })
}

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {0}")]
    Loading(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
