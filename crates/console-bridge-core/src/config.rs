//! Session Configuration Types
//!
//! Typed, already-validated configuration consumed by the transport and the
//! session controller. File loading and CLI overrides live in the binary; this
//! module only holds the values and their defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::BridgeError;
use crate::types::{GroupContext, Identity};

pub const DEFAULT_ENDPOINT_URL: &str = "ws://127.0.0.1:8000/ws";
pub const DEFAULT_PLATFORM: &str = "console_adapter";
pub const DEFAULT_USER_ID: &str = "console_user";
pub const DEFAULT_NICKNAME: &str = "ConsoleUser";
pub const DEFAULT_GROUP_ID: &str = "1";
pub const DEFAULT_GROUP_NAME: &str = "ConsoleGroup";

// ----------------------------------------------------------------------------
// Endpoint Configuration
// ----------------------------------------------------------------------------

/// Where and as which platform the transport connects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    /// Bearer token sent on the handshake when present
    pub token: Option<String>,
    /// Routing key announced to the broker
    pub platform: String,
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            platform: platform.into(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT_URL, DEFAULT_PLATFORM)
    }
}

// ----------------------------------------------------------------------------
// Connection Polling
// ----------------------------------------------------------------------------

/// Bounded wait for the transport to report connectivity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl ConnectPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Upper bound on the time spent polling
    pub fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.attempts)
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.attempts == 0 {
            return Err(BridgeError::config_error(
                "connection attempts must be greater than zero",
            ));
        }
        if self.interval.is_zero() {
            return Err(BridgeError::config_error(
                "connection poll interval must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(1))
    }
}

// ----------------------------------------------------------------------------
// Session Configuration
// ----------------------------------------------------------------------------

/// Everything a session needs to run
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub endpoint: EndpointConfig,
    pub sender: Identity,
    pub group: Option<GroupContext>,
    pub connect: ConnectPolicy,
}

impl SessionConfig {
    /// Session for `endpoint` with the default console identity and no group
    pub fn direct(endpoint: EndpointConfig) -> Self {
        let sender = Identity::new(&endpoint.platform, DEFAULT_USER_ID, DEFAULT_NICKNAME);
        Self {
            endpoint,
            sender,
            group: None,
            connect: ConnectPolicy::default(),
        }
    }

    pub fn with_group(mut self, group: Option<GroupContext>) -> Self {
        self.group = group;
        self
    }

    pub fn with_connect_policy(mut self, connect: ConnectPolicy) -> Self {
        self.connect = connect;
        self
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.endpoint.url.trim().is_empty() {
            return Err(BridgeError::config_error("endpoint url must not be empty"));
        }
        if self.endpoint.platform.trim().is_empty() {
            return Err(BridgeError::config_error("platform must not be empty"));
        }
        if self.sender.user_id.trim().is_empty() {
            return Err(BridgeError::config_error("user id must not be empty"));
        }
        self.connect.validate()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let endpoint = EndpointConfig::default();
        let group = GroupContext::new(&endpoint.platform, DEFAULT_GROUP_ID, DEFAULT_GROUP_NAME);
        Self::direct(endpoint).with_group(Some(group))
    }
}
