//! Configuration for the WebSocket transport

use std::time::Duration;

use console_bridge_core::EndpointConfig;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use url::Url;

use crate::error::WsTransportError;

/// Handshake header carrying the routing key
pub const PLATFORM_HEADER: &str = "platform";

/// Tunables for [`WebSocketTransport`](crate::WebSocketTransport)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsConfig {
    /// Upper bound on the opening handshake
    pub handshake_timeout: Duration,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

/// Parse an endpoint URL and require a WebSocket scheme
pub fn validate_url(raw: &str) -> Result<Url, WsTransportError> {
    let url = Url::parse(raw).map_err(|e| WsTransportError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(WsTransportError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("scheme must be ws or wss, got {}", other),
        }),
    }
}

/// Build the opening handshake request for an endpoint
///
/// The platform is announced in the `platform` header; a configured token is
/// sent as a bearer `Authorization` header.
pub fn handshake_request(endpoint: &EndpointConfig) -> Result<Request, WsTransportError> {
    let url = validate_url(&endpoint.url)?;
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|source| WsTransportError::Handshake {
            url: endpoint.url.clone(),
            source,
        })?;

    let platform = HeaderValue::from_str(&endpoint.platform).map_err(|_| {
        WsTransportError::InvalidHeader {
            name: PLATFORM_HEADER,
        }
    })?;
    request.headers_mut().insert(PLATFORM_HEADER, platform);

    if let Some(token) = endpoint.token.as_deref().filter(|t| !t.is_empty()) {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| WsTransportError::InvalidHeader {
                name: "authorization",
            })?;
        auth.set_sensitive(true);
        request.headers_mut().insert("authorization", auth);
    }

    Ok(request)
}
