//! Application wiring
//!
//! Builds a session from the loaded configuration and runs it against the
//! WebSocket transport, stopping gracefully on Ctrl+C.

use std::sync::Arc;

use console_bridge_core::{SessionConfig, Transport};
use console_bridge_runtime::{SessionBuilder, SessionSummary};
use console_bridge_ws::WebSocketTransport;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::Result;

pub struct BridgeApp {
    session: SessionConfig,
}

impl BridgeApp {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            session: config.session_config(),
        }
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session
    }

    /// Session builder for `transport` with Ctrl+C as the interrupt
    pub fn session_builder(&self, transport: Arc<dyn Transport>) -> SessionBuilder {
        SessionBuilder::new(self.session.clone())
            .with_transport(transport)
            .with_interrupt(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Ctrl+C handler unavailable: {}", e);
                    std::future::pending::<()>().await;
                }
            })
    }

    /// Log where messages will go
    pub fn announce(&self) {
        let session = &self.session;
        info!(
            "Broker {} as platform {}",
            session.endpoint.url, session.endpoint.platform
        );
        info!(
            "Sending as {} ({})",
            session.sender.nickname, session.sender.user_id
        );
        match &session.group {
            Some(group) => info!("Group {} ({})", group.group_name, group.group_id),
            None => info!("Direct messages, no group"),
        }
        if session.endpoint.token.is_some() {
            debug!("Authorization token configured");
        }
    }

    /// Run a session over WebSocket until the operator leaves
    pub async fn run(self) -> Result<SessionSummary> {
        self.announce();
        let transport: Arc<dyn Transport> = Arc::new(WebSocketTransport::new());
        let controller = self.session_builder(transport).build()?;
        Ok(controller.run().await?)
    }
}
