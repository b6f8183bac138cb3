//! End-to-end wiring: configuration file to outbound envelopes
//!
//! The WebSocket transport is swapped for the in-memory mock so sessions run
//! deterministically on a paused clock.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use console_bridge_cli::{AppConfig, BridgeApp, CliError, Overrides};
use console_bridge_core::testing::MockTransport;
use console_bridge_core::BridgeError;
use console_bridge_runtime::{RecordingConsole, ScriptedLineSource};
use serde_json::json;
use tempfile::NamedTempFile;

fn load(contents: &str, overrides: Overrides) -> AppConfig {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    AppConfig::load_with_overrides(file.path(), &overrides).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_configured_identity_reaches_the_broker() {
    let config = load(
        "[config]\nPLATFORM_NAME = \"ops_console\"\nCONSOLE_USER_ID = \"op1\"\nCONSOLE_GROUP_ID = 7\n",
        Overrides::default(),
    );
    let app = BridgeApp::new(&config);

    let transport = Arc::new(MockTransport::connected());
    let console = Arc::new(RecordingConsole::new());
    let summary = app
        .session_builder(transport.clone())
        .with_console(console.clone())
        .with_line_source(ScriptedLineSource::lines(["hello", "   ", "QUIT", "never sent"]))
        .with_interrupt(std::future::pending())
        .build()
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.sent, 1);
    assert_eq!(transport.sent_texts(), vec!["hello".to_string()]);
    assert_eq!(transport.endpoint().unwrap().platform, "ops_console");

    let envelope = &transport.sent()[0];
    assert_eq!(envelope.info.platform, "ops_console");
    assert_eq!(envelope.info.sender.user_id, "op1");
    assert_eq!(envelope.info.group.as_ref().unwrap().group_id, "7");
    assert_eq!(transport.disconnects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_group_override_sends_direct_messages() {
    let config = load(
        "[config]\nCONSOLE_GROUP_ID = \"9\"\n",
        Overrides {
            url: None,
            no_group: true,
        },
    );
    let app = BridgeApp::new(&config);
    assert!(app.session_config().group.is_none());

    let transport = Arc::new(MockTransport::connected());
    app.session_builder(transport.clone())
        .with_console(Arc::new(RecordingConsole::new()))
        .with_line_source(ScriptedLineSource::lines(["direct"]))
        .with_interrupt(std::future::pending())
        .build()
        .unwrap()
        .run()
        .await
        .unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].is_group());
}

#[tokio::test(start_paused = true)]
async fn test_replies_are_printed() {
    let app = BridgeApp::new(&AppConfig::default());
    let transport = Arc::new(MockTransport::connected());
    let console = Arc::new(RecordingConsole::new());
    let controller = app
        .session_builder(transport.clone())
        .with_console(console.clone())
        .with_line_source(ScriptedLineSource::lines(Vec::<String>::new()).then_wait())
        .with_interrupt(tokio::time::sleep(Duration::from_secs(30)))
        .build()
        .unwrap();

    let session = tokio::spawn(controller.run());
    tokio::time::sleep(Duration::from_secs(2)).await;
    transport
        .inject(json!({
            "message_info": {
                "platform": "console_adapter",
                "message_id": "r1",
                "time": 1.0,
                "user_info": {"platform": "console_adapter", "user_id": "bot", "user_nickname": "Bot"}
            },
            "message_segment": {"type": "text", "data": "hi there"}
        }))
        .await
        .unwrap();

    let summary = session.await.unwrap().unwrap();
    assert_eq!(summary.received, 1);
    assert!(console.lines().iter().any(|line| line.contains("hi there")));
}

#[tokio::test(start_paused = true)]
async fn test_connect_budget_comes_from_config() {
    let config = load(
        "[config]\nCONNECT_ATTEMPTS = 2\nCONNECT_INTERVAL_MS = 100\n",
        Overrides::default(),
    );
    let transport = Arc::new(MockTransport::unreachable());
    let result = BridgeApp::new(&config)
        .session_builder(transport.clone())
        .with_console(Arc::new(RecordingConsole::new()))
        .with_line_source(ScriptedLineSource::lines(["unused"]))
        .with_interrupt(std::future::pending())
        .build()
        .unwrap()
        .run()
        .await;

    let err = CliError::from(result.unwrap_err());
    assert!(matches!(
        err,
        CliError::Bridge(BridgeError::ConnectionTimeout { attempts: 2, .. })
    ));
    assert_eq!(transport.probes(), 2);
    assert!(transport.sent().is_empty());
}
