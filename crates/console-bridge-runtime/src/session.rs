//! Session Controller
//!
//! Owns one bridge session from start to finish:
//!
//! ```text
//! STOPPED -> CONNECTING -> RUNNING -> STOPPING -> STOPPED
//!                 |                      ^
//!                 +---- timeout ---------+
//! ```
//!
//! The transport's background loop runs as its own task. Once connectivity is
//! confirmed the inbound handler is spawned on the inbound channel and the
//! console input loop runs on the controller's task until a stop condition.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use console_bridge_core::{
    create_inbound_channel, BridgeError, ConnectPolicy, OutboundBuilder, SessionConfig, Transport,
    TransportError,
};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::console::Console;
use crate::inbound::InboundHandler;
use crate::input::{ConsoleInputLoop, InputOutcome, LineSource};
use crate::state::{RunFlag, SessionPhase, SessionStats, SessionSummary};

/// Future that resolves when the operator asks the session to stop
pub type InterruptSignal = Pin<Box<dyn Future<Output = ()> + Send>>;

enum Connection {
    Established,
    TimedOut { waited: Duration },
    Interrupted,
}

/// Drives a single session; consumed by [`SessionController::run`]
pub struct SessionController {
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    console: Arc<dyn Console>,
    source: Box<dyn LineSource>,
    interrupt: InterruptSignal,
    inbound_buffer: usize,
    shutdown_grace: Duration,
    running: RunFlag,
    phase: watch::Sender<SessionPhase>,
    stats: Arc<SessionStats>,
}

impl SessionController {
    pub(crate) fn new(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        console: Arc<dyn Console>,
        source: Box<dyn LineSource>,
        interrupt: InterruptSignal,
        inbound_buffer: usize,
        shutdown_grace: Duration,
    ) -> Self {
        let (phase, _) = watch::channel(SessionPhase::Stopped);
        Self {
            config,
            transport,
            console,
            source,
            interrupt,
            inbound_buffer,
            shutdown_grace,
            running: RunFlag::new(),
            phase,
            stats: Arc::new(SessionStats::default()),
        }
    }

    /// Observe lifecycle phase changes
    pub fn subscribe_phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    /// Handle to the session's running flag; clearing it stops the input loop
    /// after its next wake-up
    pub fn running_flag(&self) -> RunFlag {
        self.running.clone()
    }

    pub fn stats(&self) -> Arc<SessionStats> {
        Arc::clone(&self.stats)
    }

    fn enter(&self, phase: SessionPhase) {
        set_phase(&self.phase, phase);
    }

    /// Run the session to completion
    ///
    /// Returns the session summary after an orderly stop. Fails with
    /// [`BridgeError::ConnectionTimeout`] when the transport never reports
    /// connectivity, in which case the input loop is never started.
    pub async fn run(mut self) -> Result<SessionSummary, BridgeError> {
        let endpoint = self.config.endpoint.clone();
        self.enter(SessionPhase::Connecting);
        info!("Connecting to {}", endpoint.url);

        if let Err(e) = self.transport.connect(&endpoint).await {
            self.enter(SessionPhase::Stopped);
            return Err(e.into());
        }
        let (inbound_tx, inbound_rx) = create_inbound_channel(self.inbound_buffer);
        if let Err(e) = self.transport.register_inbound(inbound_tx) {
            self.enter(SessionPhase::Stopped);
            return Err(e.into());
        }

        let runner = Arc::clone(&self.transport);
        let transport_task = tokio::spawn(async move { runner.run().await });

        let connection = tokio::select! {
            connection = wait_for_connection(
                self.transport.as_ref(),
                &endpoint.platform,
                self.config.connect,
            ) => connection,
            _ = &mut self.interrupt => Connection::Interrupted,
        };

        match connection {
            Connection::Established => {
                info!("Connected to {}", endpoint.url);
            }
            Connection::TimedOut { waited } => {
                error!(
                    "Could not connect to {}; check the URL and that the broker is running",
                    endpoint.url
                );
                self.running.stop();
                self.enter(SessionPhase::Stopping);
                stop_transport(
                    self.transport.as_ref(),
                    transport_task,
                    self.shutdown_grace,
                )
                .await;
                self.enter(SessionPhase::Stopped);
                return Err(BridgeError::ConnectionTimeout {
                    endpoint: endpoint.url,
                    attempts: self.config.connect.attempts,
                    waited,
                });
            }
            Connection::Interrupted => {
                info!("Interrupted while connecting");
                self.running.stop();
                self.enter(SessionPhase::Stopping);
                stop_transport(
                    self.transport.as_ref(),
                    transport_task,
                    self.shutdown_grace,
                )
                .await;
                self.enter(SessionPhase::Stopped);
                return Ok(self.stats.summary());
            }
        }

        self.enter(SessionPhase::Running);
        let handler = InboundHandler::new(Arc::clone(&self.console), Arc::clone(&self.stats));
        let (drain_tx, drain_rx) = oneshot::channel::<()>();
        let inbound_task = tokio::spawn(handler.run_until(inbound_rx, async move {
            let _ = drain_rx.await;
        }));

        let SessionController {
            config,
            transport,
            console,
            source,
            mut interrupt,
            running,
            stats,
            ..
        } = self;

        let builder = OutboundBuilder::new(config.sender.clone(), config.group.clone());
        let input = ConsoleInputLoop::new(
            Arc::clone(&transport),
            source,
            Arc::clone(&console),
            builder,
            running.clone(),
            Arc::clone(&stats),
        );

        console.show_prompt();
        let input_result = tokio::select! {
            result = input.run() => result,
            _ = &mut interrupt => {
                console.clear_line();
                info!("Interrupt received");
                running.stop();
                Ok(InputOutcome::Interrupted)
            }
        };
        running.stop();
        debug!("Input loop finished: {:?}", input_result);

        set_phase(&self.phase, SessionPhase::Stopping);
        info!("Shutting down");
        stop_transport(transport.as_ref(), transport_task, self.shutdown_grace).await;
        let _ = drain_tx.send(());
        finish_inbound(inbound_task, self.shutdown_grace).await;
        set_phase(&self.phase, SessionPhase::Stopped);

        let summary = stats.summary();
        info!("Session closed: {}", summary);
        input_result.map(|_| summary)
    }
}

fn set_phase(phase: &watch::Sender<SessionPhase>, next: SessionPhase) {
    debug!("Session phase -> {}", next);
    phase.send_replace(next);
}

/// Poll connectivity with a fixed interval and attempt budget
///
/// Every failed probe is followed by one interval, so giving up takes the
/// full [`ConnectPolicy::budget`].
async fn wait_for_connection(
    transport: &dyn Transport,
    platform: &str,
    policy: ConnectPolicy,
) -> Connection {
    let started = Instant::now();
    for attempt in 1..=policy.attempts {
        if transport.is_connected(platform) {
            debug!("Connected after {} probe(s)", attempt);
            return Connection::Established;
        }
        debug!("Not connected yet ({}/{})", attempt, policy.attempts);
        sleep(policy.interval).await;
    }
    Connection::TimedOut {
        waited: started.elapsed(),
    }
}

/// Let the inbound handler drain what is already queued, then cancel it
async fn finish_inbound(mut task: JoinHandle<()>, grace: Duration) {
    let joined = match timeout(grace, &mut task).await {
        Ok(joined) => joined,
        Err(_) => {
            debug!("Inbound handler still draining after {:?}; cancelling", grace);
            task.abort();
            task.await
        }
    };
    if let Err(e) = joined {
        if !e.is_cancelled() {
            warn!("Inbound task failed: {}", e);
        }
    }
}

/// Disconnect, give the background task a grace period, then cancel it
async fn stop_transport(
    transport: &dyn Transport,
    mut task: JoinHandle<Result<(), TransportError>>,
    grace: Duration,
) {
    if let Err(e) = transport.disconnect().await {
        warn!("Disconnect failed: {}", e);
    }

    let joined = match timeout(grace, &mut task).await {
        Ok(joined) => joined,
        Err(_) => {
            debug!("Transport task still active after {:?}; cancelling", grace);
            task.abort();
            task.await
        }
    };

    match joined {
        Ok(Ok(())) => debug!("Transport task finished"),
        Ok(Err(e)) => warn!("Transport task ended with error: {}", e),
        Err(e) if e.is_cancelled() => debug!("Transport task cancelled"),
        Err(e) => warn!("Transport task failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SessionBuilder;
    use crate::console::RecordingConsole;
    use crate::input::{InputEvent, ScriptedLineSource};
    use console_bridge_core::testing::MockTransport;
    use console_bridge_core::{EndpointConfig, Identity};
    use serde_json::json;
    use std::io;
    use std::sync::atomic::Ordering;

    fn config() -> SessionConfig {
        SessionConfig::direct(EndpointConfig::default())
    }

    fn builder(
        transport: &Arc<MockTransport>,
        console: &Arc<RecordingConsole>,
        source: ScriptedLineSource,
    ) -> SessionBuilder {
        SessionBuilder::new(config())
            .with_transport(transport.clone())
            .with_console(console.clone())
            .with_line_source(source)
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_timeout_never_starts_input() {
        let transport = Arc::new(MockTransport::unreachable());
        let console = Arc::new(RecordingConsole::new());
        let source = ScriptedLineSource::lines(["hello"]);
        let reads = source.read_counter();

        let controller = builder(&transport, &console, source).build().unwrap();
        let phase = controller.subscribe_phase();
        let started = Instant::now();
        let err = controller.run().await.unwrap_err();

        match err {
            BridgeError::ConnectionTimeout {
                attempts, waited, ..
            } => {
                assert_eq!(attempts, 10);
                assert_eq!(waited, Duration::from_secs(10));
                assert_eq!(waited, config().connect.budget());
            }
            other => panic!("expected connection timeout, got {:?}", other),
        }
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert!(started.elapsed() < Duration::from_secs(11));
        assert_eq!(transport.probes(), 10);
        assert_eq!(reads.load(Ordering::SeqCst), 0);
        assert_eq!(console.prompts(), 0);
        assert_eq!(transport.disconnects(), 1);
        assert_eq!(*phase.borrow(), SessionPhase::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_stops_as_soon_as_connected() {
        let transport = Arc::new(MockTransport::connecting_after(3));
        let console = Arc::new(RecordingConsole::new());
        let source = ScriptedLineSource::lines(["hello", "exit"]);

        let started = Instant::now();
        let summary = builder(&transport, &console, source)
            .build()
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(transport.probes(), 3);
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(summary.sent, 1);

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].info.sender.user_id, "console_user");
        assert!(sent[0].info.group.is_none());
        assert_eq!(transport.sent_texts(), vec!["hello"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_prompts_and_shuts_down_transport() {
        let transport = Arc::new(MockTransport::connected());
        let console = Arc::new(RecordingConsole::new());
        let source = ScriptedLineSource::lines(["   ", "quit"]);

        let summary = builder(&transport, &console, source)
            .build()
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(summary, SessionSummary::default());
        // Initial prompt plus one re-issue for the blank line
        assert_eq!(console.prompts(), 2);
        assert_eq!(transport.runs(), 1);
        assert_eq!(transport.disconnects(), 1);
        assert!(transport.has_inbound());
        assert_eq!(transport.endpoint(), Some(EndpointConfig::default()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_group_context_is_attached_when_configured() {
        let transport = Arc::new(MockTransport::connected());
        let console = Arc::new(RecordingConsole::new());
        let source = ScriptedLineSource::lines(["hi group"]);

        SessionBuilder::new(SessionConfig::default())
            .with_transport(transport.clone())
            .with_console(console.clone())
            .with_line_source(source)
            .build()
            .unwrap()
            .run()
            .await
            .unwrap();

        let sent = transport.sent();
        let group = sent[0].info.group.as_ref().unwrap();
        assert_eq!(group.group_id, "1");
        assert_eq!(group.group_name, "ConsoleGroup");
    }

    #[tokio::test(start_paused = true)]
    async fn test_inbound_rendered_while_waiting_for_input() {
        let transport = Arc::new(MockTransport::connected());
        let console = Arc::new(RecordingConsole::new());
        let source = ScriptedLineSource::lines(Vec::<String>::new()).then_wait();
        let (trigger, fired) = oneshot::channel::<()>();

        let controller = builder(&transport, &console, source)
            .with_interrupt(async move {
                let _ = fired.await;
            })
            .build()
            .unwrap();
        let mut phase = controller.subscribe_phase();
        let session = tokio::spawn(controller.run());

        while *phase.borrow_and_update() != SessionPhase::Running {
            phase.changed().await.unwrap();
        }

        transport
            .inject(json!({
                "message_info": {
                    "platform": "console_adapter",
                    "message_id": 7,
                    "time": 1_700_000_000.0,
                    "user_info": {"platform": "console_adapter", "user_id": "bot", "user_nickname": "Bot"}
                },
                "message_segment": {"type": "seglist", "data": [{"type": "text", "data": "hi there"}]}
            }))
            .await
            .unwrap();
        transport.inject(json!(42)).await.unwrap();
        sleep(Duration::from_millis(10)).await;

        trigger.send(()).unwrap();
        let summary = session.await.unwrap().unwrap();

        assert_eq!(console.lines(), vec!["  [text]: hi there"]);
        assert_eq!(summary.received, 1);
        assert_eq!(summary.decode_failures, 1);
        assert_eq!(*phase.borrow(), SessionPhase::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_while_connecting_is_graceful() {
        let transport = Arc::new(MockTransport::unreachable());
        let console = Arc::new(RecordingConsole::new());
        let source = ScriptedLineSource::lines(["never read"]);
        let reads = source.read_counter();

        let summary = builder(&transport, &console, source)
            .with_interrupt(sleep(Duration::from_millis(2500)))
            .build()
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(summary, SessionSummary::default());
        assert_eq!(transport.probes(), 3);
        assert_eq!(reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_failure_is_fatal_after_orderly_shutdown() {
        let transport = Arc::new(MockTransport::connected());
        let console = Arc::new(RecordingConsole::new());
        let source = ScriptedLineSource::events([InputEvent::Failed(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "console closed",
        ))]);

        let err = builder(&transport, &console, source)
            .build()
            .unwrap()
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Input(_)));
        assert!(err.is_fatal());
        assert_eq!(transport.disconnects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failures_are_counted_not_fatal() {
        let transport = Arc::new(MockTransport::connected());
        transport.fail_sends(true);
        let console = Arc::new(RecordingConsole::new());
        let source = ScriptedLineSource::lines(["one", "two"]);

        let summary = builder(&transport, &console, source)
            .build()
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(summary.send_failures, 2);
        assert_eq!(summary.sent, 0);
        // Initial prompt plus one per attempted send
        assert_eq!(console.prompts(), 3);
    }

    fn reply(text: &str) -> serde_json::Value {
        json!({
            "message_info": {
                "platform": "console_adapter",
                "message_id": text,
                "time": 1_700_000_000.0,
                "user_info": {"platform": "console_adapter", "user_id": "bot", "user_nickname": "Bot"}
            },
            "message_segment": {"type": "text", "data": text}
        })
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test(start_paused = true)]
    async fn test_session_runs_on_a_spawned_task() {
        let transport = Arc::new(MockTransport::connected());
        let console = Arc::new(RecordingConsole::new());
        let controller = builder(&transport, &console, ScriptedLineSource::lines(["hi", "exit"]))
            .build()
            .unwrap();

        let run = controller.run();
        assert_send(&run);
        let summary = tokio::spawn(run).await.unwrap().unwrap();

        assert_eq!(summary.sent, 1);
        assert_eq!(transport.sent_texts(), vec!["hi"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_replies_are_drained_on_shutdown() {
        let transport = Arc::new(MockTransport::connected());
        let console = Arc::new(RecordingConsole::new());
        let source = ScriptedLineSource::lines(Vec::<String>::new()).then_wait();
        let (trigger, fired) = oneshot::channel::<()>();

        let controller = builder(&transport, &console, source)
            .with_interrupt(async move {
                let _ = fired.await;
            })
            .build()
            .unwrap();
        let mut phase = controller.subscribe_phase();
        let session = tokio::spawn(controller.run());

        while *phase.borrow_and_update() != SessionPhase::Running {
            phase.changed().await.unwrap();
        }

        for text in ["one", "two", "three", "four", "five"] {
            transport.inject(reply(text)).await.unwrap();
        }
        trigger.send(()).unwrap();
        let summary = session.await.unwrap().unwrap();

        assert_eq!(summary.received, 5);
        assert_eq!(
            console.lines(),
            vec![
                "  [text]: one",
                "  [text]: two",
                "  [text]: three",
                "  [text]: four",
                "  [text]: five"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_identity_is_used() {
        let transport = Arc::new(MockTransport::connected());
        let console = Arc::new(RecordingConsole::new());
        let mut config = config();
        config.sender = Identity::new("console_adapter", "operator", "Op");

        SessionBuilder::new(config)
            .with_transport(transport.clone())
            .with_console(console.clone())
            .with_line_source(ScriptedLineSource::lines(["x"]))
            .build()
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(transport.sent()[0].info.sender.nickname, "Op");
    }
}
