//! Push channel
//!
//! Maintains a long-lived, receive-only WebSocket connection to
//! `/ws/<id>`. Every frame carries the full note and is forwarded to the
//! client unfiltered. Whenever the connection ends, by error or by close,
//! exactly one reconnect is scheduled after a fixed delay, forever.

use std::future::Future;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::error::ChannelError;

/// Delay between a closed connection and the next attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshake in progress
    Connecting,
    /// Receiving snapshots
    Open,
    /// Dropped or failed; a reconnect is pending unless shut down
    Closed,
}

/// Events emitted by the channel task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Full document text pushed by the server
    Snapshot(String),
    /// Connection state changed
    StateChanged(ConnectionState),
    /// The connection ended; the next attempt starts after `delay`
    ReconnectScheduled { attempt: u64, delay: Duration },
}

/// Commands sent to the channel task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelCommand {
    /// Close the socket and stop reconnecting
    Shutdown,
}

/// Handle to control the channel task
pub struct ChannelHandle {
    /// Send commands to the channel task
    pub command_tx: mpsc::Sender<ChannelCommand>,
    /// Receive snapshots and state changes
    pub event_rx: mpsc::Receiver<ChannelEvent>,
    /// Watch connection state
    pub state_rx: watch::Receiver<ConnectionState>,
}

impl ChannelHandle {
    /// Ask the task to stop; a no-op if it already ended
    pub async fn shutdown(&self) {
        let _ = self.command_tx.send(ChannelCommand::Shutdown).await;
    }
}

/// Configuration for the channel task
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// WebSocket URL (`ws://host/ws/<id>`)
    pub url: String,
    /// Fixed delay before each reconnect attempt
    pub reconnect_delay: Duration,
}

impl ChannelConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

/// Opens the underlying socket
pub trait Connector: Send + Sync + 'static {
    type Stream: Stream<Item = Result<Message, WsError>> + Send + Unpin + 'static;

    fn connect(&self, url: &str) -> impl Future<Output = Result<Self::Stream, ChannelError>> + Send;
}

/// Connector backed by `tokio-tungstenite`
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn connect(&self, url: &str) -> Result<Self::Stream, ChannelError> {
        let (ws_stream, _response) = connect_async(url)
            .await
            .map_err(|e| ChannelError::Connect {
                url: url.to_string(),
                details: e.to_string(),
            })?;
        Ok(ws_stream)
    }
}

/// Spawn the channel task
///
/// Returns a handle to control and monitor it. The task reconnects on every
/// disconnection until shut down or until the event receiver is dropped.
pub fn spawn_channel<C: Connector>(config: ChannelConfig, connector: C) -> ChannelHandle {
    let (command_tx, command_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::channel(64);
    let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

    tokio::spawn(channel_loop(config, connector, command_rx, event_tx, state_tx));

    ChannelHandle {
        command_tx,
        event_rx,
        state_rx,
    }
}

/// How one connection ended
enum Ended {
    /// Shutdown requested or nobody is listening any more
    Stop,
    /// Socket closed or failed; reconnect
    Dropped(Option<ChannelError>),
}

/// Main loop with reconnection
async fn channel_loop<C: Connector>(
    config: ChannelConfig,
    connector: C,
    mut command_rx: mpsc::Receiver<ChannelCommand>,
    event_tx: mpsc::Sender<ChannelEvent>,
    state_tx: watch::Sender<ConnectionState>,
) {
    let mut attempt: u64 = 0;

    loop {
        attempt += 1;
        if !set_state(&state_tx, &event_tx, ConnectionState::Connecting).await {
            break;
        }

        let ended = tokio::select! {
            ended = run_connection(&config, &connector, &event_tx, &state_tx) => ended,
            cmd = command_rx.recv() => {
                match cmd {
                    Some(ChannelCommand::Shutdown) | None => Ended::Stop,
                }
            }
        };

        let _ = state_tx.send(ConnectionState::Closed);

        match ended {
            Ended::Stop => {
                debug!("Push channel stopped");
                let _ = event_tx
                    .send(ChannelEvent::StateChanged(ConnectionState::Closed))
                    .await;
                break;
            }
            Ended::Dropped(Some(e)) => warn!("Push channel failed: {}", e),
            Ended::Dropped(None) => info!("Push channel closed by server"),
        }

        // Single place where a reconnect is scheduled, whatever ended the
        // connection
        let reconnect = [
            ChannelEvent::StateChanged(ConnectionState::Closed),
            ChannelEvent::ReconnectScheduled {
                attempt,
                delay: config.reconnect_delay,
            },
        ];
        let mut listener_gone = false;
        for event in reconnect {
            if event_tx.send(event).await.is_err() {
                listener_gone = true;
                break;
            }
        }
        if listener_gone {
            break;
        }
        info!("Reconnecting to {} in {:?}", config.url, config.reconnect_delay);

        tokio::select! {
            _ = tokio::time::sleep(config.reconnect_delay) => {}
            cmd = command_rx.recv() => {
                match cmd {
                    Some(ChannelCommand::Shutdown) | None => break,
                }
            }
        }
    }
}

/// Connect and forward frames until the connection ends
async fn run_connection<C: Connector>(
    config: &ChannelConfig,
    connector: &C,
    event_tx: &mpsc::Sender<ChannelEvent>,
    state_tx: &watch::Sender<ConnectionState>,
) -> Ended {
    debug!("Connecting to {}", config.url);
    let mut stream = match connector.connect(&config.url).await {
        Ok(s) => s,
        Err(e) => return Ended::Dropped(Some(e)),
    };

    info!("Push channel established ({})", config.url);
    if !set_state(state_tx, event_tx, ConnectionState::Open).await {
        return Ended::Stop;
    }

    loop {
        let snapshot = match stream.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                Ok(text) => text,
                Err(_) => {
                    warn!("Ignoring non-UTF-8 frame");
                    continue;
                }
            },
            Some(Ok(Message::Close(_))) | None => return Ended::Dropped(None),
            Some(Err(e)) => return Ended::Dropped(Some(e.into())),
            Some(Ok(_)) => continue,
        };

        debug!("Snapshot received ({} bytes)", snapshot.len());
        if event_tx.send(ChannelEvent::Snapshot(snapshot)).await.is_err() {
            return Ended::Stop;
        }
    }
}

/// Publish a state change; false if the listener is gone
async fn set_state(
    state_tx: &watch::Sender<ConnectionState>,
    event_tx: &mpsc::Sender<ChannelEvent>,
    state: ConnectionState,
) -> bool {
    let _ = state_tx.send(state);
    event_tx
        .send(ChannelEvent::StateChanged(state))
        .await
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    type FrameSender = mpsc::UnboundedSender<Result<Message, WsError>>;
    type FrameStream = futures_util::stream::BoxStream<'static, Result<Message, WsError>>;

    /// Scripted connector: each attempt pops the next outcome
    #[derive(Clone, Default)]
    struct MockConnector {
        attempts: Arc<Mutex<Vec<Instant>>>,
        script: Arc<Mutex<VecDeque<Option<mpsc::UnboundedReceiver<Result<Message, WsError>>>>>>,
    }

    impl MockConnector {
        /// Next attempt succeeds; frames are fed through the returned sender
        fn accept(&self) -> FrameSender {
            let (tx, rx) = mpsc::unbounded_channel();
            self.script.lock().unwrap().push_back(Some(rx));
            tx
        }

        /// Next attempt fails to connect
        fn refuse(&self) {
            self.script.lock().unwrap().push_back(None);
        }

        fn attempts(&self) -> Vec<Instant> {
            self.attempts.lock().unwrap().clone()
        }
    }

    impl Connector for MockConnector {
        type Stream = FrameStream;

        async fn connect(&self, url: &str) -> Result<Self::Stream, ChannelError> {
            self.attempts.lock().unwrap().push(Instant::now());
            let next = self.script.lock().unwrap().pop_front().flatten();
            match next {
                Some(mut rx) => {
                    Ok(futures_util::stream::poll_fn(move |cx| rx.poll_recv(cx)).boxed())
                }
                None => Err(ChannelError::Connect {
                    url: url.to_string(),
                    details: "connection refused".to_string(),
                }),
            }
        }
    }

    async fn next_snapshot(handle: &mut ChannelHandle) -> String {
        loop {
            match handle.event_rx.recv().await {
                Some(ChannelEvent::Snapshot(text)) => return text,
                Some(_) => continue,
                None => panic!("channel task ended"),
            }
        }
    }

    fn count_reconnects(events: &[ChannelEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, ChannelEvent::ReconnectScheduled { .. }))
            .count()
    }

    fn drain(handle: &mut ChannelHandle) -> Vec<ChannelEvent> {
        let mut events = Vec::new();
        while let Ok(event) = handle.event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_default_config() {
        let config = ChannelConfig::new("ws://localhost:8080/ws/abc");
        assert_eq!(config.reconnect_delay, Duration::from_secs(2));

        let config = config.with_reconnect_delay(Duration::from_millis(500));
        assert_eq!(config.reconnect_delay, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_forwards_frames_unfiltered() {
        let connector = MockConnector::default();
        let frames = connector.accept();
        let mut handle = spawn_channel(ChannelConfig::new("ws://test/ws/a"), connector);

        frames.send(Ok(Message::Text("hello".into()))).unwrap();
        frames.send(Ok(Message::Ping(vec![1]))).unwrap();
        frames.send(Ok(Message::Binary(b"hello".to_vec()))).unwrap();

        assert_eq!(next_snapshot(&mut handle).await, "hello");
        // Identical content is still delivered; filtering is the client's job
        assert_eq!(next_snapshot(&mut handle).await, "hello");
        assert_eq!(*handle.state_rx.borrow(), ConnectionState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_then_close_schedules_one_reconnect() {
        let connector = MockConnector::default();
        let frames = connector.accept();
        let _second = connector.accept();
        let mut handle = spawn_channel(ChannelConfig::new("ws://test/ws/a"), connector.clone());

        frames.send(Ok(Message::Text("v1".into()))).unwrap();
        assert_eq!(next_snapshot(&mut handle).await, "v1");

        // One failure reported twice: an error followed by a close
        frames.send(Err(WsError::ConnectionClosed)).unwrap();
        frames.send(Ok(Message::Close(None))).unwrap();

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(connector.attempts().len(), 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        let attempts = connector.attempts();
        assert_eq!(attempts.len(), 2);
        assert!(attempts[1] - attempts[0] >= DEFAULT_RECONNECT_DELAY);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(connector.attempts().len(), 2);
        assert_eq!(count_reconnects(&drain(&mut handle)), 1);
        assert_eq!(*handle.state_rx.borrow(), ConnectionState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_close_schedules_one_reconnect() {
        let connector = MockConnector::default();
        let frames = connector.accept();
        let _second = connector.accept();
        let mut handle = spawn_channel(ChannelConfig::new("ws://test/ws/a"), connector.clone());

        frames.send(Ok(Message::Close(None))).unwrap();
        drop(frames);

        tokio::time::sleep(Duration::from_millis(2001)).await;
        assert_eq!(connector.attempts().len(), 2);
        assert_eq!(count_reconnects(&drain(&mut handle)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_forever_with_constant_delay() {
        let connector = MockConnector::default();
        for _ in 0..4 {
            connector.refuse();
        }
        let _live = connector.accept();
        let mut handle = spawn_channel(ChannelConfig::new("ws://test/ws/a"), connector.clone());

        tokio::time::sleep(Duration::from_secs(9)).await;

        let attempts = connector.attempts();
        assert_eq!(attempts.len(), 5);
        for pair in attempts.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= DEFAULT_RECONNECT_DELAY);
            assert!(gap < DEFAULT_RECONNECT_DELAY + Duration::from_millis(10));
        }
        assert_eq!(count_reconnects(&drain(&mut handle)), 4);
        assert_eq!(*handle.state_rx.borrow(), ConnectionState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_reconnect_wait() {
        let connector = MockConnector::default();
        connector.refuse();
        let mut handle = spawn_channel(ChannelConfig::new("ws://test/ws/a"), connector.clone());

        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.shutdown().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(connector.attempts().len(), 1);
        assert_eq!(*handle.state_rx.borrow(), ConnectionState::Closed);
        drain(&mut handle);
        assert!(handle.event_rx.recv().await.is_none());
    }
}
