//! Reconnecting stream client.
//!
//! State machine: `Idle -> Connecting -> Connected -> Disconnected -> Connecting -> ...`.
//! Every failure (refused, handshake timeout, I/O error, peer close) goes
//! through `Disconnected` and a backoff delay before the next attempt.
//! Only [`StreamHandle::shutdown`] stops the client, after which no further
//! notification is observed by the control context.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use rand::Rng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use zml_core::{Backoff, BackoffPolicy, ConnectionStatus, PositionEvent};

use crate::connector::{Connector, FrameStream};
use crate::error::ConnectionError;

/// Default handshake timeout for one connection attempt.
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default capacity of the notification channel to the control context.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// After this many consecutive failures, connection errors log at debug
/// level instead of warn.
const DEBUG_LOG_THRESHOLD: u32 = 10;

/// Reason reported when the peer ends the stream.
const CLOSED_REASON: &str = "connection closed";

// ─── Public types ─────────────────────────────────────────────────

/// Lifecycle of the client. `Idle` before the worker starts and after shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
}

impl From<ConnectionStatus> for ClientState {
    fn from(status: ConnectionStatus) -> Self {
        match status {
            ConnectionStatus::Connecting => Self::Connecting,
            ConnectionStatus::Connected => Self::Connected,
            ConnectionStatus::Disconnected => Self::Disconnected,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Full streaming URL, see `zml_core::position_stream_url`.
    pub url: String,
    pub handshake_timeout: Duration,
    pub backoff: BackoffPolicy,
    pub channel_capacity: usize,
}

impl StreamConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            backoff: BackoffPolicy::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// What the client reports to the control context.
///
/// `generation` identifies the connection attempt that produced the
/// notification; it grows by one per attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamNotification {
    Status {
        generation: u64,
        status: ConnectionStatus,
        error: Option<String>,
    },
    Event {
        generation: u64,
        event: PositionEvent,
    },
}

impl StreamNotification {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Status { generation, .. } | Self::Event { generation, .. } => *generation,
        }
    }
}

// ─── Client ───────────────────────────────────────────────────────

pub struct StreamClient<C: Connector> {
    config: StreamConfig,
    connector: C,
}

impl<C: Connector> StreamClient<C> {
    pub fn new(config: StreamConfig, connector: C) -> Self {
        Self { config, connector }
    }

    /// Spawn the worker task. Must be called inside a tokio runtime.
    pub fn spawn(self) -> (StreamHandle, StreamEvents) {
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let state = Arc::new(watch::Sender::new(ClientState::Idle));

        let worker = Worker {
            backoff: Backoff::new(self.config.backoff),
            config: self.config,
            connector: self.connector,
            tx,
            state: Arc::clone(&state),
            cancel: cancel.clone(),
            sequence: 0,
            generation: 0,
            consecutive_failures: 0,
        };
        let task = tokio::spawn(worker.run());

        let handle = StreamHandle {
            cancel: cancel.clone(),
            state,
            task,
        };
        (handle, StreamEvents::new(rx, cancel))
    }
}

/// Control side of a running client.
pub struct StreamHandle {
    cancel: CancellationToken,
    state: Arc<watch::Sender<ClientState>>,
    task: JoinHandle<()>,
}

impl StreamHandle {
    /// Stop reconnecting, close the live connection and silence all
    /// further notifications. `state()` reads `Idle` as soon as this
    /// returns. Safe to call any number of times.
    pub fn shutdown(&self) {
        if !self.cancel.is_cancelled() {
            tracing::info!("stream client: shutdown requested");
        }
        // Cancel before publishing Idle: the worker checks the token under
        // the same watch lock, so it cannot overwrite Idle afterwards.
        self.cancel.cancel();
        self.state.send_replace(ClientState::Idle);
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn state(&self) -> ClientState {
        *self.state.borrow()
    }

    /// Wait for the worker task to finish.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "stream client: worker task failed");
        }
    }
}

/// Receiving side of the notification channel, owned by the control context.
pub struct StreamEvents {
    rx: mpsc::Receiver<StreamNotification>,
    cancel: CancellationToken,
    current_generation: u64,
}

impl StreamEvents {
    fn new(rx: mpsc::Receiver<StreamNotification>, cancel: CancellationToken) -> Self {
        Self {
            rx,
            cancel,
            current_generation: 0,
        }
    }

    /// Next notification, in arrival order.
    ///
    /// Returns `None` once the client is shut down (including for
    /// notifications still queued) or the worker has exited. Notifications
    /// from a connection older than the newest seen are discarded.
    pub async fn recv(&mut self) -> Option<StreamNotification> {
        loop {
            let notification = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                n = self.rx.recv() => n,
            };
            let notification = notification?;

            if self.cancel.is_cancelled() {
                return None;
            }

            let generation = notification.generation();
            if generation < self.current_generation {
                tracing::trace!(
                    generation,
                    current = self.current_generation,
                    "stream client: discarding notification from superseded connection"
                );
                continue;
            }
            self.current_generation = generation;
            return Some(notification);
        }
    }
}

// ─── Worker ───────────────────────────────────────────────────────

struct Worker<C: Connector> {
    config: StreamConfig,
    connector: C,
    tx: mpsc::Sender<StreamNotification>,
    state: Arc<watch::Sender<ClientState>>,
    cancel: CancellationToken,
    backoff: Backoff,
    sequence: u64,
    generation: u64,
    consecutive_failures: u32,
}

impl<C: Connector> Worker<C> {
    async fn run(mut self) {
        tracing::info!(url = %self.config.url, "stream client: started");
        while self.cycle().await {}
        self.state.send_replace(ClientState::Idle);
        tracing::info!(url = %self.config.url, "stream client: stopped");
    }

    /// One connect / read / backoff round. Returns `false` when the worker
    /// must stop.
    async fn cycle(&mut self) -> bool {
        self.generation += 1;
        let generation = self.generation;

        if !self.report(generation, ConnectionStatus::Connecting, None).await {
            return false;
        }

        let timeout = self.config.handshake_timeout;
        let attempt = tokio::time::timeout(timeout, self.connector.connect(&self.config.url));
        let connected = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return false,
            result = attempt => result.unwrap_or(Err(ConnectionError::Timeout(timeout))),
        };

        let reason = match connected {
            Ok(frames) => {
                self.backoff.reset();
                self.consecutive_failures = 0;
                tracing::info!(url = %self.config.url, generation, "stream client: connected");
                if !self.report(generation, ConnectionStatus::Connected, None).await {
                    return false;
                }
                match self.pump(generation, frames).await {
                    Some(reason) => reason,
                    None => return false,
                }
            }
            Err(e) => e.to_string(),
        };

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures >= DEBUG_LOG_THRESHOLD {
            tracing::debug!(
                consecutive_failures = self.consecutive_failures,
                "stream client: disconnected: {reason}"
            );
        } else {
            tracing::warn!("stream client: disconnected: {reason}");
        }

        if !self
            .report(generation, ConnectionStatus::Disconnected, Some(reason))
            .await
        {
            return false;
        }

        let delay = self.backoff.next_delay(draw_jitter(self.backoff.policy()));
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => {
                tracing::debug!(
                    url = %self.config.url,
                    delay_ms = delay.as_millis() as u64,
                    attempt = self.backoff.attempt(),
                    "stream client: reconnecting"
                );
                true
            }
        }
    }

    /// Read frames until the connection ends. Returns the disconnect
    /// reason, or `None` if the worker must stop.
    async fn pump(&mut self, generation: u64, mut frames: FrameStream) -> Option<String> {
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                frame = frames.next() => frame,
            };

            match frame {
                Some(Ok(raw)) => match zml_core::decode(&raw) {
                    Ok(dto) => {
                        self.sequence += 1;
                        let event = PositionEvent::new(self.sequence, dto);
                        if !self.emit(StreamNotification::Event { generation, event }).await {
                            return None;
                        }
                    }
                    Err(e) => {
                        tracing::trace!(error = %e, "stream client: dropped undecodable frame");
                    }
                },
                Some(Err(e)) => return Some(e.to_string()),
                None => return Some(CLOSED_REASON.to_string()),
            }
        }
    }

    async fn report(
        &self,
        generation: u64,
        status: ConnectionStatus,
        error: Option<String>,
    ) -> bool {
        let cancel = &self.cancel;
        self.state.send_if_modified(|state| {
            if cancel.is_cancelled() {
                return false;
            }
            *state = status.into();
            true
        });
        self.emit(StreamNotification::Status {
            generation,
            status,
            error,
        })
        .await
    }

    /// Deliver one notification. `false` means shutdown was requested or
    /// the control context is gone.
    async fn emit(&self, notification: StreamNotification) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.tx.send(notification) => {
                if sent.is_err() {
                    tracing::debug!("stream client: notification receiver dropped, stopping");
                }
                sent.is_ok()
            }
        }
    }
}

fn draw_jitter(policy: &BackoffPolicy) -> u64 {
    if policy.jitter_ms == 0 {
        return 0;
    }
    rand::rng().random_range(0..policy.jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use futures_util::stream;

    const CALYPSO: &str = r#"{"ts_ms":1000,"planet_name":"Calypso","x":10,"y":20,"z":null}"#;

    /// What the fake transport does on the next `connect`.
    enum Attempt {
        Refuse(&'static str),
        Accept(FrameStream),
        Hang,
    }

    #[derive(Clone)]
    struct FakeConnector {
        script: Arc<Mutex<VecDeque<Attempt>>>,
        attempts: Arc<AtomicUsize>,
    }

    impl FakeConnector {
        fn new(script: Vec<Attempt>) -> Self {
            Self {
                script: Arc::new(Mutex::new(script.into())),
                attempts: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl Connector for FakeConnector {
        fn connect(
            &self,
            _url: &str,
        ) -> impl Future<Output = Result<FrameStream, ConnectionError>> + Send {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            async move {
                match next {
                    Some(Attempt::Refuse(reason)) => Err(ConnectionError::Handshake(reason.into())),
                    Some(Attempt::Accept(frames)) => Ok(frames),
                    Some(Attempt::Hang) | None => std::future::pending().await,
                }
            }
        }
    }

    /// A connection that yields `frames` and then closes.
    fn closing_socket(frames: &[&str]) -> FrameStream {
        let items: Vec<Result<Vec<u8>, ConnectionError>> =
            frames.iter().map(|f| Ok(f.as_bytes().to_vec())).collect();
        stream::iter(items).boxed()
    }

    /// A connection fed by the test until the sender is dropped.
    fn live_socket() -> (
        mpsc::UnboundedSender<Result<Vec<u8>, ConnectionError>>,
        FrameStream,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let frames = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed();
        (tx, frames)
    }

    fn fast_config() -> StreamConfig {
        StreamConfig {
            url: "ws://fake/ws/position".into(),
            handshake_timeout: Duration::from_secs(1),
            backoff: BackoffPolicy {
                base_ms: 1,
                max_ms: 5,
                max_exponent: 5,
                jitter_ms: 0,
            },
            channel_capacity: 64,
        }
    }

    async fn next(events: &mut StreamEvents) -> StreamNotification {
        tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for notification")
            .expect("notification stream ended")
    }

    async fn next_status(events: &mut StreamEvents) -> (ConnectionStatus, Option<String>) {
        match next(events).await {
            StreamNotification::Status { status, error, .. } => (status, error),
            other => panic!("expected status, got {other:?}"),
        }
    }

    async fn next_event(events: &mut StreamEvents) -> PositionEvent {
        loop {
            if let StreamNotification::Event { event, .. } = next(events).await {
                return event;
            }
        }
    }

    #[tokio::test]
    async fn decodes_frame_into_sequenced_event() {
        let connector = FakeConnector::new(vec![Attempt::Accept(closing_socket(&[CALYPSO]))]);
        let (handle, mut events) = StreamClient::new(fast_config(), connector).spawn();

        let event = next_event(&mut events).await;
        assert_eq!(event.sequence, 1);
        assert_eq!(event.timestamp_ms, 1000);
        assert_eq!(event.payload.timestamp_ms, 1000);
        assert_eq!(event.payload.position.planet_name, "Calypso");
        assert_eq!(event.payload.position.x, 10.0);
        assert_eq!(event.payload.position.y, 20.0);
        assert_eq!(event.payload.position.z, None);

        handle.shutdown();
        handle.join().await;
    }

    #[tokio::test]
    async fn unexpected_close_goes_through_disconnected() {
        let connector = FakeConnector::new(vec![
            Attempt::Accept(closing_socket(&[])),
            Attempt::Refuse("connection refused"),
            Attempt::Hang,
        ]);
        let (handle, mut events) = StreamClient::new(fast_config(), connector).spawn();

        assert_eq!(next_status(&mut events).await, (ConnectionStatus::Connecting, None));
        assert_eq!(next_status(&mut events).await, (ConnectionStatus::Connected, None));
        assert_eq!(
            next_status(&mut events).await,
            (ConnectionStatus::Disconnected, Some(CLOSED_REASON.to_string()))
        );
        assert_eq!(next_status(&mut events).await, (ConnectionStatus::Connecting, None));

        let (status, error) = next_status(&mut events).await;
        assert_eq!(status, ConnectionStatus::Disconnected);
        assert!(error.unwrap().contains("connection refused"));

        assert_eq!(next_status(&mut events).await, (ConnectionStatus::Connecting, None));
        assert_eq!(handle.state(), ClientState::Connecting);

        handle.shutdown();
        handle.join().await;
    }

    #[tokio::test]
    async fn sequence_survives_reconnect_and_skips_garbage() {
        let a = r#"{"ts_ms":1,"x":1,"y":1}"#;
        let b = r#"{"ts_ms":2,"x":2,"y":2}"#;
        let c = r#"{"ts_ms":3,"x":3,"y":3}"#;
        let connector = FakeConnector::new(vec![
            Attempt::Accept(closing_socket(&[a, "not json", r#"{"ts_ms":"x"}"#, b])),
            Attempt::Accept(closing_socket(&[c])),
            Attempt::Hang,
        ]);
        let (handle, mut events) = StreamClient::new(fast_config(), connector).spawn();

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(next_event(&mut events).await);
        }

        let timestamps: Vec<i64> = seen.iter().map(|e| e.timestamp_ms).collect();
        assert_eq!(timestamps, vec![1, 2, 3], "events keep arrival order");
        for pair in seen.windows(2) {
            assert!(pair[0].sequence < pair[1].sequence);
        }
        assert_eq!(seen[2].sequence, 3, "reconnect must not reset the counter");

        handle.shutdown();
        handle.join().await;
    }

    #[tokio::test]
    async fn mid_stream_io_error_triggers_reconnect() {
        let (socket_tx, frames) = live_socket();
        let connector = FakeConnector::new(vec![Attempt::Accept(frames), Attempt::Hang]);
        let attempts = connector.clone();
        let (handle, mut events) = StreamClient::new(fast_config(), connector).spawn();

        assert_eq!(next_status(&mut events).await.0, ConnectionStatus::Connecting);
        assert_eq!(next_status(&mut events).await.0, ConnectionStatus::Connected);

        socket_tx
            .send(Err(ConnectionError::Io("reset by peer".into())))
            .unwrap();

        let (status, error) = next_status(&mut events).await;
        assert_eq!(status, ConnectionStatus::Disconnected);
        assert!(error.unwrap().contains("reset by peer"));
        assert_eq!(next_status(&mut events).await.0, ConnectionStatus::Connecting);
        assert_eq!(attempts.attempts(), 2);

        handle.shutdown();
        handle.join().await;
    }

    #[tokio::test]
    async fn handshake_timeout_is_a_connection_failure() {
        let connector = FakeConnector::new(vec![Attempt::Hang]);
        let config = StreamConfig {
            handshake_timeout: Duration::from_millis(20),
            ..fast_config()
        };
        let (handle, mut events) = StreamClient::new(config, connector).spawn();

        assert_eq!(next_status(&mut events).await.0, ConnectionStatus::Connecting);
        let (status, error) = next_status(&mut events).await;
        assert_eq!(status, ConnectionStatus::Disconnected);
        assert!(error.unwrap().contains("timed out"));

        handle.shutdown();
        handle.join().await;
    }

    #[tokio::test]
    async fn nothing_is_observed_after_shutdown() {
        let (socket_tx, frames) = live_socket();
        let connector = FakeConnector::new(vec![Attempt::Accept(frames)]);
        let (handle, mut events) = StreamClient::new(fast_config(), connector).spawn();

        assert_eq!(next_status(&mut events).await.0, ConnectionStatus::Connecting);
        assert_eq!(next_status(&mut events).await.0, ConnectionStatus::Connected);

        // Queue an event that has not been read yet, then shut down.
        socket_tx.send(Ok(CALYPSO.as_bytes().to_vec())).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.shutdown();

        // The fake socket keeps trying to deliver.
        let _ = socket_tx.send(Ok(CALYPSO.as_bytes().to_vec()));
        let _ = socket_tx.send(Err(ConnectionError::Io("late error".into())));

        assert!(events.recv().await.is_none());
        assert!(events.recv().await.is_none());

        tokio::time::timeout(Duration::from_secs(2), handle.join())
            .await
            .expect("worker should stop after shutdown");
    }

    #[tokio::test]
    async fn shutdown_cancels_pending_reconnect() {
        let connector = FakeConnector::new(vec![Attempt::Refuse("refused")]);
        let attempts = connector.clone();
        let config = StreamConfig {
            backoff: BackoffPolicy {
                base_ms: 60_000,
                max_ms: 60_000,
                max_exponent: 0,
                jitter_ms: 0,
            },
            ..fast_config()
        };
        let (handle, mut events) = StreamClient::new(config, connector).spawn();

        assert_eq!(next_status(&mut events).await.0, ConnectionStatus::Connecting);
        assert_eq!(next_status(&mut events).await.0, ConnectionStatus::Disconnected);

        handle.shutdown();
        handle.shutdown();
        assert!(handle.is_shutdown());

        tokio::time::timeout(Duration::from_secs(2), handle.join())
            .await
            .expect("backoff sleep should be cancelled");
        assert_eq!(attempts.attempts(), 1, "no reconnect after shutdown");
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn state_returns_to_idle_after_shutdown() {
        let (state, result) = {
            let connector = FakeConnector::new(vec![Attempt::Hang]);
            let (handle, mut events) = StreamClient::new(fast_config(), connector).spawn();
            assert_eq!(next_status(&mut events).await.0, ConnectionStatus::Connecting);

            let state = handle.state.subscribe();
            handle.shutdown();
            let result = tokio::time::timeout(Duration::from_secs(2), handle.join()).await;
            (state, result)
        };
        assert!(result.is_ok());
        assert_eq!(*state.borrow(), ClientState::Idle);
    }

    #[tokio::test]
    async fn state_is_idle_immediately_after_shutdown() {
        let (_socket_tx, frames) = live_socket();
        let connector = FakeConnector::new(vec![Attempt::Accept(frames)]);
        let (handle, mut events) = StreamClient::new(fast_config(), connector).spawn();

        assert_eq!(next_status(&mut events).await.0, ConnectionStatus::Connecting);
        assert_eq!(next_status(&mut events).await.0, ConnectionStatus::Connected);
        assert_eq!(handle.state(), ClientState::Connected);

        handle.shutdown();
        assert_eq!(handle.state(), ClientState::Idle);

        // Let the worker observe the cancellation; it must not revive the state.
        tokio::task::yield_now().await;
        assert_eq!(handle.state(), ClientState::Idle);

        tokio::time::timeout(Duration::from_secs(2), handle.join())
            .await
            .expect("worker should stop after shutdown");
    }

    #[tokio::test(start_paused = true)]
    async fn successful_connect_resets_backoff() {
        let connector = FakeConnector::new(vec![
            Attempt::Refuse("refused"),
            Attempt::Refuse("refused"),
            Attempt::Accept(closing_socket(&[])),
            Attempt::Refuse("refused"),
            Attempt::Hang,
        ]);
        let config = StreamConfig {
            handshake_timeout: Duration::from_secs(3600),
            backoff: BackoffPolicy {
                base_ms: 100,
                max_ms: 10_000,
                max_exponent: 5,
                jitter_ms: 0,
            },
            ..fast_config()
        };
        let (handle, mut events) = StreamClient::new(config, connector).spawn();

        let mut gaps = Vec::new();
        let mut disconnected_at = None;
        while gaps.len() < 4 {
            let (status, _) = next_status(&mut events).await;
            match status {
                ConnectionStatus::Disconnected => {
                    disconnected_at = Some(tokio::time::Instant::now());
                }
                ConnectionStatus::Connecting => {
                    if let Some(at) = disconnected_at.take() {
                        gaps.push(at.elapsed());
                    }
                }
                ConnectionStatus::Connected => {}
            }
        }

        let ms = Duration::from_millis;
        assert_eq!(gaps, vec![ms(100), ms(200), ms(100), ms(200)]);

        handle.shutdown();
        handle.join().await;
    }

    #[tokio::test]
    async fn dropped_receiver_stops_worker() {
        let script = (0..3).map(|_| Attempt::Refuse("refused")).collect();
        let connector = FakeConnector::new(script);
        let (handle, events) = StreamClient::new(fast_config(), connector).spawn();
        drop(events);

        tokio::time::timeout(Duration::from_secs(2), handle.join())
            .await
            .expect("worker should stop when nobody listens");
    }

    #[tokio::test]
    async fn superseded_generation_is_discarded() {
        let (tx, rx) = mpsc::channel(8);
        let mut events = StreamEvents::new(rx, CancellationToken::new());

        let event = |sequence| PositionEvent::new(
            sequence,
            zml_core::decode(CALYPSO.as_bytes()).unwrap(),
        );

        tx.send(StreamNotification::Status {
            generation: 2,
            status: ConnectionStatus::Connecting,
            error: None,
        })
        .await
        .unwrap();
        tx.send(StreamNotification::Event { generation: 1, event: event(1) })
            .await
            .unwrap();
        tx.send(StreamNotification::Event { generation: 2, event: event(2) })
            .await
            .unwrap();
        drop(tx);

        assert_eq!(next(&mut events).await.generation(), 2);
        match next(&mut events).await {
            StreamNotification::Event { event, .. } => assert_eq!(event.sequence, 2),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(events.recv().await.is_none());
    }

    #[test]
    fn zero_jitter_window_draws_zero() {
        let policy = BackoffPolicy {
            jitter_ms: 0,
            ..BackoffPolicy::default()
        };
        assert_eq!(draw_jitter(&policy), 0);
    }

    #[test]
    fn jitter_is_within_window() {
        let policy = BackoffPolicy::default();
        for _ in 0..200 {
            assert!(draw_jitter(&policy) < policy.jitter_ms);
        }
    }
}
