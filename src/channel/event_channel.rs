//! # EventChannel: one persistent connection with automatic reconnection.
//!
//! The channel owns a single read loop. The loop connects through a
//! [`Transport`], parses every frame into an [`InboundEvent`] and hands it to
//! the registered sinks. When the connection ends it waits per
//! [`BackoffPolicy`] and connects again, forever, until [`EventChannel::close`].
//!
//! ## Loop
//! ```text
//! loop {
//!   ├─► Connecting ── transport.connect(url) [connect_timeout]
//!   │     ├─► Ok  → Open, schedule.reset()
//!   │     │         read frames until the stream ends or errors
//!   │     │           ├─ valid frame     → sinks(ev)
//!   │     │           └─ malformed frame → warn!, skip
//!   │     └─► Err → warn!
//!   ├─► Closed
//!   ├─► sleep(schedule.next_delay())
//!   └─► Reconnecting
//! }
//! ```
//!
//! ## Rules
//! - At most one connection at a time; `open` twice fails with
//!   [`ChannelError::AlreadyOpen`].
//! - Every state change goes through the [`ConnectionStatusReporter`].
//! - `close` cancels the loop at any await point (handshake, read, backoff
//!   sleep). After `close` the state is `Closed`, no sink is called and no
//!   reconnection is attempted.
//! - Sinks run on the read loop and must not block; a panicking sink is
//!   caught and logged.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::channel::endpoint::Endpoint;
use crate::channel::transport::{Frame, FrameStream, Transport};
use crate::config::Config;
use crate::error::{ChannelError, panic_message};
use crate::events::InboundEvent;
use crate::policies::{BackoffPolicy, ReconnectSchedule};
use crate::status::{ChannelState, ConnectionStatusReporter};

type Sink = Arc<dyn Fn(InboundEvent) + Send + Sync>;

#[derive(Default)]
struct Stats {
    connect_attempts: AtomicU64,
    events_received: AtomicU64,
    malformed_frames: AtomicU64,
}

struct Shared {
    transport: Arc<dyn Transport>,
    reconnect: BackoffPolicy,
    connect_timeout: Option<Duration>,
    status: Arc<ConnectionStatusReporter>,
    token: CancellationToken,
    /// Serializes state updates with `close`, so the state never leaves `Closed` after it.
    gate: Mutex<()>,
    stats: Stats,
}

/// Persistent event connection.
pub struct EventChannel {
    shared: Arc<Shared>,
    sinks: Vec<Sink>,
    started: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

enum Exit {
    Cancelled,
    Dropped,
}

impl EventChannel {
    /// Creates a closed channel. Nothing happens until [`open`](Self::open).
    pub fn new(
        transport: Arc<dyn Transport>,
        config: &Config,
        status: Arc<ConnectionStatusReporter>,
    ) -> Self {
        Self::with_token(transport, config, status, CancellationToken::new())
    }

    /// Like [`new`](Self::new), but stops when `token` is cancelled.
    pub fn with_token(
        transport: Arc<dyn Transport>,
        config: &Config,
        status: Arc<ConnectionStatusReporter>,
        token: CancellationToken,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                reconnect: config.reconnect,
                connect_timeout: config.connect_timeout(),
                status,
                token,
                gate: Mutex::new(()),
                stats: Stats::default(),
            }),
            sinks: Vec::new(),
            started: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    /// Registers a sink for parsed events. Sinks are fixed once the channel is open.
    pub fn on_event<F>(&mut self, sink: F) -> &mut Self
    where
        F: Fn(InboundEvent) + Send + Sync + 'static,
    {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Starts the connection loop against `endpoint`.
    ///
    /// Returns immediately; connection progress is reported through the
    /// status reporter. Must be called inside a tokio runtime.
    pub fn open(&self, endpoint: &Endpoint) -> Result<(), ChannelError> {
        if self.shared.token.is_cancelled() {
            return Err(ChannelError::Closed);
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ChannelError::AlreadyOpen);
        }

        let url = endpoint.ws_url().clone();
        tracing::info!(url = %url, transport = self.shared.transport.name(), "opening event channel");

        let shared = Arc::clone(&self.shared);
        let sinks: Arc<[Sink]> = self.sinks.clone().into();
        let handle = tokio::spawn(async move { shared.run(url, sinks).await });
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    /// Closes the connection and stops reconnecting. Idempotent.
    ///
    /// Safe to call from a status callback.
    pub fn close(&self) {
        let change = {
            let _gate = self.shared.gate.lock().unwrap_or_else(PoisonError::into_inner);
            if !self.shared.token.is_cancelled() {
                tracing::info!("closing event channel");
            }
            self.shared.token.cancel();
            self.shared.status.record(ChannelState::Closed)
        };
        if let Some(change) = change {
            self.shared.status.broadcast(change);
        }
    }

    /// Waits until the connection loop has exited.
    ///
    /// Returns at once if the channel was never opened.
    pub async fn wait_closed(&self) {
        let handle = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "event channel loop aborted");
            }
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ChannelState {
        self.shared.status.current_state()
    }

    /// True once [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.shared.token.is_cancelled()
    }

    /// Connection attempts made so far.
    pub fn connect_attempts(&self) -> u64 {
        self.shared.stats.connect_attempts.load(Ordering::Relaxed)
    }

    /// Valid events delivered to sinks so far.
    pub fn events_received(&self) -> u64 {
        self.shared.stats.events_received.load(Ordering::Relaxed)
    }

    /// Frames discarded as malformed so far.
    pub fn malformed_frames(&self) -> u64 {
        self.shared.stats.malformed_frames.load(Ordering::Relaxed)
    }
}

impl Drop for EventChannel {
    fn drop(&mut self) {
        self.shared.token.cancel();
    }
}

impl Shared {
    async fn run(self: Arc<Self>, url: Url, sinks: Arc<[Sink]>) {
        let mut schedule = ReconnectSchedule::new(self.reconnect);

        loop {
            if !self.transition(ChannelState::Connecting) {
                break;
            }
            self.stats.connect_attempts.fetch_add(1, Ordering::Relaxed);

            let connected = select! {
                biased;
                _ = self.token.cancelled() => break,
                res = self.connect(&url) => res,
            };

            match connected {
                Ok(frames) => {
                    if !self.transition(ChannelState::Open) {
                        break;
                    }
                    tracing::info!(url = %url, "event channel open");
                    schedule.reset();
                    if let Exit::Cancelled = self.read(frames, &sinks).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, label = e.as_label(), "connection attempt failed");
                }
            }

            if !self.transition(ChannelState::Closed) {
                break;
            }
            let delay = schedule.next_delay();
            tracing::info!(
                delay_ms = delay.as_millis() as u64,
                failures = schedule.failures(),
                "reconnect scheduled"
            );

            select! {
                biased;
                _ = self.token.cancelled() => break,
                _ = time::sleep(delay) => {}
            }
            if !self.transition(ChannelState::Reconnecting) {
                break;
            }
        }

        tracing::debug!(url = %url, "event channel loop stopped");
    }

    async fn connect(&self, url: &Url) -> Result<FrameStream, ChannelError> {
        let attempt = self.transport.connect(url);
        match self.connect_timeout {
            Some(limit) => time::timeout(limit, attempt).await.map_err(|_| {
                ChannelError::transport(url.as_str(), format!("handshake timed out after {limit:?}"))
            })?,
            None => attempt.await,
        }
    }

    async fn read(&self, mut frames: FrameStream, sinks: &[Sink]) -> Exit {
        loop {
            let next = select! {
                biased;
                _ = self.token.cancelled() => return Exit::Cancelled,
                next = frames.next() => next,
            };
            match next {
                Some(Ok(frame)) => self.deliver(frame, sinks),
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "connection lost");
                    return Exit::Dropped;
                }
                None => {
                    tracing::info!("connection closed by server");
                    return Exit::Dropped;
                }
            }
        }
    }

    fn deliver(&self, frame: Frame, sinks: &[Sink]) {
        let parsed = match frame {
            Frame::Text(text) => InboundEvent::parse(&text),
            Frame::Binary(bytes) => String::from_utf8(bytes)
                .map_err(|e| ChannelError::parse(format!("binary frame is not utf-8: {e}")))
                .and_then(|text| InboundEvent::parse(&text)),
        };
        let event = match parsed {
            Ok(ev) => ev,
            Err(e) => {
                self.stats.malformed_frames.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "discarding malformed frame");
                return;
            }
        };
        if self.token.is_cancelled() {
            return;
        }

        self.stats.events_received.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(kind = event.kind(), seq = event.seq(), "event received");
        for sink in sinks {
            let ev = event.clone();
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| sink(ev))) {
                tracing::error!(
                    kind = event.kind(),
                    panic = %panic_message(payload.as_ref()),
                    "event sink panicked"
                );
            }
        }
    }

    /// Reports `next` unless the channel was closed. Returns `false` when closed.
    ///
    /// The gate covers only the state update; callbacks run after it is
    /// released so they may call `close`.
    fn transition(&self, next: ChannelState) -> bool {
        let change = {
            let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
            if self.token.is_cancelled() {
                return false;
            }
            self.status.record(next)
        };
        if let Some(change) = change {
            self.status.broadcast(change);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream;
    use std::collections::VecDeque;

    enum Conn {
        Refused,
        Drops(Vec<Frame>),
        Stays(Vec<Frame>),
    }

    struct Scripted {
        conns: Mutex<VecDeque<Conn>>,
    }

    impl Scripted {
        fn new(conns: Vec<Conn>) -> Arc<Self> {
            Arc::new(Self {
                conns: Mutex::new(conns.into()),
            })
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn connect(&self, url: &Url) -> Result<FrameStream, ChannelError> {
            let next = self.conns.lock().unwrap().pop_front();
            match next.unwrap_or(Conn::Stays(Vec::new())) {
                Conn::Refused => Err(ChannelError::transport(url.as_str(), "connection refused")),
                Conn::Drops(frames) => Ok(stream::iter(frames.into_iter().map(Ok)).boxed()),
                Conn::Stays(frames) => Ok(stream::iter(frames.into_iter().map(Ok))
                    .chain(stream::pending())
                    .boxed()),
            }
        }
    }

    fn text(s: &str) -> Frame {
        Frame::Text(s.to_string())
    }

    fn config(reconnect_ms: u64) -> Config {
        Config {
            reconnect: BackoffPolicy::fixed(Duration::from_millis(reconnect_ms)),
            ..Config::default()
        }
    }

    fn endpoint() -> Endpoint {
        Endpoint::from_origin("http://localhost:8000/").unwrap()
    }

    fn recording(
        channel: &mut EventChannel,
    ) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        channel.on_event(move |ev| sink.lock().unwrap().push(ev.kind().to_string()));
        seen
    }

    fn states(status: &ConnectionStatusReporter) -> Arc<Mutex<Vec<ChannelState>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let l = log.clone();
        status.subscribe(move |change| l.lock().unwrap().push(change.current));
        log
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frames_are_skipped() {
        let transport = Scripted::new(vec![Conn::Stays(vec![
            text("not json"),
            text(r#"{"title":"no type"}"#),
            text("[1,2]"),
            Frame::Binary(vec![0xff, 0xfe]),
            text(r#"{"type":"notification","title":"ok"}"#),
            Frame::Binary(br#"{"type":"crawl_start"}"#.to_vec()),
        ])]);
        let status = Arc::new(ConnectionStatusReporter::new());
        let mut channel = EventChannel::new(transport, &config(1_000), status.clone());
        let seen = recording(&mut channel);

        channel.open(&endpoint()).unwrap();
        time::sleep(Duration::from_millis(10)).await;

        assert_eq!(*seen.lock().unwrap(), vec!["notification", "crawl_start"]);
        assert_eq!(channel.malformed_frames(), 4);
        assert_eq!(channel.events_received(), 2);
        assert_eq!(channel.state(), ChannelState::Open);
        assert_eq!(channel.connect_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_once_after_backoff() {
        let transport = Scripted::new(vec![
            Conn::Drops(vec![text(r#"{"type":"crawl_start"}"#)]),
            Conn::Stays(vec![text(r#"{"type":"crawl_complete"}"#)]),
        ]);
        let status = Arc::new(ConnectionStatusReporter::new());
        let log = states(&status);
        let mut channel = EventChannel::new(transport, &config(1_000), status.clone());
        let seen = recording(&mut channel);

        channel.open(&endpoint()).unwrap();
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(channel.state(), ChannelState::Closed);
        assert_eq!(channel.connect_attempts(), 1);

        time::sleep(Duration::from_millis(600)).await;
        assert_eq!(channel.state(), ChannelState::Open);
        assert_eq!(channel.connect_attempts(), 2);
        assert_eq!(*seen.lock().unwrap(), vec!["crawl_start", "crawl_complete"]);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ChannelState::Connecting,
                ChannelState::Open,
                ChannelState::Closed,
                ChannelState::Reconnecting,
                ChannelState::Connecting,
                ChannelState::Open,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_handshakes_back_off_until_success() {
        let transport = Scripted::new(vec![Conn::Refused, Conn::Refused, Conn::Stays(Vec::new())]);
        let status = Arc::new(ConnectionStatusReporter::new());
        let cfg = Config {
            reconnect: BackoffPolicy {
                first: Duration::from_millis(100),
                max: Duration::from_secs(5),
                factor: 2.0,
                jitter: crate::policies::JitterPolicy::None,
            },
            ..Config::default()
        };
        let channel = EventChannel::new(transport, &cfg, status);

        channel.open(&endpoint()).unwrap();
        // attempts at 0ms, 100ms, 300ms
        time::sleep(Duration::from_millis(250)).await;
        assert_eq!(channel.connect_attempts(), 2);
        assert_eq!(channel.state(), ChannelState::Closed);

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(channel.connect_attempts(), 3);
        assert_eq!(channel.state(), ChannelState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn close_during_backoff_stops_reconnection() {
        let transport = Scripted::new(vec![Conn::Drops(Vec::new())]);
        let status = Arc::new(ConnectionStatusReporter::new());
        let channel = EventChannel::new(transport, &config(1_000), status);

        channel.open(&endpoint()).unwrap();
        time::sleep(Duration::from_millis(100)).await;
        channel.close();
        channel.wait_closed().await;

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(channel.connect_attempts(), 1);
        assert_eq!(channel.state(), ChannelState::Closed);
        assert!(channel.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn open_twice_and_after_close_fail() {
        let transport = Scripted::new(Vec::new());
        let channel = EventChannel::new(
            transport,
            &config(1_000),
            Arc::new(ConnectionStatusReporter::new()),
        );

        channel.open(&endpoint()).unwrap();
        assert!(matches!(channel.open(&endpoint()), Err(ChannelError::AlreadyOpen)));

        channel.close();
        assert!(matches!(channel.open(&endpoint()), Err(ChannelError::Closed)));
        channel.wait_closed().await;
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_sink_does_not_stop_the_next() {
        let transport = Scripted::new(vec![Conn::Stays(vec![
            text(r#"{"type":"notification"}"#),
            text(r#"{"type":"notification"}"#),
        ])]);
        let mut channel = EventChannel::new(
            transport,
            &config(1_000),
            Arc::new(ConnectionStatusReporter::new()),
        );
        channel.on_event(|_| panic!("sink exploded"));
        let seen = recording(&mut channel);

        channel.open(&endpoint()).unwrap();
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(channel.state(), ChannelState::Open);
    }

    #[test]
    fn status_callback_may_close_the_channel() {
        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .start_paused(true)
                .build()
                .unwrap();
            let attempts = rt.block_on(async {
                let transport = Scripted::new(vec![Conn::Drops(Vec::new())]);
                let status = Arc::new(ConnectionStatusReporter::new());
                let channel = Arc::new(EventChannel::new(transport, &config(50), status.clone()));
                let weak = Arc::downgrade(&channel);
                status.subscribe(move |change| {
                    if change.current == ChannelState::Closed {
                        if let Some(ch) = weak.upgrade() {
                            ch.close();
                        }
                    }
                });

                channel.open(&endpoint()).unwrap();
                channel.wait_closed().await;
                assert!(channel.is_closed());
                assert_eq!(channel.state(), ChannelState::Closed);
                channel.connect_attempts()
            });
            let _ = done_tx.send(attempts);
        });

        let attempts = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("close() from a status callback did not return");
        assert_eq!(attempts, 1);
    }
}
