use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::channel::{Endpoint, EventChannel};
use crate::dispatch::DispatchQueue;
use crate::error::ChannelError;
use crate::feed::handle::RefreshHandle;
use crate::refresh::{FlushReport, RefreshCoordinator};
use crate::status::{ChannelState, ConnectionStatusReporter};

/// A running feed: one channel, one dispatch worker, one refresh worker.
///
/// Dropping the feed closes it.
pub struct LiveFeed {
    channel: EventChannel,
    queue: Arc<DispatchQueue>,
    status: Arc<ConnectionStatusReporter>,
    refresh: RefreshHandle,
    token: CancellationToken,
}

impl LiveFeed {
    pub(crate) fn new(
        channel: EventChannel,
        queue: Arc<DispatchQueue>,
        status: Arc<ConnectionStatusReporter>,
        refresh: RefreshHandle,
        token: CancellationToken,
    ) -> Self {
        Self {
            channel,
            queue,
            status,
            refresh,
            token,
        }
    }

    /// Opens the event channel against `endpoint`.
    pub fn start(&self, endpoint: &Endpoint) -> Result<(), ChannelError> {
        self.channel.open(endpoint)
    }

    /// Opens the feed for the dashboard served at `origin`.
    pub fn start_at(&self, origin: &str) -> Result<(), ChannelError> {
        self.start(&Endpoint::from_origin(origin)?)
    }

    /// Closes the channel and stops both workers. Pending refreshes are dropped.
    pub fn close(&self) {
        self.channel.close();
        self.token.cancel();
    }

    /// Waits until the channel loop has exited after [`close`](Self::close).
    pub async fn closed(&self) {
        self.channel.wait_closed().await;
    }

    /// Connection status reporter.
    pub fn status(&self) -> &Arc<ConnectionStatusReporter> {
        &self.status
    }

    /// Current connection state.
    pub fn state(&self) -> ChannelState {
        self.status.current_state()
    }

    /// Handle for marking refresh targets dirty.
    pub fn refresh_handle(&self) -> RefreshHandle {
        self.refresh.clone()
    }

    /// The refresh coordinator.
    pub fn refresh(&self) -> Option<&RefreshCoordinator> {
        self.refresh.coordinator()
    }

    /// Refreshes every pending target now.
    pub async fn flush(&self) -> FlushReport {
        match self.refresh.coordinator() {
            Some(c) => c.flush().await,
            None => FlushReport::default(),
        }
    }

    /// Valid events received from the server.
    pub fn events_received(&self) -> u64 {
        self.channel.events_received()
    }

    /// Events passed to the dispatcher.
    pub fn events_dispatched(&self) -> u64 {
        self.queue.dispatched()
    }

    /// Events dropped because the dispatcher fell behind.
    pub fn events_dropped(&self) -> u64 {
        self.queue.dropped()
    }

    /// Frames discarded as malformed.
    pub fn malformed_frames(&self) -> u64 {
        self.channel.malformed_frames()
    }

    /// Connection attempts made so far.
    pub fn connect_attempts(&self) -> u64 {
        self.channel.connect_attempts()
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
