use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::channel::{EventChannel, Transport};
use crate::config::Config;
use crate::dispatch::{DispatchQueue, Dispatcher, HandlerFn, HandlerRef};
use crate::error::{ChannelError, HandlerError};
use crate::events::InboundEvent;
use crate::feed::handle::RefreshHandle;
use crate::feed::live::LiveFeed;
use crate::notify::{EventNotices, LogNotifier, Notify};
use crate::refresh::{RefreshCoordinator, RefreshRef};
use crate::status::ConnectionStatusReporter;

/// Builder for a [`LiveFeed`].
pub struct LiveFeedBuilder {
    cfg: Config,
    dispatcher: Dispatcher,
    targets: BTreeMap<String, RefreshRef>,
    notifier: Arc<dyn Notify>,
    transport: Option<Arc<dyn Transport>>,
    status: Arc<ConnectionStatusReporter>,
    handle: RefreshHandle,
    event_notices: bool,
}

impl LiveFeedBuilder {
    /// Creates a builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            dispatcher: Dispatcher::new(),
            targets: BTreeMap::new(),
            notifier: Arc::new(LogNotifier::new()),
            transport: None,
            status: Arc::new(ConnectionStatusReporter::new()),
            handle: RefreshHandle::new(),
            event_notices: false,
        }
    }

    /// Registers a handler for events of `kind`.
    ///
    /// Handlers of one kind run in registration order.
    pub fn on(mut self, kind: impl Into<String>, handler: HandlerRef) -> Self {
        self.dispatcher.register(kind, handler);
        self
    }

    /// Registers a refresh operation under `id`.
    pub fn refresh_target(mut self, id: impl Into<String>, target: RefreshRef) -> Self {
        let id = id.into();
        if self.targets.insert(id.clone(), target).is_some() {
            tracing::warn!(target = %id, "refresh target registered twice; keeping the last one");
        }
        self
    }

    /// Marks `targets` dirty whenever an event of `kind` arrives.
    pub fn refresh_on<I, S>(self, kind: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let kind = kind.into();
        let targets: Arc<[String]> = targets.into_iter().map(Into::into).collect();
        let handle = self.handle.clone();
        let name = format!("refresh-on:{kind}");
        let handler = HandlerFn::arc(name, move |_ev: InboundEvent| {
            let handle = handle.clone();
            let targets = Arc::clone(&targets);
            async move {
                handle.mark_all(targets.iter().map(String::as_str));
                Ok::<(), HandlerError>(())
            }
        });
        self.on(kind, handler)
    }

    /// Sets the sink for user-visible notices. Defaults to [`LogNotifier`].
    pub fn notifier(mut self, notifier: Arc<dyn Notify>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Also shows notices for notification and crawl lifecycle events.
    pub fn with_event_notices(mut self) -> Self {
        self.event_notices = true;
        self
    }

    /// Sets the connection transport. Defaults to `WsTransport` with the `ws` feature.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Uses an existing status reporter, so observers can subscribe before the build.
    pub fn status(mut self, status: Arc<ConnectionStatusReporter>) -> Self {
        self.status = status;
        self
    }

    /// Handle for handlers that mark targets dirty themselves.
    pub fn refresh_handle(&self) -> RefreshHandle {
        self.handle.clone()
    }

    /// Wires the channel, dispatcher and refresh coordinator.
    ///
    /// Spawns the dispatch and refresh workers, so it must run inside a tokio
    /// runtime. The channel stays closed until [`LiveFeed::start`].
    pub fn build(mut self) -> Result<LiveFeed, ChannelError> {
        let transport = match self.transport.take() {
            Some(t) => t,
            None => default_transport()?,
        };

        if self.event_notices {
            let notices: HandlerRef = Arc::new(EventNotices::new(Arc::clone(&self.notifier)));
            for kind in EventNotices::KINDS {
                self.dispatcher.register(kind, Arc::clone(&notices));
            }
        }

        let token = CancellationToken::new();
        let coordinator = RefreshCoordinator::spawn(
            self.targets,
            self.cfg.debounce,
            self.cfg.max_debounce(),
            Arc::clone(&self.notifier),
            token.child_token(),
        );
        self.handle.bind(coordinator);

        let queue = Arc::new(DispatchQueue::spawn(
            Arc::new(self.dispatcher),
            self.cfg.dispatch_capacity_clamped(),
            token.child_token(),
        ));

        let mut channel = EventChannel::with_token(
            transport,
            &self.cfg,
            Arc::clone(&self.status),
            token.child_token(),
        );
        let sink = Arc::clone(&queue);
        channel.on_event(move |ev| {
            sink.push(ev);
        });

        Ok(LiveFeed::new(channel, queue, self.status, self.handle, token))
    }
}

#[cfg(feature = "ws")]
fn default_transport() -> Result<Arc<dyn Transport>, ChannelError> {
    Ok(Arc::new(crate::channel::WsTransport::new()))
}

#[cfg(not(feature = "ws"))]
fn default_transport() -> Result<Arc<dyn Transport>, ChannelError> {
    Err(ChannelError::NoTransport)
}
