//! Fire-and-forget delivery of newly discovered items to consumer handlers.

use crate::feed::FeedItem;
use crate::runtime::telemetry::Telemetry;
use anyhow::Result;
use core::future::Future;
use core::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// Consumer of newly discovered feed items.
///
/// Every call runs on its own task. Failures are logged and counted but never
/// reach the poll cycle.
pub trait ItemHandler<I>: Send + Sync + 'static {
    fn handle(&self, item: I) -> HandlerFuture;
}

/// Hands items to an [`ItemHandler`] on detached tasks.
pub struct Dispatcher<I: FeedItem> {
    feed: Arc<str>,
    handler: Arc<dyn ItemHandler<I>>,
    tracker: TaskTracker,
    idle_gate: Arc<Mutex<()>>,
    telemetry: Arc<Telemetry>,
}

impl<I: FeedItem> Clone for Dispatcher<I> {
    fn clone(&self) -> Self {
        Self {
            feed: Arc::clone(&self.feed),
            handler: Arc::clone(&self.handler),
            tracker: self.tracker.clone(),
            idle_gate: Arc::clone(&self.idle_gate),
            telemetry: Arc::clone(&self.telemetry),
        }
    }
}

impl<I: FeedItem> Dispatcher<I> {
    pub fn new(
        feed: impl Into<Arc<str>>,
        handler: Arc<dyn ItemHandler<I>>,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self {
            feed: feed.into(),
            handler,
            tracker: TaskTracker::new(),
            idle_gate: Arc::new(Mutex::new(())),
            telemetry,
        }
    }

    pub(crate) fn with_telemetry(mut self, telemetry: Arc<Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Spawns the handler for `item` and returns immediately.
    pub fn deliver(&self, item: I) {
        self.telemetry.record_dispatched(1);
        let handler = Arc::clone(&self.handler);
        let telemetry = Arc::clone(&self.telemetry);
        let feed = Arc::clone(&self.feed);

        self.tracker.spawn(async move {
            let id = item.id().to_owned();
            if let Err(err) = handler.handle(item).await {
                telemetry.record_handler_failure();
                tracing::warn!(feed = %feed, item = %id, error = %err, "item handler failed");
            }
        });
    }

    /// Number of deliveries still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until every delivery spawned so far has finished.
    ///
    /// Concurrent callers, including clones of this dispatcher, are
    /// serialized so one caller reopening the tracker cannot strand another.
    pub async fn wait_idle(&self) {
        let _gate = self.idle_gate.lock().await;
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
