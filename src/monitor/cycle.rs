//! Poll cycle for a single feed.
//!
//! Each call to [`FeedMonitor::update`] runs two steps strictly in order:
//! - fetch-and-delta asks the accessor for items newer than the tip, seeds or
//!   grows the [`TipWindow`], and dispatches every new item;
//! - repair runs whenever that page was non-empty and checks that nothing sits
//!   between the previous entry and the tip. If something does, the tip
//!   retreats by exactly one entry and the next cycle picks the gap back up.
//!   A tip with only the sentinel below it is never shaved, so a one-item
//!   seed cannot collapse back to an unseeded window.

use super::error::PollError;
use super::tip::{TipWindow, SENTINEL};
use crate::dispatch::{Dispatcher, ItemHandler};
use crate::feed::{FeedAccessor, FeedItem, PageQuery};
use crate::runtime::config::MonitorConfig;
use crate::runtime::telemetry::Telemetry;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;

/// Monitors one feed and delivers each new item to its handler.
///
/// The monitor exclusively owns its tip window. Cycles must not overlap;
/// `update` takes `&mut self` so the borrow checker enforces it.
pub struct FeedMonitor<A: FeedAccessor> {
    config: MonitorConfig,
    accessor: A,
    dispatcher: Dispatcher<A::Item>,
    window: TipWindow,
    telemetry: Arc<Telemetry>,
}

enum TipAdvance<I> {
    Idle,
    Seeded(usize),
    Advanced(Vec<I>),
}

impl<A: FeedAccessor> FeedMonitor<A> {
    /// Creates a monitor with an unseeded tip window. The first successful
    /// cycle seeds the window without delivering anything.
    pub fn new<H>(config: MonitorConfig, accessor: A, handler: H) -> Self
    where
        H: ItemHandler<A::Item>,
    {
        let window = TipWindow::new(config.tip_window_size());
        Self::with_window(config, accessor, Arc::new(handler), window)
    }

    /// Creates a monitor resuming from an existing tip window.
    pub fn with_window(
        config: MonitorConfig,
        accessor: A,
        handler: Arc<dyn ItemHandler<A::Item>>,
        window: TipWindow,
    ) -> Self {
        let telemetry = Arc::new(Telemetry::default());
        let dispatcher = Dispatcher::new(config.feed(), handler, Arc::clone(&telemetry));
        Self {
            config,
            accessor,
            dispatcher,
            window,
            telemetry,
        }
    }

    /// Routes the monitor's counters into a shared telemetry handle.
    pub fn with_telemetry(mut self, telemetry: Arc<Telemetry>) -> Self {
        self.dispatcher = self.dispatcher.with_telemetry(Arc::clone(&telemetry));
        self.telemetry = telemetry;
        self
    }

    pub fn feed(&self) -> &str {
        self.config.feed()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn window(&self) -> &TipWindow {
        &self.window
    }

    pub fn accessor(&self) -> &A {
        &self.accessor
    }

    pub fn dispatcher(&self) -> &Dispatcher<A::Item> {
        &self.dispatcher
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        Arc::clone(&self.telemetry)
    }

    /// Runs one poll cycle and returns the items delivered during it.
    ///
    /// A fetch failure leaves the window untouched. A repair failure is
    /// reported after the cycle's new items were already dispatched and
    /// appended; that progress is kept.
    pub async fn update(&mut self) -> Result<Vec<A::Item>, PollError> {
        let advance = match self.fetch_tip().await {
            Ok(advance) => advance,
            Err(err) => {
                self.telemetry.record_fetch_failure();
                return Err(err);
            }
        };

        let (fetched, fresh) = match advance {
            TipAdvance::Idle => (0, Vec::new()),
            TipAdvance::Seeded(count) => (count, Vec::new()),
            TipAdvance::Advanced(items) => (items.len(), items),
        };

        for item in &fresh {
            self.dispatcher.deliver(item.clone());
        }

        if fetched > 0 {
            if let Err(err) = self.fix_tip().await {
                self.telemetry.record_repair_failure();
                return Err(err);
            }
        }

        self.telemetry.record_cycle_completed();
        tracing::debug!(
            feed = self.config.feed(),
            fetched,
            delivered = fresh.len(),
            tip = self.window.newest(),
            "poll cycle complete"
        );

        Ok(fresh)
    }

    /// Resolves a single item by handle without touching the tip window.
    pub async fn lookup(&self, handle: &str) -> Result<A::Item, PollError> {
        self.accessor
            .fetch_by_handle(handle)
            .await
            .map_err(|source| PollError::Lookup {
                feed: self.config.feed().to_owned(),
                handle: handle.to_owned(),
                source,
            })
    }

    async fn fetch_tip(&mut self) -> Result<TipAdvance<A::Item>, PollError> {
        let query = PageQuery::newer_than(self.window.newest(), self.config.page_limit());
        let items = self
            .accessor
            .fetch_page(query)
            .await
            .map_err(|source| PollError::Fetch {
                feed: self.config.feed().to_owned(),
                source,
            })?;

        if items.is_empty() {
            return Ok(TipAdvance::Idle);
        }

        // Pages arrive newest first; the window is kept oldest first.
        if self.window.is_unseeded() {
            for item in items.iter().rev() {
                self.window.append(item.id());
            }
            self.telemetry.record_seeded(items.len() as u64);
            tracing::info!(
                feed = self.config.feed(),
                seeded = items.len(),
                tip = self.window.newest(),
                "seeded tip window from newest page"
            );
            return Ok(TipAdvance::Seeded(items.len()));
        }

        for item in items.iter().rev() {
            self.window.append(item.id());
        }

        Ok(TipAdvance::Advanced(items))
    }

    async fn fix_tip(&mut self) -> Result<(), PollError> {
        // A lone tip has no confirmed entry below it to check the gap against.
        if self.window.previous() == SENTINEL {
            tracing::trace!(
                feed = self.config.feed(),
                tip = self.window.newest(),
                "no confirmed entry below tip; repair skipped"
            );
            return Ok(());
        }

        let tip = self.window.newest().to_owned();
        let query = PageQuery::between(self.window.previous(), &tip, self.config.repair_limit());
        let gap = self
            .accessor
            .fetch_page(query)
            .await
            .map_err(|source| PollError::Repair {
                feed: self.config.feed().to_owned(),
                tip: tip.clone(),
                source,
            })?;

        if gap.is_empty() {
            tracing::trace!(feed = self.config.feed(), tip = %tip, "tip confirmed");
            return Ok(());
        }

        if let Some(shaved) = self.window.shave_newest() {
            self.telemetry.record_tip_retreat();
            tracing::debug!(
                feed = self.config.feed(),
                shaved = %shaved,
                tip = self.window.newest(),
                gap = gap.len(),
                "tip ahead of confirmed history; retreated by one"
            );
        }

        Ok(())
    }
}

/// Object-safe view of a [`FeedMonitor`] used by the [`Runner`](crate::Runner)
/// to drive monitors of different accessor types.
pub trait PollCycle: Send + 'static {
    fn feed(&self) -> &str;

    fn poll_interval(&self) -> Duration;

    /// Runs one cycle and returns the number of delivered items.
    fn run_cycle(&mut self) -> BoxFuture<'_, Result<usize, PollError>>;

    /// Waits for deliveries spawned by previous cycles.
    fn drain_deliveries(&self) -> BoxFuture<'_, ()>;
}

impl<A> PollCycle for FeedMonitor<A>
where
    A: FeedAccessor + 'static,
{
    fn feed(&self) -> &str {
        self.config.feed()
    }

    fn poll_interval(&self) -> Duration {
        self.config.poll_interval()
    }

    fn run_cycle(&mut self) -> BoxFuture<'_, Result<usize, PollError>> {
        Box::pin(async move { self.update().await.map(|items| items.len()) })
    }

    fn drain_deliveries(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.dispatcher.wait_idle())
    }
}
