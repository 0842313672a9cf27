use crate::feed::FeedAccessor;
use crate::monitor::cycle::{FeedMonitor, PollCycle};
use crate::runtime::telemetry::{self, Telemetry};
use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Drives any number of independent feed monitors on a fixed cadence and
/// handles OS signals for graceful shutdowns.
///
/// Every monitor runs on its own task, so cycles of one monitor never overlap
/// and no tip window is shared between feeds.
pub struct Runner {
    monitors: Vec<Box<dyn PollCycle>>,
    telemetry: Arc<Telemetry>,
    metrics_interval: Duration,
    shutdown: CancellationToken,
    run: Option<RunHandles>,
}

struct RunHandles {
    run_token: CancellationToken,
    monitor_handles: Vec<JoinHandle<Box<dyn PollCycle>>>,
    metrics_handle: JoinHandle<()>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self {
            monitors: Vec::new(),
            telemetry: Arc::new(Telemetry::default()),
            metrics_interval: telemetry::DEFAULT_METRICS_INTERVAL,
            shutdown: CancellationToken::new(),
            run: None,
        }
    }

    /// Sets how often the metrics reporter logs a telemetry snapshot.
    pub fn with_metrics_interval(mut self, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            bail!("metrics_interval must be greater than zero");
        }
        self.metrics_interval = interval;
        Ok(self)
    }

    /// Registers a monitor. Its counters are routed into the runner's telemetry.
    /// Monitors added while running are picked up by the next `start`.
    pub fn add_monitor<A>(&mut self, monitor: FeedMonitor<A>)
    where
        A: FeedAccessor + 'static,
    {
        let monitor = monitor.with_telemetry(Arc::clone(&self.telemetry));
        self.monitors.push(Box::new(monitor));
    }

    pub fn monitor_count(&self) -> usize {
        self.monitors.len()
            + self
                .run
                .as_ref()
                .map(|run| run.monitor_handles.len())
                .unwrap_or(0)
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        Arc::clone(&self.telemetry)
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Returns a clone of the root shutdown token so external callers can integrate
    /// with their own signal handlers or cancellation strategies.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawns one poll loop per registered monitor plus the metrics reporter.
    pub async fn start(&mut self) -> Result<()> {
        if self.run.is_some() {
            return Ok(());
        }

        if self.monitors.is_empty() {
            bail!("no feed monitors registered");
        }

        let run_token = self.shutdown.child_token();
        let monitor_handles = self
            .monitors
            .drain(..)
            .map(|monitor| spawn_poll_loop(monitor, run_token.clone()))
            .collect::<Vec<_>>();
        let metrics_handle = telemetry::spawn_metrics_reporter(
            Arc::clone(&self.telemetry),
            run_token.clone(),
            self.metrics_interval,
        );

        tracing::info!(monitors = monitor_handles.len(), "runner started");
        self.run = Some(RunHandles {
            run_token,
            monitor_handles,
            metrics_handle,
        });
        Ok(())
    }

    /// Stops every poll loop, then waits for in-flight deliveries. Monitors
    /// keep their tip windows and can be started again.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(run) = self.run.take() else {
            return Ok(());
        };

        run.run_token.cancel();
        let mut panicked = 0usize;
        for handle in run.monitor_handles {
            match handle.await {
                Ok(monitor) => {
                    monitor.drain_deliveries().await;
                    self.monitors.push(monitor);
                }
                Err(err) => {
                    panicked += 1;
                    tracing::warn!(error = %err, "feed monitor task panicked");
                }
            }
        }

        if let Err(err) = run.metrics_handle.await {
            tracing::warn!(error = %err, "metrics reporter task panicked");
        }

        if self.shutdown.is_cancelled() {
            self.shutdown = CancellationToken::new();
        }

        if panicked > 0 {
            bail!("{panicked} feed monitor task(s) panicked");
        }

        tracing::info!(monitors = self.monitors.len(), "runner stopped");
        Ok(())
    }

    /// Runs until a Ctrl-C (SIGINT) is received or the shutdown token is cancelled elsewhere.
    pub async fn run_until_ctrl_c(&mut self) -> Result<()> {
        self.start().await?;
        tracing::info!("runner started; waiting for Ctrl-C (SIGINT) to initiate shutdown");

        tokio::select! {
            _ = signal::ctrl_c() => {
                tracing::info!("Ctrl-C received; shutting down runner");
            }
            _ = self.shutdown.cancelled() => {
                tracing::info!("runner shutdown token cancelled");
            }
        }

        self.shutdown.cancel();
        self.stop().await
    }
}

fn spawn_poll_loop(
    mut monitor: Box<dyn PollCycle>,
    shutdown: CancellationToken,
) -> JoinHandle<Box<dyn PollCycle>> {
    tokio::spawn(async move {
        let mut ticker = interval(monitor.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    break;
                }
                _ = ticker.tick() => {
                    match monitor.run_cycle().await {
                        Ok(delivered) => {
                            if delivered > 0 {
                                tracing::info!(feed = monitor.feed(), delivered, "delivered new items");
                            }
                        }
                        Err(err) => {
                            tracing::warn!(
                                feed = monitor.feed(),
                                phase = ?err.phase(),
                                error = %err,
                                "poll cycle failed; retrying on next tick"
                            );
                        }
                    }
                }
            }
        }

        tracing::info!(feed = monitor.feed(), "feed monitor stopped");
        monitor
    })
}
