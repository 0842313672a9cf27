use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Default interval used by the metrics reporter task.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(5);

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Lightweight rolling counters shared by monitors, dispatchers, and the runner.
#[derive(Default, Debug)]
pub struct Telemetry {
    cycles_completed: AtomicU64,
    fetch_failures: AtomicU64,
    repair_failures: AtomicU64,
    items_seeded: AtomicU64,
    items_dispatched: AtomicU64,
    handler_failures: AtomicU64,
    tip_retreats: AtomicU64,
}

impl Telemetry {
    pub fn record_cycle_completed(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_repair_failure(&self) {
        self.repair_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_seeded(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.items_seeded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_dispatched(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.items_dispatched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tip_retreat(&self) {
        self.tip_retreats.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            repair_failures: self.repair_failures.load(Ordering::Relaxed),
            items_seeded: self.items_seeded.load(Ordering::Relaxed),
            items_dispatched: self.items_dispatched.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            tip_retreats: self.tip_retreats.load(Ordering::Relaxed),
        }
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Relaxed)
    }

    pub fn items_dispatched(&self) -> u64 {
        self.items_dispatched.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub cycles_completed: u64,
    pub fetch_failures: u64,
    pub repair_failures: u64,
    pub items_seeded: u64,
    pub items_dispatched: u64,
    pub handler_failures: u64,
    pub tip_retreats: u64,
}

/// Spawns a background task that periodically logs cycle and delivery counters.
pub(crate) fn spawn_metrics_reporter(
    telemetry: Arc<Telemetry>,
    shutdown: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_snapshot = telemetry.snapshot();
        let mut last_tick = Instant::now();

        loop {
            select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(target: "feedtip::metrics", "metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let current_snapshot = telemetry.snapshot();
                    let dispatched_delta = current_snapshot
                        .items_dispatched
                        .saturating_sub(last_snapshot.items_dispatched);
                    let elapsed = last_tick.elapsed().as_secs_f64();
                    let throughput = if elapsed <= f64::EPSILON {
                        0.0
                    } else {
                        dispatched_delta as f64 / elapsed
                    };

                    tracing::info!(
                        target: "feedtip::metrics",
                        throughput = format!("{throughput:.2}"),
                        cycles = current_snapshot.cycles_completed,
                        dispatched = current_snapshot.items_dispatched,
                        seeded = current_snapshot.items_seeded,
                        tip_retreats = current_snapshot.tip_retreats,
                        fetch_failures = current_snapshot.fetch_failures,
                        repair_failures = current_snapshot.repair_failures,
                        handler_failures = current_snapshot.handler_failures,
                        "runtime metrics snapshot"
                    );

                    last_snapshot = current_snapshot;
                    last_tick = Instant::now();
                }
            }
        }
    })
}
