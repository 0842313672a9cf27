use std::sync::Arc;
use std::time::Duration;

use crate::support::{
    feeds::{ListingFeed, ScriptedFeed},
    helpers::{
        init_tracing, wait_for_cycles, wait_for_delivered, wait_for_seeded, RecordingHandler,
    },
};
use anyhow::Result;
use feedtip::{FeedMonitor, MonitorConfig, Runner};
use tokio::time::{sleep, timeout};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const WAIT: Duration = Duration::from_secs(5);

fn config(feed: &str) -> Result<MonitorConfig> {
    MonitorConfig::builder()
        .feed(feed)
        .tip_window_size(16)
        .page_limit(8)
        .poll_interval(POLL_INTERVAL)
        .build()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn runner_delivers_new_items_per_feed() -> Result<()> {
    init_tracing();
    let rust_feed = Arc::new(ListingFeed::with_posts(&["r1", "r2"]));
    let go_feed = Arc::new(ListingFeed::with_posts(&["g1"]));
    let rust_handler = RecordingHandler::default();
    let go_handler = RecordingHandler::default();

    let mut runner = Runner::new().with_metrics_interval(Duration::from_millis(50))?;
    runner.add_monitor(FeedMonitor::new(
        config("/r/rust/new")?,
        Arc::clone(&rust_feed),
        rust_handler.clone(),
    ));
    runner.add_monitor(FeedMonitor::new(
        config("/r/golang/new")?,
        Arc::clone(&go_feed),
        go_handler.clone(),
    ));
    assert_eq!(runner.monitor_count(), 2);

    let telemetry = runner.telemetry();
    runner.start().await?;
    assert!(runner.is_running());
    wait_for_seeded(&telemetry, 3, WAIT).await?;

    rust_feed.publish("r3");
    rust_feed.publish("r4");
    go_feed.publish("g2");

    wait_for_delivered(&rust_handler, 2, WAIT).await?;
    wait_for_delivered(&go_handler, 1, WAIT).await?;
    runner.stop().await?;

    assert!(!runner.is_running());
    assert_eq!(runner.monitor_count(), 2);
    assert_eq!(
        rust_handler.sorted_names(),
        vec!["r3".to_owned(), "r4".to_owned()]
    );
    assert_eq!(go_handler.names(), vec!["g2".to_owned()]);
    assert_eq!(telemetry.snapshot().items_dispatched, 3);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_cycles_are_retried_on_next_tick() -> Result<()> {
    init_tracing();
    let feed = Arc::new(ScriptedFeed::new());
    feed.fail_newest("upstream unavailable");
    feed.fail_newest("upstream unavailable");
    feed.push_newest(&["p1"]);
    feed.push_newest(&["p2"]);
    let handler = RecordingHandler::default();

    let mut runner = Runner::new();
    runner.add_monitor(FeedMonitor::new(
        config("/r/flaky/new")?,
        Arc::clone(&feed),
        handler.clone(),
    ));
    let telemetry = runner.telemetry();

    runner.start().await?;
    wait_for_delivered(&handler, 1, WAIT).await?;
    runner.stop().await?;

    let snapshot = telemetry.snapshot();
    assert_eq!(snapshot.fetch_failures, 2);
    assert_eq!(snapshot.items_seeded, 1);
    assert_eq!(handler.names(), vec!["p2".to_owned()]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn runner_can_restart_and_keeps_tip() -> Result<()> {
    init_tracing();
    let feed = Arc::new(ListingFeed::with_posts(&["a"]));
    let handler = RecordingHandler::default();

    let mut runner = Runner::new();
    runner.add_monitor(FeedMonitor::new(
        config("/r/restart/new")?,
        Arc::clone(&feed),
        handler.clone(),
    ));
    let telemetry = runner.telemetry();

    runner.start().await?;
    wait_for_cycles(&telemetry, 1, WAIT).await?;
    runner.stop().await?;

    feed.publish("b");
    runner.start().await?;
    wait_for_delivered(&handler, 1, WAIT).await?;
    runner.stop().await?;

    assert_eq!(handler.names(), vec!["b".to_owned()]);
    assert_eq!(telemetry.snapshot().items_seeded, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancellation_token_ends_run_until_ctrl_c() -> Result<()> {
    init_tracing();
    let feed = Arc::new(ListingFeed::with_posts(&["a"]));
    let mut runner = Runner::new();
    runner.add_monitor(FeedMonitor::new(
        config("/r/cancel/new")?,
        feed,
        RecordingHandler::default(),
    ));

    let token = runner.cancellation_token();
    tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    timeout(WAIT, runner.run_until_ctrl_c())
        .await
        .expect("runner should stop once the token is cancelled")?;
    assert!(!runner.is_running());
    assert!(!runner.cancellation_token().is_cancelled());
    Ok(())
}
