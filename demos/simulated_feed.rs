use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use feedtip::{
    FeedAccessor, FeedItem, FeedMonitor, HandlerFuture, ItemHandler, MonitorConfig, PageQuery,
    Post, Runner,
};
use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio::time::sleep;

const DEFAULT_FEED: &str = "/r/simulated/new";
const DEFAULT_POLL_MS: u64 = 500;
const DEFAULT_PUBLISH_MS: u64 = 200;
const DEFAULT_LOG_DIRECTIVE: &str = "info";

#[tokio::main]
async fn main() -> Result<()> {
    init_example_tracing();

    let args = ExampleArgs::from_env()?;
    let feed = Arc::new(SimulatedFeed::with_backlog(25));
    let publisher = spawn_publisher(Arc::clone(&feed), args.publish_interval);

    let config = MonitorConfig::builder()
        .feed(args.feed.clone())
        .poll_interval(args.poll_interval)
        .build()?;
    let mut runner = Runner::new();
    runner.add_monitor(FeedMonitor::new(config, Arc::clone(&feed), PrintingHandler));

    let result = runner.run_until_ctrl_c().await;
    publisher.abort();

    let snapshot = runner.telemetry().snapshot();
    println!(
        "published {} posts; delivered {} ({} seeded, {} tip retreats)",
        feed.published(),
        snapshot.items_dispatched,
        snapshot.items_seeded,
        snapshot.tip_retreats,
    );
    result
}

fn init_example_tracing() {
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", DEFAULT_LOG_DIRECTIVE);
    }
    feedtip::init_tracing();
}

struct ExampleArgs {
    feed: String,
    poll_interval: Duration,
    publish_interval: Duration,
}

impl ExampleArgs {
    fn from_env() -> Result<Self> {
        Ok(Self {
            feed: env::var("FEEDTIP_FEED").unwrap_or_else(|_| DEFAULT_FEED.to_owned()),
            poll_interval: Duration::from_millis(read_env_u64("FEEDTIP_POLL_MS", DEFAULT_POLL_MS)?),
            publish_interval: Duration::from_millis(read_env_u64(
                "FEEDTIP_PUBLISH_MS",
                DEFAULT_PUBLISH_MS,
            )?),
        })
    }
}

fn read_env_u64(key: &str, default: u64) -> Result<u64> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{key} must be an unsigned integer")),
        Err(_) => Ok(default),
    }
}

struct PrintingHandler;

impl ItemHandler<Post> for PrintingHandler {
    fn handle(&self, item: Post) -> HandlerFuture {
        Box::pin(async move {
            println!("new post {}: {}", item.id(), item.title);
            Ok(())
        })
    }
}

/// Listing that grows on a timer, oldest entry first.
struct SimulatedFeed {
    entries: RwLock<Vec<Post>>,
    counter: AtomicU64,
}

impl SimulatedFeed {
    fn with_backlog(count: u64) -> Self {
        let feed = Self {
            entries: RwLock::new(Vec::new()),
            counter: AtomicU64::new(0),
        };
        for _ in 0..count {
            feed.publish();
        }
        feed
    }

    fn publish(&self) {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        let post = Post::new(format!("t3_{seq:06x}")).with_title(format!("simulated post #{seq}"));
        if let Ok(mut entries) = self.entries.write() {
            entries.push(post);
        }
    }

    fn published(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    fn page(&self, query: PageQuery<'_>) -> Result<Vec<Post>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("simulated feed lock poisoned"))?;
        let position = |id: &str| entries.iter().position(|post| post.id() == id);

        let lower = match query.after {
            "" => 0,
            id => match position(id) {
                Some(idx) => idx + 1,
                None => return Ok(Vec::new()),
            },
        };
        let upper = match query.before {
            "" => entries.len(),
            id => match position(id) {
                Some(idx) => idx,
                None => return Ok(Vec::new()),
            },
        };
        if lower >= upper {
            return Ok(Vec::new());
        }

        let span = &entries[lower..upper];
        let take = query.limit.min(span.len());
        let selected = if query.before.is_empty() && !query.after.is_empty() {
            &span[..take]
        } else {
            &span[span.len() - take..]
        };
        Ok(selected.iter().rev().cloned().collect())
    }
}

impl FeedAccessor for SimulatedFeed {
    type Item = Post;

    fn fetch_page<'a>(&'a self, query: PageQuery<'a>) -> BoxFuture<'a, Result<Vec<Post>>> {
        let page = self.page(query);
        Box::pin(async move { page })
    }

    fn fetch_by_handle<'a>(&'a self, handle: &'a str) -> BoxFuture<'a, Result<Post>> {
        let found = self
            .entries
            .read()
            .map_err(|_| anyhow!("simulated feed lock poisoned"))
            .and_then(|entries| {
                entries
                    .iter()
                    .find(|post| post.id() == handle)
                    .cloned()
                    .ok_or_else(|| anyhow!("no post {handle}"))
            });
        Box::pin(async move { found })
    }
}

fn spawn_publisher(feed: Arc<SimulatedFeed>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            sleep(every).await;
            feed.publish();
        }
    })
}
