pub mod dispatch;
pub mod feed;
pub mod monitor;
pub mod runtime;

pub use dispatch::{Dispatcher, HandlerFuture, ItemHandler};
pub use feed::{FeedAccessor, FeedItem, PageQuery, Post};
pub use monitor::cycle::{FeedMonitor, PollCycle};
pub use monitor::error::{PollError, PollPhase};
pub use monitor::tip::{TipWindow, SENTINEL};
pub use runtime::config::{MonitorConfig, MonitorConfigBuilder, MonitorConfigParams};
pub use runtime::runner::Runner;
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
