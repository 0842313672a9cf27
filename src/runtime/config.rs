use anyhow::{bail, Context, Result};
use std::time::Duration;

pub const DEFAULT_TIP_WINDOW_SIZE: usize = 200;
pub const DEFAULT_PAGE_LIMIT: usize = 100;
pub const DEFAULT_REPAIR_LIMIT: usize = 1;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Runtime configuration for a single feed monitor.
///
/// All instances must be constructed via [`MonitorConfig::builder`] or [`MonitorConfig::new`]
/// so invariants are validated before any consumer observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    feed: String,
    tip_window_size: usize,
    page_limit: usize,
    repair_limit: usize,
    poll_interval: Duration,
}

pub struct MonitorConfigParams {
    pub feed: String,
    pub tip_window_size: usize,
    pub page_limit: usize,
    pub repair_limit: usize,
    pub poll_interval: Duration,
}

impl MonitorConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> MonitorConfigBuilder {
        MonitorConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    ///
    /// Prefer [`MonitorConfig::builder`] when most values use defaults.
    pub fn new(params: MonitorConfigParams) -> Result<Self> {
        let MonitorConfigParams {
            feed,
            tip_window_size,
            page_limit,
            repair_limit,
            poll_interval,
        } = params;

        let config = Self {
            feed: feed.trim().to_owned(),
            tip_window_size,
            page_limit,
            repair_limit,
            poll_interval,
        };

        config.validate()?;
        Ok(config)
    }

    /// Label of the monitored listing (for example `/r/rust/new`).
    pub fn feed(&self) -> &str {
        &self.feed
    }

    /// Maximum number of identifiers kept in the tip window.
    pub fn tip_window_size(&self) -> usize {
        self.tip_window_size
    }

    /// Page size requested when fetching items newer than the tip.
    pub fn page_limit(&self) -> usize {
        self.page_limit
    }

    /// Page size requested when confirming the tip.
    pub fn repair_limit(&self) -> usize {
        self.repair_limit
    }

    /// Delay between two poll cycles when driven by a [`Runner`](crate::Runner).
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        if self.feed.trim().is_empty() {
            bail!("feed cannot be empty");
        }

        if self.tip_window_size == 0 {
            bail!("tip_window_size must be greater than 0");
        }

        if self.page_limit == 0 {
            bail!("page_limit must be greater than 0");
        }

        if self.repair_limit == 0 {
            bail!("repair_limit must be greater than 0");
        }

        if self.poll_interval.is_zero() {
            bail!("poll_interval must be greater than 0");
        }

        if self.tip_window_size < self.page_limit {
            bail!(
                "tip_window_size ({}) must be at least page_limit ({}) so a full page of new \
                 items fits in the window",
                self.tip_window_size,
                self.page_limit,
            );
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MonitorConfigBuilder {
    feed: Option<String>,
    tip_window_size: Option<usize>,
    page_limit: Option<usize>,
    repair_limit: Option<usize>,
    poll_interval: Option<Duration>,
}

impl MonitorConfigBuilder {
    pub fn feed(mut self, feed: impl Into<String>) -> Self {
        self.feed = Some(feed.into());
        self
    }

    pub fn tip_window_size(mut self, size: usize) -> Self {
        self.tip_window_size = Some(size);
        self
    }

    pub fn page_limit(mut self, limit: usize) -> Self {
        self.page_limit = Some(limit);
        self
    }

    pub fn repair_limit(mut self, limit: usize) -> Self {
        self.repair_limit = Some(limit);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn build(self) -> Result<MonitorConfig> {
        let params = MonitorConfigParams {
            feed: self.feed.context("feed is required")?,
            tip_window_size: self.tip_window_size.unwrap_or(DEFAULT_TIP_WINDOW_SIZE),
            page_limit: self.page_limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            repair_limit: self.repair_limit.unwrap_or(DEFAULT_REPAIR_LIMIT),
            poll_interval: self
                .poll_interval
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS)),
        };

        MonitorConfig::new(params)
    }
}
