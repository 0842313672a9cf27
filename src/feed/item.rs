use serde::{Deserialize, Serialize};

/// Entry type tracked by a [`FeedMonitor`](crate::FeedMonitor).
///
/// Only the identifier is inspected by the monitor. Everything else is payload
/// handed to the [`ItemHandler`](crate::ItemHandler) untouched.
pub trait FeedItem: Clone + Send + Sync + 'static {
    /// Stable identifier, unique within the feed. Ordering between identifiers
    /// is defined by feed position only, never by their lexical value.
    fn id(&self) -> &str;
}

/// Submission entry as returned by subreddit listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Fullname of the submission (`t3_...`).
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub created_utc: f64,
}

impl Post {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn is_self_post(&self) -> bool {
        self.url.is_none() || !self.selftext.is_empty()
    }
}

impl FeedItem for Post {
    fn id(&self) -> &str {
        &self.name
    }
}
