use thiserror::Error;

/// Phase of a poll cycle that produced a [`PollError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Fetch,
    Repair,
    Lookup,
}

/// Failure surfaced by [`FeedMonitor`](crate::FeedMonitor). Accessor errors are
/// wrapped verbatim; nothing is retried inside the monitor.
#[derive(Debug, Error)]
pub enum PollError {
    /// The newest-page request failed. The tip window is untouched.
    #[error("failed to fetch newest items for feed {feed}")]
    Fetch {
        feed: String,
        #[source]
        source: anyhow::Error,
    },

    /// The tip confirmation request failed. Items delivered earlier in the same
    /// cycle stay delivered.
    #[error("failed to confirm tip {tip:?} for feed {feed}")]
    Repair {
        feed: String,
        tip: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to look up {handle:?} in feed {feed}")]
    Lookup {
        feed: String,
        handle: String,
        #[source]
        source: anyhow::Error,
    },
}

impl PollError {
    pub fn phase(&self) -> PollPhase {
        match self {
            PollError::Fetch { .. } => PollPhase::Fetch,
            PollError::Repair { .. } => PollPhase::Repair,
            PollError::Lookup { .. } => PollPhase::Lookup,
        }
    }

    pub fn feed(&self) -> &str {
        match self {
            PollError::Fetch { feed, .. }
            | PollError::Repair { feed, .. }
            | PollError::Lookup { feed, .. } => feed,
        }
    }
}
