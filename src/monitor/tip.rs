//! Tip window shared by the fetch and repair steps of a poll cycle.

use std::collections::VecDeque;

/// Placeholder occupying a window that has not observed any item yet.
pub const SENTINEL: &str = "";

/// Sliding window of recently delivered identifiers, oldest first.
///
/// The newest entry is the polling cursor. The window is never empty: before
/// any item has been seen it holds the [`SENTINEL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipWindow {
    limit: usize,
    items: VecDeque<String>,
}

impl TipWindow {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        let mut items = VecDeque::with_capacity(limit);
        items.push_back(SENTINEL.to_owned());
        Self { limit, items }
    }

    /// Builds a window from identifiers ordered oldest first. Only the newest
    /// `limit` entries are kept; an empty input yields the sentinel window.
    pub fn from_entries<I, S>(limit: usize, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut window = Self::new(limit);
        let mut seeded = false;
        for entry in entries {
            if !seeded {
                window.items.clear();
                seeded = true;
            }
            window.append(entry);
        }
        window
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// True while the window holds nothing but the sentinel.
    pub fn is_unseeded(&self) -> bool {
        self.items.len() == 1 && self.newest() == SENTINEL
    }

    pub fn newest(&self) -> &str {
        self.items.back().map(String::as_str).unwrap_or(SENTINEL)
    }

    /// Entry right before the newest one, used as the lower bound when
    /// confirming the tip. Returns the sentinel when there is none.
    pub fn previous(&self) -> &str {
        self.items
            .len()
            .checked_sub(2)
            .and_then(|idx| self.items.get(idx))
            .map(String::as_str)
            .unwrap_or(SENTINEL)
    }

    /// Appends `id` as the newest entry, evicting the oldest one at capacity.
    pub fn append(&mut self, id: impl Into<String>) {
        if self.items.len() >= self.limit {
            self.items.pop_front();
        }
        self.items.push_back(id.into());
    }

    /// Retreats the tip by one entry and returns the removed identifier.
    ///
    /// A lone remaining entry collapses to the sentinel, which is never removed.
    pub fn shave_newest(&mut self) -> Option<String> {
        if self.items.len() > 1 {
            return self.items.pop_back();
        }

        match self.items.back_mut() {
            Some(last) if last != SENTINEL => Some(std::mem::take(last)),
            _ => None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|existing| existing == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }
}
