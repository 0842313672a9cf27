//! Boundary between the monitor and the transport that serves feed pages.
//! Houses `PageQuery` and the `FeedAccessor` trait consumed by monitors.

use crate::feed::item::FeedItem;
use anyhow::Result;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Cursor bounds for one page request. An empty cursor leaves that side
/// unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery<'a> {
    /// Only items newer than this identifier.
    pub after: &'a str,
    /// Only items older than this identifier.
    pub before: &'a str,
    /// Maximum number of items in the page.
    pub limit: usize,
}

impl<'a> PageQuery<'a> {
    /// Items newer than `after`, with no upper bound.
    pub fn newer_than(after: &'a str, limit: usize) -> Self {
        Self {
            after,
            before: "",
            limit,
        }
    }

    /// Items strictly between `after` and `before`.
    pub fn between(after: &'a str, before: &'a str, limit: usize) -> Self {
        Self {
            after,
            before,
            limit,
        }
    }
}

/// Source of feed pages.
///
/// Implementations own transport concerns (HTTP, auth, rate limits, retries,
/// timeouts). Pages are returned newest-first and must contain only items
/// strictly between the query bounds.
pub trait FeedAccessor: Send + Sync {
    type Item: FeedItem;

    fn fetch_page<'a>(&'a self, query: PageQuery<'a>) -> BoxFuture<'a, Result<Vec<Self::Item>>>;

    fn fetch_by_handle<'a>(&'a self, handle: &'a str) -> BoxFuture<'a, Result<Self::Item>>;
}

impl<A: FeedAccessor + ?Sized> FeedAccessor for Arc<A> {
    type Item = A::Item;

    fn fetch_page<'a>(&'a self, query: PageQuery<'a>) -> BoxFuture<'a, Result<Vec<Self::Item>>> {
        (**self).fetch_page(query)
    }

    fn fetch_by_handle<'a>(&'a self, handle: &'a str) -> BoxFuture<'a, Result<Self::Item>> {
        (**self).fetch_by_handle(handle)
    }
}
