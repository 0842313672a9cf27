use std::collections::VecDeque;
use std::sync::{Mutex, RwLock};

use anyhow::{anyhow, Result};
use feedtip::{FeedAccessor, FeedItem, PageQuery, Post};
use futures::future::BoxFuture;
use serde_json::Value;

/// Query observed by a feed double.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedQuery {
    pub after: String,
    pub before: String,
    pub limit: usize,
}

impl RecordedQuery {
    pub fn new(after: &str, before: &str, limit: usize) -> Self {
        Self {
            after: after.to_owned(),
            before: before.to_owned(),
            limit,
        }
    }
}

type Canned = Result<Vec<Post>, String>;

/// Accessor returning canned pages per call.
///
/// Queries with a `before` bound come from the repair script, all others from
/// the newest script. Exhausted scripts answer with empty pages.
#[derive(Default)]
pub struct ScriptedFeed {
    newest: Mutex<VecDeque<Canned>>,
    repair: Mutex<VecDeque<Canned>>,
    queries: Mutex<Vec<RecordedQuery>>,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_newest(&self, ids: &[&str]) {
        self.newest.lock().unwrap().push_back(Ok(posts(ids)));
    }

    pub fn fail_newest(&self, message: &str) {
        self.newest.lock().unwrap().push_back(Err(message.to_owned()));
    }

    pub fn push_repair(&self, ids: &[&str]) {
        self.repair.lock().unwrap().push_back(Ok(posts(ids)));
    }

    pub fn fail_repair(&self, message: &str) {
        self.repair.lock().unwrap().push_back(Err(message.to_owned()));
    }

    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.queries.lock().unwrap().clone()
    }
}

impl FeedAccessor for ScriptedFeed {
    type Item = Post;

    fn fetch_page<'a>(&'a self, query: PageQuery<'a>) -> BoxFuture<'a, Result<Vec<Post>>> {
        self.queries
            .lock()
            .unwrap()
            .push(RecordedQuery::new(query.after, query.before, query.limit));
        let script = if query.before.is_empty() {
            &self.newest
        } else {
            &self.repair
        };
        let next = script.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()));
        Box::pin(async move { next.map_err(|message| anyhow!(message)) })
    }

    fn fetch_by_handle<'a>(&'a self, handle: &'a str) -> BoxFuture<'a, Result<Post>> {
        Box::pin(async move { Ok(Post::new(handle)) })
    }
}

/// In-memory listing honouring cursor bounds, oldest entry first internally.
///
/// Pages bounded only by `after` return the entries closest to the cursor so a
/// monitor that falls behind catches up over several cycles.
#[derive(Default)]
pub struct ListingFeed {
    entries: RwLock<Vec<Post>>,
}

impl ListingFeed {
    pub fn with_posts(ids: &[&str]) -> Self {
        Self {
            entries: RwLock::new(posts(ids)),
        }
    }

    /// Loads a listing fixture shaped like `{"data":{"children":[{"data":{..}}]}}`,
    /// newest child first.
    pub fn from_listing_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        let children = value["data"]["children"]
            .as_array()
            .ok_or_else(|| anyhow!("listing fixture has no children"))?;
        let mut entries = children
            .iter()
            .map(|child| serde_json::from_value::<Post>(child["data"].clone()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.reverse();
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    pub fn publish(&self, id: &str) {
        self.entries.write().unwrap().push(Post::new(id));
    }

    pub fn remove(&self, id: &str) {
        self.entries.write().unwrap().retain(|post| post.id() != id);
    }

    fn position(entries: &[Post], id: &str) -> Option<usize> {
        entries.iter().position(|post| post.id() == id)
    }

    fn page(&self, query: PageQuery<'_>) -> Vec<Post> {
        let entries = self.entries.read().unwrap();
        let lower = if query.after.is_empty() {
            0
        } else {
            match Self::position(&entries, query.after) {
                Some(idx) => idx + 1,
                None => return Vec::new(),
            }
        };
        let upper = if query.before.is_empty() {
            entries.len()
        } else {
            match Self::position(&entries, query.before) {
                Some(idx) => idx,
                None => return Vec::new(),
            }
        };
        if lower >= upper {
            return Vec::new();
        }

        let span = &entries[lower..upper];
        let take = query.limit.min(span.len());
        let selected = if !query.after.is_empty() && query.before.is_empty() {
            &span[..take]
        } else {
            &span[span.len() - take..]
        };
        selected.iter().rev().cloned().collect()
    }
}

impl FeedAccessor for ListingFeed {
    type Item = Post;

    fn fetch_page<'a>(&'a self, query: PageQuery<'a>) -> BoxFuture<'a, Result<Vec<Post>>> {
        let page = self.page(query);
        Box::pin(async move { Ok(page) })
    }

    fn fetch_by_handle<'a>(&'a self, handle: &'a str) -> BoxFuture<'a, Result<Post>> {
        let found = self
            .entries
            .read()
            .unwrap()
            .iter()
            .find(|post| post.id() == handle)
            .cloned();
        Box::pin(async move { found.ok_or_else(|| anyhow!("no item with handle {handle}")) })
    }
}

pub fn posts(ids: &[&str]) -> Vec<Post> {
    ids.iter().map(|id| Post::new(*id)).collect()
}
