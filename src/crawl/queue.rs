// src/crawl/queue.rs
// =============================================================================
// The crawl frontier: internal pages waiting to be fetched.
//
// How it works:
// - enqueue() checks the visited set and inserts in one step, so a URL can
//   only ever be queued once, however many pages link to it
// - pop() hands out pages in breadth-first order
//
// "Visited" means fetched OR queued: once a URL is in the set it is never
// queued again. Cycles (a page linking back to the home page) end there.
//
// claim() covers pages reached through a redirect: the final URL becomes
// visited too, and a queued copy of it is dropped.
//
// The frontier is owned by the crawl loop (single owner), which is what
// makes the check-and-insert atomic with respect to concurrent discoveries.
//
// Rust concepts:
// - HashSet::insert returns false for duplicates: test and insert in one call
// - VecDeque: push_back / pop_front gives breadth-first order
// =============================================================================

use std::collections::{HashSet, VecDeque};
use url::Url;

use crate::checker::canonical_key;

/// An internal page waiting to be crawled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTask {
    pub url: Url,
    /// Canonical key (see checker::canonical_key)
    pub key: String,
    /// 0 for the base URL, +1 per link hop
    pub depth: usize,
    /// Page that linked here, None for the base URL
    pub referrer: Option<String>,
}

impl PageTask {
    pub fn seed(url: Url) -> Self {
        Self {
            key: canonical_key(&url),
            url,
            depth: 0,
            referrer: None,
        }
    }

    /// A page found by following a link on `parent`
    pub fn discovered(url: Url, parent: &PageTask) -> Self {
        Self {
            key: canonical_key(&url),
            url,
            depth: parent.depth + 1,
            referrer: Some(parent.url.to_string()),
        }
    }

    pub fn is_seed(&self) -> bool {
        self.depth == 0
    }
}

#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<PageTask>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `task` unless its URL was already queued or fetched.
    /// Returns true when it was queued.
    pub fn enqueue(&mut self, task: PageTask) -> bool {
        // insert() is both the membership test and the insertion
        if !self.visited.insert(task.key.clone()) {
            return false;
        }
        self.queue.push_back(task);
        true
    }

    /// Takes ownership of `key` for a fetch that reached it some other way
    /// (a redirect). Returns false when that page was already fetched or is
    /// being fetched; a copy still waiting in the queue is dropped instead.
    pub fn claim(&mut self, key: &str) -> bool {
        if self.visited.insert(key.to_string()) {
            return true;
        }
        match self.queue.iter().position(|task| task.key == key) {
            Some(index) => {
                self.queue.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn pop(&mut self) -> Option<PageTask> {
        self.queue.pop_front()
    }

    /// Pages still waiting (not counting ones being fetched)
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is VecDeque?
//    - A double-ended queue
//    - push_back() adds to the end, pop_front() takes from the start
//    - That is exactly breadth-first order
//
// 2. Why key the visited set by a String and not a Url?
//    - Two Urls can differ (trailing slash, fragment, host case) and
//      still be the same page
//    - canonical_key() folds those together
// -----------------------------------------------------------------------------
