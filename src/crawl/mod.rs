// src/crawl/mod.rs
// =============================================================================
// This module handles website crawling.
//
// Features:
// - Breadth-first traversal over an explicit queue + visited set
// - Internal pages are expanded, external URLs are only checked
// - Bounded number of concurrent requests
// - Optional deadline, after which a partial report is produced
//
// Rust concepts:
// - Async programming: For concurrent network requests
// - Collections: HashSet for tracking visited URLs, VecDeque for queue
// =============================================================================

mod crawler;
mod queue;

pub use crawler::{CrawlSettings, Crawler};
