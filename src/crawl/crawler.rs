// src/crawl/crawler.rs
// =============================================================================
// This module drives the crawl.
//
// How it works:
// 1. The base URL is queued on the frontier
// 2. The loop keeps up to `max_connections` fetches in flight: queued pages
//    first, then pending link/image checks
// 3. A fetched internal page is assessed like any other link, then its
//    links and images are extracted and classified:
//    - internal page links are queued on the frontier (once)
//    - everything else is queued for a check (once)
//    - every reference adds its page to the target's referrer list
//    A page reached through a redirect counts once, under the URL it
//    landed on, however many URLs redirect there
// 4. When nothing is queued or in flight, the report is finalized
//
// All shared state (frontier, aggregator, pending checks) belongs to the
// loop itself. The in-flight futures only own what they fetch, so there is
// no lock to get wrong: a URL is queued and checked at most once because
// only one place ever decides that.
//
// Deadline: when it expires, everything in flight is dropped (which cancels
// the requests), and the report is finalized from what was collected,
// flagged as a partial run.
//
// Rust concepts:
// - FuturesUnordered: many futures polled together, yielded as they finish
// - BoxFuture<'static, _>: futures that own everything they use
// - tokio::time::timeout_at: race a future against an instant
// =============================================================================

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::queue::{Frontier, PageTask};
use crate::checker::{
    canonical_key, extract_references, normalize, Classification, FetchMode, FetchOutcome, Fetcher, LinkCheckResult,
    Reference, Scope, TargetKey, TargetKind, Validator,
};
use crate::error::{RunError, TransportError};
use crate::report::{Aggregator, Report};

/// Knobs for one crawl.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// How internal pages are fetched (Static or Rendered)
    pub page_mode: FetchMode,
    /// Upper bound on concurrent outbound requests
    pub max_connections: usize,
    /// Wall-clock budget for the whole run
    pub deadline: Option<Duration>,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            page_mode: FetchMode::Static,
            max_connections: 8,
            deadline: None,
        }
    }
}

pub struct Crawler {
    base_url: Url,
    scope: Scope,
    settings: CrawlSettings,
    fetcher: Arc<dyn Fetcher>,
    validator: Arc<Validator>,
}

// A link or image waiting to be checked
#[derive(Debug)]
struct CheckJob {
    url: Url,
    kind: TargetKind,
    key: TargetKey,
}

enum Work {
    Page(PageTask),
    Check(CheckJob),
}

// What an in-flight future hands back to the loop
enum Done {
    Page {
        task: PageTask,
        fetched: Result<FetchOutcome, TransportError>,
    },
    Check(LinkCheckResult),
}

// Everything the loop mutates
struct CrawlState {
    frontier: Frontier,
    aggregator: Aggregator,
    checks: VecDeque<CheckJob>,
    // Assessments of crawled pages, by canonical key, for links found later
    pages: HashMap<String, LinkCheckResult>,
    // Pages counted and expanded, keyed by where the fetch landed
    crawled: HashSet<String>,
}

impl CrawlState {
    fn next_work(&mut self) -> Option<Work> {
        if let Some(task) = self.frontier.pop() {
            return Some(Work::Page(task));
        }
        self.checks.pop_front().map(Work::Check)
    }
}

impl Crawler {
    pub fn new(
        base_url: Url,
        scope: Scope,
        settings: CrawlSettings,
        fetcher: Arc<dyn Fetcher>,
        validator: Arc<Validator>,
    ) -> Self {
        Self {
            base_url: normalize(base_url),
            scope,
            settings,
            fetcher,
            validator,
        }
    }

    /// Crawls the site and returns the sealed report.
    ///
    /// Only a base URL that can't be fetched is an error; every other
    /// failure ends up in the report.
    pub async fn run(&self) -> Result<Report, RunError> {
        let mut state = CrawlState {
            frontier: Frontier::new(),
            aggregator: Aggregator::new(&self.base_url),
            checks: VecDeque::new(),
            pages: HashMap::new(),
            crawled: HashSet::new(),
        };
        state.frontier.enqueue(PageTask::seed(self.base_url.clone()));

        tracing::info!(
            base_url = %self.base_url,
            max_connections = self.settings.max_connections,
            deadline = ?self.settings.deadline,
            "starting crawl"
        );

        let deadline = self
            .settings
            .deadline
            .map(|budget| tokio::time::Instant::now() + budget);
        let max_connections = self.settings.max_connections.max(1);
        let mut in_flight: FuturesUnordered<BoxFuture<'static, Done>> = FuturesUnordered::new();

        loop {
            while in_flight.len() < max_connections {
                match state.next_work() {
                    Some(work) => in_flight.push(self.start(work, &state)),
                    None => break,
                }
            }

            let next = match deadline {
                Some(at) => match tokio::time::timeout_at(at, in_flight.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        // Nothing else is started before the base URL lands
                        if state.crawled.is_empty() {
                            return Err(RunError::BaseUnreachable {
                                url: self.base_url.to_string(),
                                reason: "deadline expired before the base URL answered".to_string(),
                            });
                        }
                        tracing::warn!(
                            in_flight = in_flight.len(),
                            queued_pages = state.frontier.pending(),
                            queued_checks = state.checks.len(),
                            "deadline reached, finalizing partial report"
                        );
                        state.aggregator.mark_partial();
                        break;
                    }
                },
                None => in_flight.next().await,
            };

            match next {
                Some(Done::Page { task, fetched }) => self.on_page(&mut state, task, fetched)?,
                Some(Done::Check(result)) => state.aggregator.record(result),
                // Nothing in flight and nothing left to start
                None => break,
            }
        }

        // Dropping the futures abandons whatever was still running
        drop(in_flight);

        let report = state.aggregator.finalize();
        tracing::info!(
            pages = report.pages_crawled,
            links = report.links_checked,
            images = report.images_checked,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            partial = report.partial_run,
            "crawl finished"
        );
        Ok(report)
    }

    fn start(&self, work: Work, state: &CrawlState) -> BoxFuture<'static, Done> {
        match work {
            Work::Page(task) => {
                let fetcher = Arc::clone(&self.fetcher);
                let mode = self.settings.page_mode;
                Box::pin(async move {
                    tracing::debug!(url = %task.url, depth = task.depth, referrer = ?task.referrer, "fetching page");
                    let fetched = fetcher.fetch(&task.url, mode).await;
                    Done::Page { task, fetched }
                })
            }
            Work::Check(job) => {
                let validator = Arc::clone(&self.validator);
                let referrers = state.aggregator.referrers(&job.key);
                Box::pin(async move { Done::Check(validator.validate(&job.url, job.kind, referrers).await) })
            }
        }
    }

    fn on_page(
        &self,
        state: &mut CrawlState,
        task: PageTask,
        fetched: Result<FetchOutcome, TransportError>,
    ) -> Result<(), RunError> {
        if task.is_seed() {
            let failure = match &fetched {
                Err(e) => Some(e.to_string()),
                Ok(outcome) if !outcome.is_success() => Some(format!("HTTP {}", outcome.status)),
                Ok(_) => None,
            };
            if let Some(reason) = failure {
                return Err(RunError::BaseUnreachable {
                    url: task.url.to_string(),
                    reason,
                });
            }
        }

        // After a redirect the page is the one the fetch landed on
        let landed = match &fetched {
            Ok(outcome)
                if outcome.is_success() && self.scope.classify(&outcome.final_url) == Classification::Internal =>
            {
                Some(normalize(outcome.final_url.clone()))
            }
            _ => None,
        };
        let page_key = landed.as_ref().map(canonical_key).unwrap_or_else(|| task.key.clone());
        let redirected = page_key != task.key;
        if redirected {
            state.frontier.claim(&page_key);
        }
        let first_visit = state.crawled.insert(page_key.clone());
        if first_visit {
            state.aggregator.page_crawled();
        }

        // The page fetch doubles as the check of every link pointing here
        let key = TargetKey::new(&task.url, TargetKind::PageLink);
        let assessment = self
            .validator
            .assess_page(&task.url, state.aggregator.referrers(&key), &fetched);
        if state.aggregator.is_known(&key) {
            state.aggregator.record(assessment.clone());
        }
        if assessment.is_error() {
            // Nothing to extract from a page that didn't load
            tracing::warn!(url = %task.url, depth = task.depth, referrer = ?task.referrer, "page unreachable");
        }

        // Links to the redirect target reuse this fetch too
        if let Some(final_url) = landed.clone().filter(|_| redirected) {
            let alias = LinkCheckResult {
                url: final_url,
                referrers: Vec::new(),
                ..assessment.clone()
            };
            if state.aggregator.is_known(&alias.key()) {
                state.aggregator.record(alias.clone());
            }
            state.pages.entry(page_key.clone()).or_insert(alias);
        }
        state.pages.insert(task.key.clone(), assessment);

        if !first_visit {
            tracing::debug!(url = %task.url, page = %page_key, "landed on a page already crawled");
            return Ok(());
        }

        // References found here belong to the page the redirect landed on
        let parent = match landed {
            Some(url) if redirected => PageTask { url, key: page_key, ..task },
            _ => task,
        };

        let outcome = match fetched {
            Ok(outcome) if outcome.is_success() => outcome,
            _ => return Ok(()),
        };

        if self.scope.classify(&outcome.final_url) != Classification::Internal {
            tracing::debug!(url = %parent.url, final_url = %outcome.final_url, "redirected off-site, not expanding");
            return Ok(());
        }

        let body = match outcome.body.as_deref() {
            Some(body) => body,
            None => return Ok(()),
        };

        let references = extract_references(body, &outcome.final_url);
        tracing::debug!(url = %parent.url, count = references.len(), "extracted references");
        for reference in references {
            self.discover(state, &parent, reference);
        }
        Ok(())
    }

    fn discover(&self, state: &mut CrawlState, page: &PageTask, reference: Reference) {
        let class = self.scope.classify(&reference.url);
        if class == Classification::Excluded {
            return;
        }

        let key = TargetKey::new(&reference.url, reference.kind);
        if !state.aggregator.discover(&key, page.url.as_str()) {
            // Already scheduled, the referrer has been noted
            return;
        }

        if reference.kind == TargetKind::PageLink && class == Classification::Internal {
            let next = PageTask::discovered(reference.url, page);
            if !state.frontier.enqueue(next) {
                // Already crawled (the home page, say): reuse that fetch.
                // If it is still in flight, on_page records it when it lands.
                if let Some(done) = state.pages.get(&key.canonical) {
                    state.aggregator.record(done.clone());
                }
            }
        } else {
            state.checks.push_back(CheckJob {
                url: reference.url,
                kind: reference.kind,
                key,
            });
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why FuturesUnordered and not tokio::spawn?
//    - The futures stay owned by the loop, so dropping them cancels them
//    - Results come back to the one place that owns the state, no locks
//
// 2. Why 'static futures?
//    - They are stored in a collection that outlives any one iteration
//    - So each future gets its own Arc clone and moves its task in
//
// 3. What does dropping a future do?
//    - It stops it where it was: the request is abandoned mid-flight
//    - That is how the deadline cancels outstanding work
//
// 4. Why does on_page() return a Result?
//    - A base URL that can't be fetched ends the run; `?` in the loop
//      hands that RunError straight to the caller
// -----------------------------------------------------------------------------
