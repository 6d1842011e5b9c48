// src/report/mod.rs
// =============================================================================
// Collects check results into the final report.
//
// Lifecycle:
// 1. Aggregator::new at run start (empty)
// 2. discover() for every reference found, record() for every result
// 3. finalize() seals everything into an immutable Report
//
// Ordering: errors and warnings come out in discovery order (the order the
// crawler first saw each URL), not the order checks happened to finish.
// Each target gets a sequence number when first discovered and results are
// sorted by it at the end.
//
// Warning suppression: warnings are only kept when the run already has
// errors. On an otherwise clean run they are noise.
// =============================================================================

mod markdown;

pub use markdown::render_markdown;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use url::Url;

use crate::checker::{Failure, LinkCheckResult, Outcome, TargetKey, TargetKind};

/// One failing target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub url: String,
    /// link, image, invalid-image-content-type, page-unreachable or run-fatal
    pub kind: String,
    /// Numeric status, or the transport error verbatim
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub referrers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningEntry {
    pub url: String,
    pub note: String,
    pub referrers: Vec<String>,
}

/// The sealed result of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub base_url: String,
    pub run_timestamp: DateTime<Utc>,
    pub duration_seconds: f64,
    pub pages_crawled: usize,
    pub links_checked: usize,
    pub images_checked: usize,
    pub errors: Vec<ErrorEntry>,
    pub warnings: Vec<WarningEntry>,
    pub overall_pass: bool,
    pub partial_run: bool,
}

impl Report {
    /// Report for a run that could not happen at all: one `run-fatal` error,
    /// never an empty success.
    pub fn fatal(base_url: &str, run_timestamp: DateTime<Utc>, reason: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            run_timestamp,
            duration_seconds: 0.0,
            pages_crawled: 0,
            links_checked: 0,
            images_checked: 0,
            errors: vec![ErrorEntry {
                url: base_url.to_string(),
                kind: "run-fatal".to_string(),
                status: reason.to_string(),
                detail: None,
                referrers: Vec::new(),
            }],
            warnings: Vec::new(),
            overall_pass: false,
            partial_run: false,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serializing report to JSON")
    }

    /// Writes the JSON and Markdown renderings, once, after the run
    pub async fn write(&self, json_path: &Path, markdown_path: &Path) -> Result<()> {
        tokio::fs::write(json_path, self.to_json()?)
            .await
            .with_context(|| format!("writing JSON report to {}", json_path.display()))?;
        tokio::fs::write(markdown_path, render_markdown(self))
            .await
            .with_context(|| format!("writing Markdown report to {}", markdown_path.display()))?;
        tracing::info!(
            json = %json_path.display(),
            markdown = %markdown_path.display(),
            "reports written"
        );
        Ok(())
    }
}

// A target as the aggregator tracks it
#[derive(Debug)]
struct Target {
    seq: u64,
    referrers: Vec<String>,
    result: Option<LinkCheckResult>,
}

/// Mutable side of the report, owned by the crawl loop.
#[derive(Debug)]
pub struct Aggregator {
    base_url: String,
    run_timestamp: DateTime<Utc>,
    started: Instant,
    next_seq: u64,
    targets: HashMap<TargetKey, Target>,
    pages_crawled: usize,
    partial: bool,
}

impl Aggregator {
    pub fn new(base_url: &Url) -> Self {
        Self {
            base_url: base_url.to_string(),
            run_timestamp: Utc::now(),
            started: Instant::now(),
            next_seq: 0,
            targets: HashMap::new(),
            pages_crawled: 0,
            partial: false,
        }
    }

    /// Notes that `referrer` references `key`.
    ///
    /// Returns true the first time a key is seen, which is when the caller
    /// should schedule its check. Later calls only add the referrer.
    pub fn discover(&mut self, key: &TargetKey, referrer: &str) -> bool {
        match self.targets.get_mut(key) {
            Some(target) => {
                push_unique(&mut target.referrers, referrer);
                false
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.targets.insert(
                    key.clone(),
                    Target {
                        seq,
                        referrers: vec![referrer.to_string()],
                        result: None,
                    },
                );
                true
            }
        }
    }

    pub fn is_known(&self, key: &TargetKey) -> bool {
        self.targets.contains_key(key)
    }

    /// Referrers seen so far for `key`
    pub fn referrers(&self, key: &TargetKey) -> Vec<String> {
        self.targets
            .get(key)
            .map(|t| t.referrers.clone())
            .unwrap_or_default()
    }

    /// Stores a check result. Referrers carried by the result are merged
    /// with the ones discovered since the check was scheduled.
    pub fn record(&mut self, result: LinkCheckResult) {
        let key = result.key();
        if !self.targets.contains_key(&key) {
            for referrer in &result.referrers {
                self.discover(&key, referrer);
            }
            if !self.targets.contains_key(&key) {
                // No referrer at all, still give it a place in the order
                self.targets.insert(
                    key.clone(),
                    Target {
                        seq: self.next_seq,
                        referrers: Vec::new(),
                        result: None,
                    },
                );
                self.next_seq += 1;
            }
        }

        if let Some(target) = self.targets.get_mut(&key) {
            for referrer in &result.referrers {
                push_unique(&mut target.referrers, referrer);
            }
            target.result = Some(result);
        }
    }

    pub fn page_crawled(&mut self) {
        self.pages_crawled += 1;
    }

    /// The run was cut short (deadline), the report will say so
    pub fn mark_partial(&mut self) {
        self.partial = true;
    }

    /// Seals the report.
    ///
    /// Targets whose check never completed (cancelled runs) are left out,
    /// the counts only cover what was actually checked.
    pub fn finalize(self) -> Report {
        let duration_seconds = self.started.elapsed().as_secs_f64();

        let mut completed: Vec<(u64, LinkCheckResult)> = self
            .targets
            .into_values()
            .filter_map(|target| {
                target.result.map(|mut result| {
                    result.referrers = target.referrers;
                    (target.seq, result)
                })
            })
            .collect();
        completed.sort_by_key(|(seq, _)| *seq);

        let links_checked = completed
            .iter()
            .filter(|(_, r)| r.kind == TargetKind::PageLink)
            .count();
        let images_checked = completed.len() - links_checked;

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for (_, result) in &completed {
            match &result.outcome {
                Outcome::Ok => {}
                Outcome::Warning { note } => warnings.push(WarningEntry {
                    url: result.url.to_string(),
                    note: note.clone(),
                    referrers: result.referrers.clone(),
                }),
                Outcome::Error(failure) => errors.push(error_entry(result, failure)),
            }
        }

        if errors.is_empty() && !warnings.is_empty() {
            tracing::debug!(count = warnings.len(), "suppressing warnings on a run without errors");
            warnings.clear();
        }

        Report {
            base_url: self.base_url,
            run_timestamp: self.run_timestamp,
            duration_seconds,
            pages_crawled: self.pages_crawled,
            links_checked,
            images_checked,
            overall_pass: errors.is_empty(),
            errors,
            warnings,
            partial_run: self.partial,
        }
    }
}

fn error_entry(result: &LinkCheckResult, failure: &Failure) -> ErrorEntry {
    let (kind, detail) = match failure {
        Failure::ContentMismatch { content_type, .. } => (
            "invalid-image-content-type",
            Some(format!(
                "content-type: {}",
                content_type.as_deref().unwrap_or("missing")
            )),
        ),
        _ if result.crawled => ("page-unreachable", None),
        _ => match result.kind {
            TargetKind::PageLink => ("link", None),
            TargetKind::Image => ("image", None),
        },
    };

    ErrorEntry {
        url: result.url.to_string(),
        kind: kind.to_string(),
        status: result.status_text(),
        detail,
        referrers: result.referrers.clone(),
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|existing| existing == value) {
        list.push(value.to_string());
    }
}
