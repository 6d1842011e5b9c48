// src/checker/validate.rs
// =============================================================================
// This module checks if URLs are alive and turns responses into outcomes.
//
// Outcome mapping:
// - 200-399 (after redirects)                  -> ok
// - (host, status) listed in the policy table  -> the table's override
// - any other status, or a transport error     -> error
// - images must also come back with an image/* content type, a 2xx
//   with anything else is an error (invalid image content type)
//
// The same mapping is applied to internal pages fetched by the crawler,
// so a page is never fetched a second time just to validate the link
// pointing at it.
//
// Rust concepts:
// - Enums with data: Outcome and Failure carry their details
// - Arc<dyn Fetcher>: the validator shares the crawler's fetcher
// =============================================================================

use std::sync::Arc;
use url::Url;

use super::fetch::{FetchMode, FetchOutcome, Fetcher};
use super::html::{canonical_key, TargetKind};
use super::policy::{Override, PolicyTable};
use crate::error::TransportError;

/// Why a target failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// No HTTP response at all
    Transport(TransportError),
    /// Response with an error status
    HttpStatus(u16),
    /// An image URL answered with something that isn't an image
    ContentMismatch { status: u16, content_type: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Warning { note: String },
    Error(Failure),
}

/// Identity of a checked target: the same URL used as a link and as an
/// image is checked once per kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetKey {
    pub canonical: String,
    pub kind: TargetKind,
}

impl TargetKey {
    pub fn new(url: &Url, kind: TargetKind) -> Self {
        Self {
            canonical: canonical_key(url),
            kind,
        }
    }
}

/// Result of checking one distinct URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCheckResult {
    /// The URL as first discovered (fragment stripped)
    pub url: Url,
    pub kind: TargetKind,
    /// Pages referencing this URL, in discovery order
    pub referrers: Vec<String>,
    /// HTTP status, None when the request never got a response
    pub status: Option<u16>,
    pub outcome: Outcome,
    /// True when the result comes from crawling the page itself
    pub crawled: bool,
}

impl LinkCheckResult {
    pub fn key(&self) -> TargetKey {
        TargetKey::new(&self.url, self.kind)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }

    /// Status as shown in reports: the numeric code, or the transport
    /// reason verbatim
    pub fn status_text(&self) -> String {
        match (&self.outcome, self.status) {
            (Outcome::Error(Failure::Transport(e)), _) => e.to_string(),
            (_, Some(code)) => code.to_string(),
            (_, None) => "no response".to_string(),
        }
    }
}

/// Checks targets through a Fetcher and maps responses through the policy table.
pub struct Validator {
    fetcher: Arc<dyn Fetcher>,
    policy: PolicyTable,
}

impl Validator {
    pub fn new(fetcher: Arc<dyn Fetcher>, policy: PolicyTable) -> Self {
        Self { fetcher, policy }
    }

    /// Checks `url` with a static existence probe.
    pub async fn validate(&self, url: &Url, kind: TargetKind, referrers: Vec<String>) -> LinkCheckResult {
        let fetched = self.fetcher.fetch(url, FetchMode::Probe).await;
        let result = self.assess(url, kind, referrers, &fetched);
        log_result(&result);
        result
    }

    /// Result for an internal page from the crawler's own fetch.
    pub fn assess_page(
        &self,
        url: &Url,
        referrers: Vec<String>,
        fetched: &Result<FetchOutcome, TransportError>,
    ) -> LinkCheckResult {
        let mut result = self.assess(url, TargetKind::PageLink, referrers, fetched);
        result.crawled = true;
        log_result(&result);
        result
    }

    /// Pure outcome mapping, no network.
    pub fn assess(
        &self,
        url: &Url,
        kind: TargetKind,
        referrers: Vec<String>,
        fetched: &Result<FetchOutcome, TransportError>,
    ) -> LinkCheckResult {
        let (status, outcome) = match fetched {
            Err(e) => (None, Outcome::Error(Failure::Transport(e.clone()))),
            Ok(response) => (Some(response.status), self.outcome_for(url, kind, response)),
        };

        LinkCheckResult {
            url: url.clone(),
            kind,
            referrers,
            status,
            outcome,
            crawled: false,
        }
    }

    fn outcome_for(&self, url: &Url, kind: TargetKind, response: &FetchOutcome) -> Outcome {
        let status = response.status;

        // The override is keyed on the host we asked, or the one we ended up on
        let rule = self
            .policy
            .lookup(url, status)
            .or_else(|| self.policy.lookup(&response.final_url, status));
        match rule {
            Some(Override::Warn(note)) => return Outcome::Warning { note: note.clone() },
            Some(Override::Pass) => return Outcome::Ok,
            None => {}
        }

        if !response.is_success() {
            return Outcome::Error(Failure::HttpStatus(status));
        }

        if kind == TargetKind::Image && !response.is_image() {
            return Outcome::Error(Failure::ContentMismatch {
                status,
                content_type: response.content_type.clone(),
            });
        }

        Outcome::Ok
    }
}

fn log_result(result: &LinkCheckResult) {
    match &result.outcome {
        Outcome::Ok => tracing::debug!(url = %result.url, kind = ?result.kind, status = ?result.status, "ok"),
        Outcome::Warning { note } => {
            tracing::info!(url = %result.url, status = ?result.status, note = %note, "warning")
        }
        Outcome::Error(failure) => {
            tracing::warn!(url = %result.url, kind = ?result.kind, failure = ?failure, "check failed")
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why isn't assess() async?
//    - It does no I/O: it maps a fetch result to an outcome
//    - Probes and page fetches both go through it, and tests can feed it
//      responses without a server
//
// 2. What is matches!?
//    - A macro returning true when a value fits a pattern
//    - matches!(outcome, Outcome::Error(_)) ignores what is inside
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // Canned responses keyed by URL, records every request it sees
    #[derive(Default)]
    struct StubFetcher {
        responses: HashMap<String, Result<(u16, Option<&'static str>), TransportError>>,
        calls: Mutex<Vec<(String, FetchMode)>>,
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &Url, mode: FetchMode) -> Result<FetchOutcome, TransportError> {
            self.calls.lock().unwrap().push((url.to_string(), mode));
            match self.responses.get(url.as_str()) {
                Some(Ok((status, content_type))) => Ok(FetchOutcome {
                    final_url: url.clone(),
                    status: *status,
                    content_type: content_type.map(|c| c.to_string()),
                    body: None,
                }),
                Some(Err(e)) => Err(e.clone()),
                None => Ok(FetchOutcome {
                    final_url: url.clone(),
                    status: 404,
                    content_type: None,
                    body: None,
                }),
            }
        }
    }

    fn validator(responses: Vec<(&str, Result<(u16, Option<&'static str>), TransportError>)>) -> (Validator, Arc<StubFetcher>) {
        let stub = Arc::new(StubFetcher {
            responses: responses.into_iter().map(|(u, r)| (u.to_string(), r)).collect(),
            ..StubFetcher::default()
        });
        (Validator::new(stub.clone(), PolicyTable::default()), stub)
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn success_and_redirect_statuses_are_ok() {
        let (v, stub) = validator(vec![
            ("https://ok.example/", Ok((200, Some("text/html")))),
            ("https://moved.example/", Ok((304, None))),
        ]);
        let ok = v.validate(&url("https://ok.example/"), TargetKind::PageLink, vec![]).await;
        assert_eq!(ok.outcome, Outcome::Ok);
        let moved = v.validate(&url("https://moved.example/"), TargetKind::PageLink, vec![]).await;
        assert_eq!(moved.outcome, Outcome::Ok);

        // Validation always goes through the lightweight static probe
        assert!(stub.calls.lock().unwrap().iter().all(|(_, mode)| *mode == FetchMode::Probe));
    }

    #[tokio::test]
    async fn not_found_is_an_http_status_error() {
        let (v, _) = validator(vec![("https://gone.example/", Ok((404, None)))]);
        let result = v
            .validate(&url("https://gone.example/"), TargetKind::PageLink, vec!["https://site/".into()])
            .await;
        assert_eq!(result.outcome, Outcome::Error(Failure::HttpStatus(404)));
        assert_eq!(result.status_text(), "404");
        assert_eq!(result.referrers, vec!["https://site/".to_string()]);
    }

    #[tokio::test]
    async fn linkedin_999_is_a_warning() {
        let (v, _) = validator(vec![("https://www.linkedin.com/in/someone", Ok((999, None)))]);
        let result = v
            .validate(&url("https://www.linkedin.com/in/someone"), TargetKind::PageLink, vec![])
            .await;
        assert_eq!(
            result.outcome,
            Outcome::Warning {
                note: "bot-protection, verify manually".to_string()
            }
        );
        assert!(!result.is_error());
    }

    #[tokio::test]
    async fn status_999_elsewhere_is_an_error() {
        let (v, _) = validator(vec![("https://example.org/", Ok((999, None)))]);
        let result = v.validate(&url("https://example.org/"), TargetKind::PageLink, vec![]).await;
        assert_eq!(result.outcome, Outcome::Error(Failure::HttpStatus(999)));
    }

    #[tokio::test]
    async fn transport_errors_keep_their_reason() {
        let (v, _) = validator(vec![(
            "https://down.example/",
            Err(TransportError::Dns("no such host".to_string())),
        )]);
        let result = v.validate(&url("https://down.example/"), TargetKind::Image, vec![]).await;
        assert_eq!(result.status, None);
        assert_eq!(result.status_text(), "dns: no such host");
    }

    #[tokio::test]
    async fn image_with_html_content_type_is_a_content_mismatch() {
        let (v, _) = validator(vec![("https://site.example/logo.png", Ok((200, Some("text/html"))))]);
        let result = v
            .validate(&url("https://site.example/logo.png"), TargetKind::Image, vec![])
            .await;
        assert_eq!(
            result.outcome,
            Outcome::Error(Failure::ContentMismatch {
                status: 200,
                content_type: Some("text/html".to_string())
            })
        );
    }

    #[tokio::test]
    async fn image_with_image_content_type_is_ok() {
        let (v, _) = validator(vec![("https://site.example/logo.png", Ok((200, Some("image/png"))))]);
        let result = v
            .validate(&url("https://site.example/logo.png"), TargetKind::Image, vec![])
            .await;
        assert_eq!(result.outcome, Outcome::Ok);
    }

    #[test]
    fn page_assessment_is_marked_as_crawled() {
        let (v, stub) = validator(vec![]);
        let fetched = Err(TransportError::Timeout("deadline".to_string()));
        let result = v.assess_page(&url("https://site.example/about"), vec![], &fetched);
        assert!(result.crawled);
        assert!(result.is_error());
        // assess never touches the network
        assert!(stub.calls.lock().unwrap().is_empty());
    }
}
