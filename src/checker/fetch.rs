// src/checker/fetch.rs
// =============================================================================
// This module performs single HTTP(S) requests.
//
// Key functionality:
// - Page fetches: GET, keep the body when it is HTML
// - Existence probes: HEAD request (lightweight, no body download),
//   falling back to a body-less GET when HEAD is rejected
// - Follows redirects and reports the final URL
// - Never fails on non-2xx statuses: those are answers, not errors
//
// The Fetcher trait is the seam between the crawler and the network so the
// headless renderer (feature "render") and test stubs can stand in for it.
//
// Rust concepts:
// - async_trait: async methods on a trait used as Arc<dyn Fetcher>
// - Match guards: `Ok(response) if ... =>` picks the HEAD fallback
// =============================================================================

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use std::time::Duration;
use url::Url;

use crate::error::{RunError, TransportError};

/// How a URL should be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Static existence check (HEAD, falling back to GET), body discarded
    Probe,
    /// Static GET, body kept for HTML responses
    Static,
    /// Headless-browser navigation, body is the rendered DOM
    Rendered,
}

/// What came back from a fetch that produced an HTTP response.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// URL after following redirects
    pub final_url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    /// Only set for page fetches of HTML documents
    pub body: Option<String>,
}

impl FetchOutcome {
    /// 200-399 after redirects counts as reachable
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }

    /// Responses without a content type are treated as HTML, browsers do the same sniffing
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(ct) => {
                let ct = ct.to_ascii_lowercase();
                ct.starts_with("text/html") || ct.starts_with("application/xhtml+xml")
            }
            None => true,
        }
    }

    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false)
    }
}

/// Performs one request and reports what happened.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url, mode: FetchMode) -> Result<FetchOutcome, TransportError>;
}

/// Settings for the shared HTTP client.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_redirects: 10,
            user_agent: concat!("site-sentinel/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// reqwest-backed fetcher used for every static request.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    // Client is cheap to clone (it's a reference counter internally),
    // one client means one connection pool for the whole run
    client: Client,
}

impl HttpFetcher {
    pub fn new(settings: &HttpSettings) -> Result<Self, RunError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| RunError::ClientSetup(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    /// Wraps a preconfigured client (custom resolvers, proxies, tests)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &Url, keep_body: bool) -> Result<FetchOutcome, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        let mut outcome = describe(&response);
        if keep_body && outcome.is_success() && outcome.is_html() {
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::from_reqwest(&e))?;
            outcome.body = Some(body);
        }
        Ok(outcome)
    }

    async fn probe(&self, url: &Url) -> Result<FetchOutcome, TransportError> {
        // First, try a HEAD request (faster, no body download)
        match self.client.head(url.clone()).send().await {
            Ok(response) if response.status().as_u16() < 400 => Ok(describe(&response)),
            Ok(response) => {
                // Plenty of servers answer HEAD with 403/405/501 while GET works
                tracing::debug!(%url, status = response.status().as_u16(), "HEAD rejected, retrying with GET");
                self.get(url, false).await
            }
            Err(e) if e.is_timeout() => Err(TransportError::from_reqwest(&e)),
            Err(e) => {
                tracing::debug!(%url, error = %e, "HEAD failed, retrying with GET");
                self.get(url, false).await
            }
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, mode: FetchMode) -> Result<FetchOutcome, TransportError> {
        match mode {
            FetchMode::Probe => self.probe(url).await,
            FetchMode::Static => self.get(url, true).await,
            FetchMode::Rendered => {
                // Without a browser the best we can do is the static document
                tracing::debug!(%url, "no renderer configured, fetching statically");
                self.get(url, true).await
            }
        }
    }
}

// Reads status, final URL and content type off a response
fn describe(response: &Response) -> FetchOutcome {
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    FetchOutcome {
        final_url: response.url().clone(),
        status: response.status().as_u16(),
        content_type,
        body: None,
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why #[async_trait]?
//    - A trait used as `dyn Fetcher` needs a concrete return type
//    - The macro turns `async fn fetch` into a method returning
//      Pin<Box<dyn Future + Send>>
//
// 2. Why `Send + Sync` on the trait?
//    - One fetcher is shared (through Arc) by every in-flight request
//
// 3. Why is a 404 `Ok(...)`?
//    - Err means "no HTTP answer at all" (DNS, TLS, timeout...)
//    - A 404 is an answer; the validator decides what it means
// -----------------------------------------------------------------------------
