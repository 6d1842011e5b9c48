// src/checker/render.rs
// =============================================================================
// Headless-browser fetches (cargo feature "render").
//
// Some sites only expose their navigation after JavaScript runs. For those
// we load internal pages in headless Chrome via chromiumoxide:
// 1. A static GET first gives us the real status, final URL and content type
//    (the browser API does not surface them reliably)
// 2. For 2xx HTML documents, the page is opened in the browser and the
//    serialized DOM replaces the static body
//
// Browser pages are a scarce resource: a semaphore caps how many are open
// at once, and every page is closed on every exit path, including errors
// and the run being cancelled mid-navigation (PageGuard's Drop).
//
// Rust concepts:
// - RAII: Drop runs on every way out of a scope, cancellation included
// - Semaphore permits held for as long as a variable lives
// =============================================================================

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::future::BoxFuture;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use url::Url;

use super::fetch::{FetchMode, FetchOutcome, Fetcher, HttpFetcher};
use crate::error::{RunError, TransportError};

pub struct RenderingFetcher {
    http: HttpFetcher,
    browser: Browser,
    slots: Arc<Semaphore>,
    handler: JoinHandle<()>,
}

impl RenderingFetcher {
    /// Launches a local headless browser, or connects to a running one when
    /// CHROMIUM_REMOTE_DEBUGGING_URL is set.
    pub async fn launch(http: HttpFetcher, slots: usize) -> Result<Self, RunError> {
        let (browser, mut handler) = match std::env::var("CHROMIUM_REMOTE_DEBUGGING_URL") {
            Ok(remote) => {
                tracing::info!(%remote, "connecting to remote Chrome instance");
                Browser::connect(remote)
                    .await
                    .map_err(|e| RunError::RendererUnavailable(e.to_string()))?
            }
            Err(_) => {
                let config = BrowserConfig::builder()
                    .no_sandbox()
                    .arg("--disable-gpu")
                    .arg("--disable-dev-shm-usage")
                    .build()
                    .map_err(RunError::RendererUnavailable)?;
                Browser::launch(config)
                    .await
                    .map_err(|e| RunError::RendererUnavailable(e.to_string()))?
            }
        };

        // The handler stream must be polled for the browser to make progress
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            http,
            browser,
            slots: Arc::new(Semaphore::new(slots.max(1))),
            handler,
        })
    }

    async fn render(&self, url: &Url) -> Result<FetchOutcome, TransportError> {
        let mut outcome = self.http.fetch(url, FetchMode::Static).await?;
        if !needs_browser(&outcome) {
            return Ok(outcome);
        }

        let _slot = self
            .slots
            .acquire()
            .await
            .map_err(|_| TransportError::Render("renderer shut down".to_string()))?;

        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| TransportError::Render(e.to_string()))?;
        // Page is a handle (Arc inside), the guard keeps its own copy
        let guard = PageGuard(Some(page.clone()));

        page.goto(outcome.final_url.as_str())
            .await
            .map_err(|e| TransportError::Render(e.to_string()))?;
        let html = page
            .content()
            .await
            .map_err(|e| TransportError::Render(e.to_string()))?;

        guard.close().await;
        tracing::debug!(%url, bytes = html.len(), "rendered page");
        outcome.body = Some(html);
        Ok(outcome)
    }
}

#[async_trait]
impl Fetcher for RenderingFetcher {
    async fn fetch(&self, url: &Url, mode: FetchMode) -> Result<FetchOutcome, TransportError> {
        match mode {
            FetchMode::Rendered => self.render(url).await,
            other => self.http.fetch(url, other).await,
        }
    }
}

impl Drop for RenderingFetcher {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

// Error pages and non-HTML documents keep their static answer
fn needs_browser(outcome: &FetchOutcome) -> bool {
    outcome.is_success() && outcome.is_html()
}

// A browser resource that has to be given back
trait Release: Send + 'static {
    fn release(self) -> BoxFuture<'static, Result<(), String>>;
}

impl Release for Page {
    fn release(self) -> BoxFuture<'static, Result<(), String>> {
        Box::pin(async move { Page::close(self).await.map_err(|e| e.to_string()) })
    }
}

// Closes its page when dropped, whatever path we left on
struct PageGuard<P: Release>(Option<P>);

impl<P: Release> PageGuard<P> {
    async fn close(mut self) {
        if let Some(page) = self.0.take() {
            if let Err(e) = page.release().await {
                tracing::debug!(error = %e, "closing browser page failed");
            }
        }
    }
}

impl<P: Release> Drop for PageGuard<P> {
    fn drop(&mut self) {
        if let Some(page) = self.0.take() {
            // Drop can't await, hand the close off to the runtime
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(async move {
                    let _ = page.release().await;
                });
            }
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why doesn't Drop just close the page?
//    - Drop is synchronous, closing a page is async
//    - So the guard spawns the close on the current runtime instead
//
// 2. What keeps `_slot` alive?
//    - A name starting with `_` still owns its value until the end of the
//      scope (a bare `_` would drop it at once)
//    - The permit goes back to the semaphore when render() returns
//
// 3. Why abort the handler task?
//    - It polls the DevTools connection forever
//    - Without abort() it would outlive the fetcher
// -----------------------------------------------------------------------------
