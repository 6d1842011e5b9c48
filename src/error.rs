// src/error.rs
// =============================================================================
// Error types shared across the crate.
//
// Two families:
// - TransportError: a single request never produced an HTTP response
//   (DNS, connection, TLS, timeout...). Always captured per URL and turned
//   into a report entry, never fatal.
// - RunError: the run itself cannot go on (bad configuration, base URL
//   unreachable). These abort the crawl and produce a fatal report.
//
// Non-2xx statuses are NOT errors here: they are valid responses that the
// validator interprets (see checker::validate).
// =============================================================================

use thiserror::Error;

/// Why a request failed before any HTTP status was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("dns: {0}")]
    Dns(String),
    #[error("connect: {0}")]
    Connect(String),
    #[error("tls: {0}")]
    Tls(String),
    #[error("too many redirects: {0}")]
    TooManyRedirects(String),
    #[error("body: {0}")]
    Body(String),
    #[cfg(feature = "render")]
    #[error("render: {0}")]
    Render(String),
    #[error("request failed: {0}")]
    Other(String),
}

impl TransportError {
    // Categorizes reqwest errors
    //
    // reqwest's own Display is just "error sending request for url (...)",
    // the useful part (hyper / rustls / resolver message) lives in the
    // source chain, so we flatten the whole chain before looking at it.
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        let chain = error_chain(error);
        let lowered = chain.to_lowercase();

        if error.is_timeout() {
            TransportError::Timeout(chain)
        } else if error.is_redirect() {
            TransportError::TooManyRedirects(chain)
        } else if lowered.contains("certificate") || lowered.contains("tls") || lowered.contains("ssl") {
            TransportError::Tls(chain)
        } else if error.is_connect() {
            // Connection errors often mean DNS issues or host unreachable
            if lowered.contains("dns") || lowered.contains("resolve") || lowered.contains("lookup") {
                TransportError::Dns(chain)
            } else {
                TransportError::Connect(chain)
            }
        } else if error.is_body() || error.is_decode() {
            TransportError::Body(chain)
        } else {
            TransportError::Other(chain)
        }
    }
}

/// Conditions that abort the whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("base URL {url} is unreachable: {reason}")]
    BaseUnreachable { url: String, reason: String },
    #[error("could not build HTTP client: {0}")]
    ClientSetup(String),
    #[cfg(feature = "render")]
    #[error("headless renderer unavailable: {0}")]
    RendererUnavailable(String),
}

// Joins an error and all of its sources with ": "
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
