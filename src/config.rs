// src/config.rs
// =============================================================================
// Turns raw CLI arguments into a validated run configuration.
//
// Anything wrong here is fatal: a malformed base URL means there is
// nothing to crawl, so we fail before any request is made.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::checker::{normalize, FetchMode, HttpSettings, Scope};
use crate::cli::Cli;
use crate::crawl::CrawlSettings;
use crate::error::RunError;

#[derive(Debug, Clone)]
pub struct CheckerConfig {
    pub base_url: Url,
    pub scope: Scope,
    pub http: HttpSettings,
    pub crawl: CrawlSettings,
    #[cfg(feature = "render")]
    pub render_slots: usize,
    pub json_output: PathBuf,
    pub markdown_output: PathBuf,
}

impl CheckerConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, RunError> {
        let base_url = parse_base_url(&cli.base_url)?;

        if cli.max_connections == 0 {
            return Err(RunError::InvalidConfig(
                "--max-connections must be at least 1".to_string(),
            ));
        }
        if cli.timeout == 0 {
            return Err(RunError::InvalidConfig("--timeout must be at least 1 second".to_string()));
        }
        if cli.render_slots == 0 {
            return Err(RunError::InvalidConfig("--render-slots must be at least 1".to_string()));
        }
        if cli.render && !cfg!(feature = "render") {
            return Err(RunError::InvalidConfig(
                "--render needs a build with the \"render\" feature".to_string(),
            ));
        }

        // parse_base_url guarantees a host
        let host = base_url.host_str().unwrap_or_default();
        let scope = Scope::new(host, &cli.internal_domains);

        let mut http = HttpSettings {
            timeout: Duration::from_secs(cli.timeout),
            max_redirects: cli.max_redirects,
            ..HttpSettings::default()
        };
        if let Some(agent) = &cli.user_agent {
            http.user_agent = agent.clone();
        }

        let crawl = CrawlSettings {
            page_mode: if cli.render {
                FetchMode::Rendered
            } else {
                FetchMode::Static
            },
            max_connections: cli.max_connections,
            deadline: cli.deadline.map(Duration::from_secs),
        };

        Ok(Self {
            base_url,
            scope,
            http,
            crawl,
            #[cfg(feature = "render")]
            render_slots: cli.render_slots,
            json_output: cli.json_output.clone(),
            markdown_output: cli.markdown_output.clone(),
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, RunError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| RunError::InvalidConfig(format!("invalid base URL '{}': {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(RunError::InvalidConfig(format!(
            "base URL '{}' must use http or https",
            raw
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(RunError::InvalidConfig(format!("base URL '{}' has no host", raw)));
    }
    Ok(normalize(url))
}
