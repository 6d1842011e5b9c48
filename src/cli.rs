// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// Every flag can also come from an environment variable (BASE_URL,
// INTERNAL_DOMAINS, ...). The checker usually runs from cron or CI where
// setting variables is easier than editing the command line.
// =============================================================================

use clap::Parser;
use std::path::PathBuf;

// This struct represents our entire CLI application
//
// #[derive(Parser)] tells clap to automatically generate parsing code
#[derive(Parser, Debug)]
#[command(
    name = "site-sentinel",
    version,
    about = "Crawl a website and verify that its pages, links and images resolve",
    long_about = "site-sentinel crawls every internal page of a website, checks every link and image it finds, \
                  and writes JSON and Markdown reports. The exit code is 0 when nothing is broken, \
                  1 when errors were found and 2 when the run could not be performed."
)]
pub struct Cli {
    /// Base URL to crawl (e.g., https://example.com)
    #[arg(long, env = "BASE_URL")]
    pub base_url: String,

    /// Extra domains to treat as internal, comma separated
    ///
    /// The base host and its www. twin are always internal.
    #[arg(long, env = "INTERNAL_DOMAINS", value_delimiter = ',')]
    pub internal_domains: Vec<String>,

    /// Where to write the JSON report
    #[arg(long, env = "JSON_OUTPUT", default_value = "website-check-report.json")]
    pub json_output: PathBuf,

    /// Where to write the Markdown report
    #[arg(long, env = "MARKDOWN_OUTPUT", default_value = "website-check-report.md")]
    pub markdown_output: PathBuf,

    /// Timeout for each HTTP request, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = 15)]
    pub timeout: u64,

    /// Maximum number of concurrent outbound requests
    #[arg(long, env = "MAX_CONNECTIONS", default_value_t = 8)]
    pub max_connections: usize,

    /// Stop after this many seconds and report what was collected
    #[arg(long, env = "DEADLINE")]
    pub deadline: Option<u64>,

    /// Render internal pages in headless Chrome (needs the "render" feature)
    #[arg(long, env = "RENDER_PAGES")]
    pub render: bool,

    /// How many browser pages may be open at once in render mode
    #[arg(long, env = "RENDER_SLOTS", default_value_t = 2)]
    pub render_slots: usize,

    /// How many redirects to follow before giving up
    #[arg(long, env = "MAX_REDIRECTS", default_value_t = 10)]
    pub max_redirects: usize,

    /// User-Agent header sent with every request
    #[arg(long, env = "USER_AGENT")]
    pub user_agent: Option<String>,

    /// Emit logs as JSON lines instead of human-readable text
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}
