// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments (or environment variables) using clap
// 2. Validate them into a CheckerConfig
// 3. Crawl the site and check every link and image
// 4. Write the JSON and Markdown reports
// 5. Exit with proper code (0 = all good, 1 = broken things found, 2 = fatal)
//
// A report is written on every path we can: even a run that could not
// start leaves a report saying why, so whatever consumes it afterwards
// (notification step, CI artifact) always has something to read.
// =============================================================================

mod checker; // src/checker/ - fetching, classification, validation
mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - validated run configuration
mod crawl; // src/crawl/ - frontier and crawl loop
mod error; // src/error.rs - transport and run-level errors
mod report; // src/report/ - aggregation and rendering

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use checker::{Fetcher, HttpFetcher, PolicyTable, Validator};
use cli::Cli;
use config::CheckerConfig;
use crawl::Crawler;
use error::RunError;
use report::Report;

const EXIT_PASS: i32 = 0;
const EXIT_FAILURES: i32 = 1;
const EXIT_FATAL: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // Only report I/O ends up here, the run itself already happened
            tracing::error!(error = %format!("{:#}", e), "run failed");
            eprintln!("Error: {:#}", e);
            EXIT_FATAL
        }
    };

    std::process::exit(exit_code);
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,site_sentinel=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr, stdout is kept for the summary
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let started = chrono::Utc::now();

    let config = match CheckerConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            let report = Report::fatal(&cli.base_url, started, &e.to_string());
            return finish_fatal(&report, &e, &cli.json_output, &cli.markdown_output).await;
        }
    };

    println!("🔍 Checking website: {}", config.base_url);

    let crawler = match build_crawler(&config).await {
        Ok(crawler) => crawler,
        Err(e) => {
            let report = Report::fatal(config.base_url.as_str(), started, &e.to_string());
            return finish_fatal(&report, &e, &config.json_output, &config.markdown_output).await;
        }
    };

    let report = match crawler.run().await {
        Ok(report) => report,
        Err(e) => {
            let report = Report::fatal(config.base_url.as_str(), started, &e.to_string());
            return finish_fatal(&report, &e, &config.json_output, &config.markdown_output).await;
        }
    };

    report.write(&config.json_output, &config.markdown_output).await?;
    print_summary(&report);
    Ok(exit_code(&report))
}

async fn build_crawler(config: &CheckerConfig) -> Result<Crawler, RunError> {
    let http = HttpFetcher::new(&config.http)?;
    let fetcher = page_fetcher(http, config).await?;
    let validator = Arc::new(Validator::new(Arc::clone(&fetcher), PolicyTable::default()));

    Ok(Crawler::new(
        config.base_url.clone(),
        config.scope.clone(),
        config.crawl.clone(),
        fetcher,
        validator,
    ))
}

#[cfg(feature = "render")]
async fn page_fetcher(http: HttpFetcher, config: &CheckerConfig) -> Result<Arc<dyn Fetcher>, RunError> {
    if config.crawl.page_mode == checker::FetchMode::Rendered {
        tracing::info!(slots = config.render_slots, "rendering internal pages in headless Chrome");
        let renderer = checker::RenderingFetcher::launch(http, config.render_slots).await?;
        return Ok(Arc::new(renderer));
    }
    Ok(Arc::new(http))
}

#[cfg(not(feature = "render"))]
async fn page_fetcher(http: HttpFetcher, config: &CheckerConfig) -> Result<Arc<dyn Fetcher>, RunError> {
    // CheckerConfig refuses --render without the feature, so this is static only
    tracing::debug!(mode = ?config.crawl.page_mode, "static page fetches");
    Ok(Arc::new(http))
}

async fn finish_fatal(report: &Report, error: &RunError, json: &Path, markdown: &Path) -> Result<i32> {
    tracing::error!(error = %error, "run aborted");
    eprintln!("❌ {}", error);
    report.write(json, markdown).await?;
    Ok(EXIT_FATAL)
}

// 0 when the report passes, even for partial runs: the deadline alone is not a failure
fn exit_code(report: &Report) -> i32 {
    if report.overall_pass {
        EXIT_PASS
    } else {
        EXIT_FAILURES
    }
}

// Prints a short human summary on stdout
fn print_summary(report: &Report) {
    println!();
    println!("📊 Summary:");
    println!("   📄 Pages crawled: {}", report.pages_crawled);
    println!("   🔗 Links checked: {}", report.links_checked);
    println!("   🖼️  Images checked: {}", report.images_checked);
    println!("   ❌ Errors: {}", report.errors.len());
    println!("   ⚠️  Warnings: {}", report.warnings.len());
    if report.partial_run {
        println!("   ⏱️  Partial run: deadline reached before the crawl finished");
    }

    for error in &report.errors {
        println!("   {:<28} {:<8} {}", error.kind, error.status, error.url);
    }

    if report.overall_pass {
        println!("✅ All good");
    } else {
        println!("❌ Broken pages, links or images found");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ErrorEntry;

    fn report(errors: Vec<ErrorEntry>, partial_run: bool) -> Report {
        let mut report = Report::fatal("https://example.com/", chrono::Utc::now(), "x");
        report.overall_pass = errors.is_empty();
        report.errors = errors;
        report.partial_run = partial_run;
        report
    }

    #[test]
    fn exit_code_follows_overall_pass() {
        assert_eq!(exit_code(&report(vec![], false)), EXIT_PASS);
        // A partial run with clean data still passes
        assert_eq!(exit_code(&report(vec![], true)), EXIT_PASS);

        let broken = ErrorEntry {
            url: "https://other.org/".to_string(),
            kind: "link".to_string(),
            status: "404".to_string(),
            detail: None,
            referrers: vec![],
        };
        assert_eq!(exit_code(&report(vec![broken.clone()], false)), EXIT_FAILURES);
        assert_eq!(exit_code(&report(vec![broken], true)), EXIT_FAILURES);
    }

    #[tokio::test]
    async fn invalid_config_still_writes_a_fatal_report() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("r.json");
        let md = dir.path().join("r.md");
        let cli = Cli::try_parse_from([
            "site-sentinel",
            "--base-url",
            "not a url",
            "--json-output",
            json.to_str().unwrap(),
            "--markdown-output",
            md.to_str().unwrap(),
        ])
        .unwrap();

        assert_eq!(run(cli).await.unwrap(), EXIT_FATAL);

        let written: Report = serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert!(!written.overall_pass);
        assert_eq!(written.errors.len(), 1);
        assert_eq!(written.errors[0].kind, "run-fatal");
        assert!(md.exists());
    }
}
