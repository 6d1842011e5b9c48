// src/report/markdown.rs
// =============================================================================
// Human-readable rendering of a Report.
//
// Layout:
//   # Website check report
//   summary lines (base URL, timestamp, counts, status)
//   ## Errors   - numbered table
//   ## Warnings - numbered table, only when the report kept any warnings
// =============================================================================

use std::fmt::Write;

use super::Report;

pub fn render_markdown(report: &Report) -> String {
    let mut out = String::new();

    // Writing to a String can't fail, so the fmt::Results are ignored
    let _ = writeln!(out, "# Website check report");
    let _ = writeln!(out);
    let _ = writeln!(out, "**Base URL:** {}  ", report.base_url);
    let _ = writeln!(out, "**Run:** {}  ", report.run_timestamp.to_rfc3339());
    let _ = writeln!(out, "**Duration:** {:.2}s  ", report.duration_seconds);
    let _ = writeln!(out, "**Pages Crawled:** {}  ", report.pages_crawled);
    let _ = writeln!(out, "**Links Checked:** {}  ", report.links_checked);
    let _ = writeln!(out, "**Images Checked:** {}  ", report.images_checked);
    let _ = writeln!(
        out,
        "**Result:** {}",
        if report.overall_pass { "PASS" } else { "FAIL" }
    );
    if report.partial_run {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "> Partial run: the deadline expired before the crawl finished, results cover only what was checked in time."
        );
    }
    let _ = writeln!(out);

    if report.errors.is_empty() {
        let _ = writeln!(out, "No issues detected. ✅");
    } else {
        let _ = writeln!(out, "## Errors");
        let _ = writeln!(out);
        let _ = writeln!(out, "| # | URL | Kind | Status | Referenced from |");
        let _ = writeln!(out, "|---|-----|------|--------|-----------------|");
        for (idx, error) in report.errors.iter().enumerate() {
            let status = match &error.detail {
                Some(detail) => format!("{} ({})", error.status, detail),
                None => error.status.clone(),
            };
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                idx + 1,
                cell(&error.url),
                cell(&error.kind),
                cell(&status),
                referrers(&error.referrers)
            );
        }
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Warnings");
        let _ = writeln!(out);
        let _ = writeln!(out, "| # | URL | Note | Referenced from |");
        let _ = writeln!(out, "|---|-----|------|-----------------|");
        for (idx, warning) in report.warnings.iter().enumerate() {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                idx + 1,
                cell(&warning.url),
                cell(&warning.note),
                referrers(&warning.referrers)
            );
        }
    }

    out
}

// Table cells can't contain raw pipes or newlines
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(|c: char| c == '\r' || c == '\n', " ")
}

fn referrers(list: &[String]) -> String {
    if list.is_empty() {
        return "-".to_string();
    }
    list.iter().map(|r| cell(r)).collect::<Vec<_>>().join("<br>")
}

#[cfg(test)]
mod tests {
    use super::super::{ErrorEntry, Report, WarningEntry};
    use super::*;
    use chrono::Utc;

    fn report(errors: Vec<ErrorEntry>, warnings: Vec<WarningEntry>) -> Report {
        Report {
            base_url: "https://example.com/".to_string(),
            run_timestamp: Utc::now(),
            duration_seconds: 1.5,
            pages_crawled: 3,
            links_checked: 10,
            images_checked: 2,
            overall_pass: errors.is_empty(),
            errors,
            warnings,
            partial_run: false,
        }
    }

    fn error(url: &str) -> ErrorEntry {
        ErrorEntry {
            url: url.to_string(),
            kind: "link".to_string(),
            status: "404".to_string(),
            detail: None,
            referrers: vec!["https://example.com/about".to_string()],
        }
    }

    #[test]
    fn clean_report_has_summary_and_no_tables() {
        let md = render_markdown(&report(vec![], vec![]));
        assert!(md.contains("**Pages Crawled:** 3"));
        assert!(md.contains("**Result:** PASS"));
        assert!(md.contains("No issues detected."));
        assert!(!md.contains("## Errors"));
        assert!(!md.contains("## Warnings"));
    }

    #[test]
    fn errors_are_listed_in_a_table() {
        let md = render_markdown(&report(vec![error("https://other.org/missing")], vec![]));
        assert!(md.contains("**Result:** FAIL"));
        assert!(md.contains("## Errors"));
        assert!(md.contains("| 1 | https://other.org/missing | link | 404 | https://example.com/about |"));
    }

    #[test]
    fn warnings_section_only_when_present() {
        let warning = WarningEntry {
            url: "https://www.linkedin.com/in/someone".to_string(),
            note: "bot-protection, verify manually".to_string(),
            referrers: vec![],
        };
        let md = render_markdown(&report(vec![error("https://other.org/missing")], vec![warning]));
        assert!(md.contains("## Warnings"));
        assert!(md.contains("| 1 | https://www.linkedin.com/in/someone | bot-protection, verify manually | - |"));
    }

    #[test]
    fn pipes_are_escaped() {
        let mut e = error("https://other.org/a|b");
        e.status = "request failed: a | b".to_string();
        let md = render_markdown(&report(vec![e], vec![]));
        assert!(md.contains("https://other.org/a\\|b"));
        assert!(md.contains("request failed: a \\| b"));
    }

    #[test]
    fn partial_runs_are_flagged() {
        let mut r = report(vec![], vec![]);
        r.partial_run = true;
        assert!(render_markdown(&r).contains("Partial run"));
    }
}
