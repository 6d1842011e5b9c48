// src/checker/policy.rs
// =============================================================================
// Outcome overrides for hosts that answer in non-standard ways.
//
// Some sites return error statuses to anything that looks like a bot even
// though the link works fine in a browser. LinkedIn's HTTP 999 is the
// classic example. Rather than special-casing hosts inside the validator,
// the exceptions live in a small table of (host, status) -> override.
// Adding a new exception means adding a row.
// =============================================================================

use url::Url;

/// What an override turns a response into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Override {
    /// Reported as a warning with this note, never as an error
    Warn(String),
    /// Treated as a working link
    Pass,
}

/// One row of the table.
#[derive(Debug, Clone)]
pub struct OverrideRule {
    /// Matches this host and any of its subdomains
    pub host: String,
    pub status: u16,
    pub outcome: Override,
}

impl OverrideRule {
    pub fn new(host: &str, status: u16, outcome: Override) -> Self {
        Self {
            host: host.trim().to_ascii_lowercase(),
            status,
            outcome,
        }
    }

    fn matches(&self, host: &str, status: u16) -> bool {
        if status != self.status {
            return false;
        }
        let host = host.to_ascii_lowercase();
        host == self.host
            || host
                .strip_suffix(self.host.as_str())
                .map_or(false, |prefix| prefix.ends_with('.'))
    }
}

#[derive(Debug, Clone)]
pub struct PolicyTable {
    rules: Vec<OverrideRule>,
}

impl PolicyTable {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: OverrideRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// First rule matching the URL's host and the status, if any
    pub fn lookup(&self, url: &Url, status: u16) -> Option<&Override> {
        let host = url.host_str()?;
        self.rules
            .iter()
            .find(|rule| rule.matches(host, status))
            .map(|rule| &rule.outcome)
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::empty().with_rule(OverrideRule::new(
            "linkedin.com",
            999,
            Override::Warn("bot-protection, verify manually".to_string()),
        ))
    }
}
