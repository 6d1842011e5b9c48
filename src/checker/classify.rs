// src/checker/classify.rs
// =============================================================================
// Decides what we do with a URL:
// - Internal: same site, crawl it and check it
// - External: other http(s) site, check it but never expand it
// - Excluded: mailto:, tel:, javascript:, data:... never checked at all
//
// Classification is a pure function of the URL and the configured hosts.
// =============================================================================

use std::collections::HashSet;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Internal,
    External,
    Excluded,
}

/// Classifies `url` against the base host and the extra internal domains.
///
/// Hosts are compared case-insensitively; `internal_domains` is expected
/// to hold lower-cased names.
pub fn classify(url: &Url, base_host: &str, internal_domains: &HashSet<String>) -> Classification {
    if !matches!(url.scheme(), "http" | "https") {
        return Classification::Excluded;
    }

    let host = match url.host_str() {
        Some(host) => host.to_ascii_lowercase(),
        None => return Classification::Excluded,
    };

    if host.eq_ignore_ascii_case(base_host) || internal_domains.contains(&host) {
        Classification::Internal
    } else {
        Classification::External
    }
}

/// The set of hosts that make up "the site".
#[derive(Debug, Clone)]
pub struct Scope {
    base_host: String,
    internal_domains: HashSet<String>,
}

impl Scope {
    /// Builds the scope for `base_host`.
    ///
    /// The `www.` twin of the base host is always internal too
    /// (example.com <-> www.example.com), extra domains are trimmed and
    /// lower-cased, blanks dropped.
    pub fn new<I, S>(base_host: &str, extra_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let base_host = base_host.trim().to_ascii_lowercase();
        let mut internal_domains = HashSet::new();

        if !base_host.is_empty() {
            match base_host.strip_prefix("www.") {
                Some(bare) => internal_domains.insert(bare.to_string()),
                None => internal_domains.insert(format!("www.{}", base_host)),
            };
        }

        for domain in extra_domains {
            let cleaned = domain.as_ref().trim().to_ascii_lowercase();
            if !cleaned.is_empty() {
                internal_domains.insert(cleaned);
            }
        }

        Self {
            base_host,
            internal_domains,
        }
    }

    pub fn classify(&self, url: &Url) -> Classification {
        classify(url, &self.base_host, &self.internal_domains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn base_host_is_internal() {
        let scope = Scope::new("example.com", Vec::<String>::new());
        assert_eq!(scope.classify(&url("https://example.com/about")), Classification::Internal);
        assert_eq!(scope.classify(&url("http://EXAMPLE.com/")), Classification::Internal);
    }

    #[test]
    fn www_twin_is_internal_both_ways() {
        let bare = Scope::new("example.com", Vec::<String>::new());
        assert_eq!(bare.classify(&url("https://www.example.com/")), Classification::Internal);

        let www = Scope::new("www.example.com", Vec::<String>::new());
        assert_eq!(www.classify(&url("https://example.com/")), Classification::Internal);
    }

    #[test]
    fn extra_domains_are_internal() {
        let scope = Scope::new("example.com", vec![" Blog.Example.org ", "", "docs.example.net"]);
        assert_eq!(scope.classify(&url("https://blog.example.org/post")), Classification::Internal);
        assert_eq!(scope.classify(&url("https://docs.example.net/")), Classification::Internal);
    }

    #[test]
    fn subdomains_are_not_implicitly_internal() {
        let scope = Scope::new("example.com", Vec::<String>::new());
        assert_eq!(scope.classify(&url("https://shop.example.com/")), Classification::External);
    }

    #[test]
    fn other_hosts_are_external() {
        let scope = Scope::new("example.com", Vec::<String>::new());
        assert_eq!(scope.classify(&url("https://rust-lang.org/")), Classification::External);
    }

    #[test]
    fn non_http_schemes_are_excluded() {
        let scope = Scope::new("example.com", Vec::<String>::new());
        for raw in [
            "mailto:someone@example.com",
            "tel:+123456",
            "javascript:void(0)",
            "ftp://example.com/file",
            "data:text/plain,hi",
        ] {
            assert_eq!(scope.classify(&url(raw)), Classification::Excluded, "{}", raw);
        }
    }

    #[test]
    fn classification_does_not_depend_on_call_order() {
        let scope = Scope::new("example.com", vec!["cdn.example.com"]);
        let urls = [
            url("https://example.com/"),
            url("https://cdn.example.com/a.png"),
            url("https://other.org/"),
            url("mailto:x@example.com"),
        ];
        let forward: Vec<_> = urls.iter().map(|u| scope.classify(u)).collect();
        let mut backward: Vec<_> = urls.iter().rev().map(|u| scope.classify(u)).collect();
        backward.reverse();
        assert_eq!(forward, backward);
    }
}
