// src/checker/html.rs
// =============================================================================
// This module extracts link and image references from HTML pages and
// normalizes URLs.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// We also use the `url` crate to:
// - Resolve relative URLs to absolute URLs
// - Strip fragments and build the canonical de-duplication key
//
// Rust concepts:
// - Iterators: descendants() walks the DOM in document order
// - Option combinators: map_or, and_then, ok()
// =============================================================================

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// What kind of reference pointed at a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    /// `<a href>`
    PageLink,
    /// `<img src>`
    Image,
}

/// One reference found on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Absolute, fragment-free URL
    pub url: Url,
    pub kind: TargetKind,
}

// Extracts every hyperlink and image reference from HTML content
//
// Parameters:
//   html: the HTML content to parse
//   page_url: the URL the page was served from (after redirects)
//
// Relative references resolve against <base href> when the document has
// one. Scheme filtering is left to the classifier, so mailto: and friends
// come back too.
//
// Example:
//   html = "<a href='/docs'>Docs</a><img src='logo.png'>"
//   page_url = "https://example.com/"
//   result = [PageLink https://example.com/docs, Image https://example.com/logo.png]
pub fn extract_references(html: &str, page_url: &Url) -> Vec<Reference> {
    let document = Html::parse_document(html);

    // Our selectors are constants, so they're parsed with a fallback instead of panicking
    let links = selector("a[href]");
    let images = selector("img[src]");
    let base_tag = selector("base[href]");

    let base = base_tag
        .as_ref()
        .and_then(|sel| document.select(sel).next())
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .unwrap_or_else(|| page_url.clone());

    let mut references = Vec::new();

    // Walk the whole tree once so links and images keep document order
    for element in document.root_element().descendants().filter_map(scraper::ElementRef::wrap) {
        let (attr, kind) = if links.as_ref().map_or(false, |s| s.matches(&element)) {
            ("href", TargetKind::PageLink)
        } else if images.as_ref().map_or(false, |s| s.matches(&element)) {
            ("src", TargetKind::Image)
        } else {
            continue;
        };

        if let Some(value) = element.value().attr(attr) {
            if let Some(url) = resolve_reference(&base, value) {
                references.push(Reference { url, kind });
            }
        }
    }

    references
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::error!(css, error = ?e, "invalid selector");
            None
        }
    }
}

// Resolves a possibly-relative reference to an absolute, fragment-free URL
//
// Returns None for empty references, same-page anchors ("#top") and
// anything the url crate can't make sense of.
fn resolve_reference(base: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }
    base.join(raw).ok().map(normalize)
}

/// Strips the fragment, the url crate already lower-cases the host and
/// drops default ports.
pub fn normalize(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

/// De-duplication key: scheme + host + port + path + query, fragment
/// stripped, trailing slashes removed from non-root paths.
///
///   https://Example.com/docs/#intro  ->  https://example.com/docs
///   https://example.com              ->  https://example.com/
pub fn canonical_key(url: &Url) -> String {
    let mut key = format!("{}://{}", url.scheme(), url.host_str().unwrap_or(""));
    if let Some(port) = url.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }

    let path = url.path().trim_end_matches('/');
    if path.is_empty() {
        key.push('/');
    } else {
        key.push_str(path);
    }

    if let Some(query) = url.query() {
        key.push('?');
        key.push_str(query);
    }
    key
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why one walk instead of two select() calls?
//    - select("a") then select("img") returns all links, then all images
//    - Walking the tree once keeps the order the page has, which is the
//      order targets show up in the report
//
// 2. Why strip the fragment?
//    - /page#a and /page#b are the same document
//    - The server never sees the fragment anyway
//
// 3. What does Url::join handle?
//    - Relative paths (../about), absolute paths (/docs), full URLs and
//      protocol-relative ones (//cdn.example.com/x.png)
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn page(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn urls(refs: &[Reference]) -> Vec<String> {
        refs.iter().map(|r| r.url.to_string()).collect()
    }

    #[test]
    fn test_extract_absolute_link() {
        let html = r#"<a href="https://www.rust-lang.org">Rust</a>"#;
        let refs = extract_references(html, &page("https://example.com"));
        assert_eq!(urls(&refs), vec!["https://www.rust-lang.org/"]);
        assert_eq!(refs[0].kind, TargetKind::PageLink);
    }

    #[test]
    fn test_resolve_relative_link() {
        let html = r#"<a href="/docs">Docs</a>"#;
        let refs = extract_references(html, &page("https://example.com/page"));
        assert_eq!(urls(&refs), vec!["https://example.com/docs"]);
    }

    #[test]
    fn test_images_are_extracted_in_document_order() {
        let html = r#"
            <img src="/logo.png">
            <a href="/about">About</a>
            <img src="https://cdn.example.com/hero.jpg">
        "#;
        let refs = extract_references(html, &page("https://example.com/"));
        let kinds: Vec<_> = refs.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![TargetKind::Image, TargetKind::PageLink, TargetKind::Image]
        );
        assert_eq!(refs[0].url.as_str(), "https://example.com/logo.png");
    }

    #[test]
    fn test_fragments_are_stripped_and_anchors_skipped() {
        let html = r##"
            <a href="#top">Top</a>
            <a href="/docs#install">Install</a>
            <a href="">Empty</a>
        "##;
        let refs = extract_references(html, &page("https://example.com/"));
        assert_eq!(urls(&refs), vec!["https://example.com/docs"]);
    }

    #[test]
    fn test_base_href_is_honoured() {
        let html = r#"
            <head><base href="https://example.com/blog/"></head>
            <a href="post-1">Post</a>
        "#;
        let refs = extract_references(html, &page("https://example.com/"));
        assert_eq!(urls(&refs), vec!["https://example.com/blog/post-1"]);
    }

    #[test]
    fn test_mailto_is_returned_for_the_classifier() {
        let html = r#"<a href="mailto:test@example.com">Email</a>"#;
        let refs = extract_references(html, &page("https://example.com"));
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].url.scheme(), "mailto");
    }

    #[test]
    fn test_canonical_key_normalizes_trailing_slash_and_case() {
        assert_eq!(
            canonical_key(&page("https://Example.com/docs/#intro")),
            "https://example.com/docs"
        );
        assert_eq!(
            canonical_key(&page("https://example.com/docs")),
            canonical_key(&page("https://example.com/docs/"))
        );
        assert_eq!(canonical_key(&page("https://example.com")), "https://example.com/");
        assert_eq!(
            canonical_key(&page("http://example.com:8080/a/?q=1")),
            "http://example.com:8080/a?q=1"
        );
    }

    #[test]
    fn test_canonical_key_keeps_query_and_scheme_apart() {
        assert_ne!(
            canonical_key(&page("https://example.com/a?x=1")),
            canonical_key(&page("https://example.com/a?x=2"))
        );
        assert_ne!(
            canonical_key(&page("http://example.com/")),
            canonical_key(&page("https://example.com/"))
        );
    }
}
