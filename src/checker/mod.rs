// src/checker/mod.rs
// =============================================================================
// This module contains all link checking logic.
//
// Submodules:
// - fetch: Makes single HTTP requests (page fetches and existence probes)
// - render: Headless-browser fetches (feature "render")
// - classify: Decides if a URL is internal, external or not checkable
// - html: Extracts links and images from HTML pages, normalizes URLs
// - policy: Host/status exceptions (LinkedIn 999 and friends)
// - validate: Turns responses into ok / warning / error outcomes
//
// This file (mod.rs) is the module root - it re-exports the public API
// that the crawler and main.rs use.
//
// Rust concepts:
// - Module tree: private submodules, public API through `pub use`
// - cfg attributes: render.rs only exists in builds with the "render" feature
// =============================================================================

mod classify;
mod fetch;
mod html;
mod policy;
#[cfg(feature = "render")]
mod render;
mod validate;

pub use classify::{Classification, Scope};
pub use fetch::{FetchMode, FetchOutcome, Fetcher, HttpFetcher, HttpSettings};
pub use html::{canonical_key, extract_references, normalize, Reference, TargetKind};
pub use policy::PolicyTable;
#[cfg(feature = "render")]
pub use render::RenderingFetcher;
pub use validate::{Failure, LinkCheckResult, Outcome, TargetKey, Validator};

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why is render behind #[cfg(feature = "render")]?
//    - chromiumoxide brings a whole DevTools protocol client with it
//    - Cargo.toml declares `render = ["dep:chromiumoxide"]`, so the crate
//      is only downloaded and compiled when asked for
//    - The same cfg goes on both the `mod` and the `pub use`
//
// 2. Why re-export at all?
//    - crawl/ and main.rs write `checker::Validator`, not
//      `checker::validate::Validator`
//    - Helpers that are not re-exported stay private to checker/
// -----------------------------------------------------------------------------
