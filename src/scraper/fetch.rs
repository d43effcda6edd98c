//! Page retrieval strategies.

use std::future::Future;

use crate::error::ScrapeError;

/// Retrieves a page as decoded markup text.
///
/// Implemented by [`super::browser::RenderedFetcher`] for script-rendered
/// pages and [`super::http::RawFetcher`] for static legacy-encoded pages.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, ScrapeError>> + Send;
}
