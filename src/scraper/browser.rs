//! Browser automation using chromiumoxide.

use std::collections::HashSet;
use std::pin::pin;
use std::time::Duration;

use chromiumoxide::browser::{Browser as ChromeBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::{stream, Stream, StreamExt};
use tracing::{debug, info, warn};

use super::fetch::PageFetcher;
use crate::config::FetchConfig;
use crate::error::ScrapeError;

/// Browser wrapper for web scraping
pub struct Browser {
    browser: ChromeBrowser,
    handle: tokio::task::JoinHandle<()>,
}

impl Browser {
    /// Launch a new headless browser instance
    pub async fn launch(chrome_executable: Option<&str>) -> Result<Self, ScrapeError> {
        // Find Chrome executable
        let chrome_path = chrome_executable.unwrap_or(if cfg!(target_os = "macos") {
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"
        } else if cfg!(target_os = "windows") {
            "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe"
        } else {
            "google-chrome"
        });

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .no_sandbox()
            .disable_default_args()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--mute-audio")
            .window_size(1280, 960)
            .build()
            .map_err(|e| ScrapeError::fetch(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = ChromeBrowser::launch(config)
            .await
            .map_err(|e| ScrapeError::fetch(format!("Failed to launch browser: {}", e)))?;

        // Spawn handler task - must keep running for browser to work
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {}", e);
                }
            }
        });

        Ok(Self { browser, handle })
    }

    /// Fetch page content after client-side rendering has settled
    pub async fn fetch_page(&self, url: &str, settle: Duration, timeout: Duration) -> Result<String, ScrapeError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::fetch(format!("Failed to create new page: {}", e)))?;

        let result = match tokio::time::timeout(timeout, Self::navigate_and_settle(&page, url, settle)).await {
            Ok(Ok(())) => page
                .content()
                .await
                .map_err(|e| ScrapeError::fetch(format!("Failed to get page content: {}", e))),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ScrapeError::fetch(format!(
                "Timed out after {:?} waiting for {}",
                timeout, url
            ))),
        };

        if let Err(e) = page.close().await {
            debug!("Failed to close page: {}", e);
        }

        result
    }

    /// Navigate and wait until no request is in flight for `settle`
    async fn navigate_and_settle(page: &Page, url: &str, settle: Duration) -> Result<(), ScrapeError> {
        let listen_err = |e: CdpError| ScrapeError::fetch(format!("Failed to listen for network events: {}", e));

        // Subscribe before navigating so the first requests are counted
        let started = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(listen_err)?
            .map(|e| NetworkEvent::Started(e.request_id.inner().clone()));
        let finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(listen_err)?
            .map(|e| NetworkEvent::Done(e.request_id.inner().clone()));
        let failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(listen_err)?
            .map(|e| NetworkEvent::Done(e.request_id.inner().clone()));
        let events = stream::select(started, stream::select(finished, failed));

        page.goto(url)
            .await
            .map_err(|e| ScrapeError::fetch(format!("Failed to navigate to {}: {}", url, e)))?;

        wait_for_network_idle(events, settle).await;
        Ok(())
    }

    /// Close the browser
    pub async fn close(mut self) -> Result<(), ScrapeError> {
        let closed = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| ScrapeError::fetch(format!("Failed to close browser: {}", e)));
        // Reap the child process even if the close command failed
        let _ = self.browser.wait().await;
        self.handle.abort();
        closed
    }
}

/// Network activity keyed by CDP request id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    Started(String),
    /// Finished or failed
    Done(String),
}

/// Wait until no request is in flight and no event arrives for `settle`.
///
/// A redirect re-announces the same request id, so requests are tracked as
/// a set rather than counted. Returns early if the stream ends.
pub async fn wait_for_network_idle(events: impl Stream<Item = NetworkEvent>, settle: Duration) {
    let mut events = pin!(events);
    let mut in_flight: HashSet<String> = HashSet::new();

    loop {
        match tokio::time::timeout(settle, events.next()).await {
            Ok(Some(NetworkEvent::Started(id))) => {
                in_flight.insert(id);
            }
            Ok(Some(NetworkEvent::Done(id))) => {
                in_flight.remove(&id);
            }
            Ok(None) => break,
            Err(_) if in_flight.is_empty() => break,
            Err(_) => debug!(in_flight = in_flight.len(), "Network still busy"),
        }
    }
}

/// Fetcher that renders each page in its own short-lived browser session
pub struct RenderedFetcher {
    chrome_executable: Option<String>,
    settle: Duration,
    timeout: Duration,
}

impl RenderedFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            chrome_executable: config.chrome_executable.clone(),
            settle: Duration::from_millis(config.settle_ms),
            timeout: Duration::from_millis(config.wait_timeout_ms),
        }
    }
}

impl PageFetcher for RenderedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        info!(%url, "Fetching page with headless browser");

        let browser = tokio::time::timeout(self.timeout, Browser::launch(self.chrome_executable.as_deref()))
            .await
            .map_err(|_| ScrapeError::fetch("Timed out launching browser"))??;

        let result = browser.fetch_page(url, self.settle, self.timeout).await;

        // Released on every path; a failed teardown never masks the result
        if let Err(e) = browser.close().await {
            warn!("Browser teardown failed: {}", e);
        }

        if let Ok(html) = &result {
            debug!(%url, bytes = html.len(), "Rendered page captured");
        }
        result
    }
}
