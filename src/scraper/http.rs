//! Direct HTTP fetch for pages served in a legacy encoding.

use std::time::Duration;

use encoding_rs::Encoding;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::Client;
use tracing::{debug, info};

use super::fetch::PageFetcher;
use crate::config::FetchConfig;
use crate::error::ScrapeError;

/// HTTP fetcher that decodes response bytes with a fixed encoding.
///
/// The upstream declares no reliable charset, so the body is read as raw
/// bytes and decoded explicitly.
pub struct RawFetcher {
    client: Client,
    encoding: &'static Encoding,
}

impl RawFetcher {
    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        let encoding = Encoding::for_label(config.legacy_encoding.as_bytes())
            .ok_or_else(|| anyhow::anyhow!("Unknown encoding label: {}", config.legacy_encoding))?;

        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_str(&config.referer)?);

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, encoding })
    }
}

impl PageFetcher for RawFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        info!(%url, "Fetching page over HTTP");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::fetch(format!("HTTP {} from {}", status, url)));
        }

        let bytes = response.bytes().await?;
        debug!(%url, bytes = bytes.len(), "Page downloaded");

        decode(self.encoding, &bytes)
    }
}

/// Decode `bytes` with `encoding`, rejecting malformed sequences
pub fn decode(encoding: &'static Encoding, bytes: &[u8]) -> Result<String, ScrapeError> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or_else(|| ScrapeError::fetch(format!("response is not valid {}", encoding.name())))
}
