//! Acquisition pipeline: today's final-race entrants for the configured venue.
//!
//! The race list is rendered by client-side script, so it is always fetched
//! through the browser; the race card is static and legacy-encoded, so it is
//! always fetched over plain HTTP. Steps run once, in order, with no retries.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::{AppConfig, FetchConfig, SelectorConfig, VenueConfig};
use crate::error::{FailureReason, ScrapeError};
use crate::scraper::date_key::venue_today;
use crate::scraper::parsers::{RaceCardParser, RaceListParser};
use crate::scraper::{
    race_card_url, race_list_url, Document, PageFetcher, RaceMeetingKey, RawFetcher, RenderedFetcher,
};

/// Outcome of one acquisition run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionResult {
    /// Entrant names in race card order; never empty
    Success(Vec<String>),
    Failure { reason: FailureReason, message: String },
}

impl AcquisitionResult {
    pub fn failure(reason: FailureReason, venue_label: &str) -> Self {
        Self::Failure {
            reason,
            message: reason.message(venue_label),
        }
    }
}

/// Pipeline over a rendering fetcher `R` (race list) and a raw fetcher `D` (race card)
pub struct AcquisitionPipeline<R, D> {
    venue: VenueConfig,
    fetch: FetchConfig,
    selectors: SelectorConfig,
    rendered: R,
    raw: D,
}

/// Pipeline wired to the real browser and HTTP client
pub type LivePipeline = AcquisitionPipeline<RenderedFetcher, RawFetcher>;

impl LivePipeline {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            config,
            RenderedFetcher::new(&config.fetch),
            RawFetcher::new(&config.fetch)?,
        ))
    }
}

impl<R: PageFetcher, D: PageFetcher> AcquisitionPipeline<R, D> {
    pub fn new(config: &AppConfig, rendered: R, raw: D) -> Self {
        Self {
            venue: config.venue.clone(),
            fetch: config.fetch.clone(),
            selectors: config.selectors.clone(),
            rendered,
            raw,
        }
    }

    /// Run for today's date at the venue
    pub async fn run_today(&self) -> AcquisitionResult {
        self.run(venue_today(self.venue.utc_offset_hours)).await
    }

    /// Run for `date`. Never fails: every error becomes a `Failure`.
    pub async fn run(&self, date: NaiveDate) -> AcquisitionResult {
        match self.acquire(date).await {
            Ok(entrants) => {
                info!(%date, entrants = entrants.len(), "Acquisition succeeded");
                AcquisitionResult::Success(entrants)
            }
            Err(e) => {
                let reason = e.reason();
                if reason.is_expected() {
                    info!(%date, ?reason, "Nothing to scrape: {}", e);
                } else {
                    warn!(%date, ?reason, "Acquisition failed: {}", e);
                }
                AcquisitionResult::failure(reason, &self.venue.label)
            }
        }
    }

    async fn acquire(&self, date: NaiveDate) -> Result<Vec<String>, ScrapeError> {
        let meeting = RaceMeetingKey::derive(date, &self.venue.code);

        let list_url = race_list_url(&self.fetch.list_base_url, &meeting);
        let list_html = self.rendered.fetch(&list_url).await?;
        let race_number = self.locate_final_race(&list_html)?;

        let race = meeting.feature_race(race_number);
        info!(race_id = %race.race_id(), "Final race found");

        let card_url = race_card_url(&self.fetch.detail_base_url, &race);
        let card_html = self.raw.fetch(&card_url).await?;
        self.extract_entrants(&card_html)
    }

    fn locate_final_race(&self, html: &str) -> Result<u8, ScrapeError> {
        let doc = Document::parse(html)?;
        RaceListParser::find_final_race(
            &doc,
            &self.selectors,
            &self.venue.label,
            &self.venue.final_race_marker,
        )
    }

    /// Entrant names; never empty
    fn extract_entrants(&self, html: &str) -> Result<Vec<String>, ScrapeError> {
        let doc = Document::parse(html)?;
        let names = RaceCardParser::entrant_names(&doc, &self.selectors.entrant)?;
        if names.is_empty() {
            return Err(ScrapeError::NoEntrants);
        }
        Ok(names)
    }
}
