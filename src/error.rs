//! Error taxonomy for the acquisition pipeline and the gacha.

use serde::Serialize;
use thiserror::Error;

/// Failure raised anywhere between fetching the list page and extracting entrants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("no final race found for the venue")]
    NoFeatureRace,

    #[error("no entrants published")]
    NoEntrants,
}

impl ScrapeError {
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn reason(&self) -> FailureReason {
        match self {
            Self::Fetch(_) => FailureReason::FetchError,
            Self::Parse(_) => FailureReason::ParseError,
            Self::NoFeatureRace => FailureReason::NoFeatureRaceFound,
            Self::NoEntrants => FailureReason::NoEntrantsFound,
        }
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        Self::Fetch(err.to_string())
    }
}

/// Why an acquisition run did not produce entrants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NoFeatureRaceFound,
    NoEntrantsFound,
    FetchError,
    ParseError,
}

impl FailureReason {
    /// User-facing message. `venue_label` names the venue in the "not held" case.
    pub fn message(&self, venue_label: &str) -> String {
        match self {
            Self::NoFeatureRaceFound => format!("本日は{}競馬の開催がありません", venue_label),
            Self::NoEntrantsFound => "出走馬がまだ発表されていません".to_string(),
            Self::FetchError | Self::ParseError => "スクレイピングに失敗しました".to_string(),
        }
    }

    /// Business outcomes (nothing to scrape today) as opposed to breakage.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::NoFeatureRaceFound | Self::NoEntrantsFound)
    }
}

/// Rejections from [`crate::gacha::SelectionAnimator`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GachaError {
    #[error("tick must be non-zero and no longer than the duration")]
    InvalidTiming,

    #[error("cannot spin the gacha without entrants")]
    EmptyEntrants,

    #[error("the gacha is already rolling")]
    AlreadyRolling,
}
