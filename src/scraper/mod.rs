//! Web scraper module for nar.netkeiba.com
//!
//! Provides date-derived race identifiers, the two page fetchers
//! (headless browser and raw HTTP), and HTML parsing.

pub mod browser;
pub mod date_key;
pub mod document;
pub mod fetch;
pub mod http;
pub mod parsers;

pub use browser::RenderedFetcher;
pub use date_key::{FeatureRaceRef, RaceMeetingKey};
pub use document::Document;
pub use fetch::PageFetcher;
pub use http::RawFetcher;

/// Build race list URL for a meeting
/// URL: https://nar.netkeiba.com/top/race_list.html?kaisai_id=YYYYCCMMDD&kaisai_date=YYYYMMDD&rf=race_list
pub fn race_list_url(base: &str, meeting: &RaceMeetingKey) -> String {
    format!(
        "{}?kaisai_id={}&kaisai_date={}&rf=race_list",
        base,
        meeting.kaisai_id(),
        meeting.date_compact()
    )
}

/// Build race card URL
/// URL: https://nar.netkeiba.com/race/shutuba.html?race_id=YYYYCCMMDDRR&rf=race_list
pub fn race_card_url(base: &str, race: &FeatureRaceRef) -> String {
    format!("{}?race_id={}&rf=race_list", base, race.race_id())
}
