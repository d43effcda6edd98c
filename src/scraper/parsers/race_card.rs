//! Race card (shutuba) parser for nar.netkeiba.com.

use crate::error::ScrapeError;
use crate::scraper::document::{text_of, Document};

/// Parser for race card pages
pub struct RaceCardParser;

impl RaceCardParser {
    /// Entrant names in document order.
    ///
    /// Duplicates are kept; blank cells are skipped. An empty result is not
    /// an error here.
    pub fn entrant_names(doc: &Document, entrant_selector: &str) -> Result<Vec<String>, ScrapeError> {
        let names = doc
            .select_all(entrant_selector)?
            .iter()
            .map(text_of)
            .filter(|name| !name.is_empty())
            .collect();

        Ok(names)
    }
}
