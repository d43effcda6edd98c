//! HTML parsers for nar.netkeiba.com pages.

pub mod race_card;
pub mod race_list;

pub use race_card::RaceCardParser;
pub use race_list::RaceListParser;
