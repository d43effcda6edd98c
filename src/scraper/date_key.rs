//! Date-derived identifiers for a venue's race meeting.
//!
//! NAR race IDs have the shape `YYYY CC MMDD RR`: year, venue code,
//! month/day of the meeting and the race number.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, TimeZone, Utc};

/// Venue + calendar date of one meeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceMeetingKey {
    pub venue_code: String,
    pub year: String,
    pub month: String,
    pub day: String,
}

impl RaceMeetingKey {
    /// Derive the key for `date` at the venue identified by `venue_code`.
    pub fn derive(date: NaiveDate, venue_code: &str) -> Self {
        Self {
            venue_code: venue_code.to_string(),
            year: format!("{:04}", date.year()),
            month: format!("{:02}", date.month()),
            day: format!("{:02}", date.day()),
        }
    }

    /// `YYYYMMDD`
    pub fn date_compact(&self) -> String {
        format!("{}{}{}", self.year, self.month, self.day)
    }

    /// Meeting identifier: `YYYY` + venue code + `MMDD`
    pub fn kaisai_id(&self) -> String {
        format!("{}{}{}{}", self.year, self.venue_code, self.month, self.day)
    }

    pub fn feature_race(&self, race_number: u8) -> FeatureRaceRef {
        FeatureRaceRef {
            meeting: self.clone(),
            race_number,
        }
    }
}

/// A meeting's final race, known only after the race list has been matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRaceRef {
    pub meeting: RaceMeetingKey,
    pub race_number: u8,
}

impl FeatureRaceRef {
    pub fn race_number_padded(&self) -> String {
        format!("{:02}", self.race_number)
    }

    /// Full race ID: meeting identifier + two-digit race number
    pub fn race_id(&self) -> String {
        format!("{}{}", self.meeting.kaisai_id(), self.race_number_padded())
    }
}

/// Calendar date at the venue for the instant `now`.
pub fn venue_date(now: DateTime<Utc>, utc_offset_hours: i32) -> NaiveDate {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600).unwrap_or_else(|| {
        tracing::warn!(utc_offset_hours, "Invalid UTC offset, falling back to UTC");
        Utc.fix()
    });
    offset.from_utc_datetime(&now.naive_utc()).date_naive()
}

/// Today's date at the venue.
pub fn venue_today(utc_offset_hours: i32) -> NaiveDate {
    venue_date(Utc::now(), utc_offset_hours)
}
