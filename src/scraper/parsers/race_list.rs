//! Race list parser for nar.netkeiba.com
//!
//! Finds the venue's final race on the day's race list page.
//! URL: https://nar.netkeiba.com/top/race_list.html?kaisai_id=...

use tracing::debug;

use crate::config::SelectorConfig;
use crate::error::ScrapeError;
use crate::scraper::document::{closest, compile, text_of, Document};

/// One race row of the list page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceListEntry {
    /// Header text of the enclosing venue group
    pub venue: String,
    pub title: String,
    /// Raw race number text, e.g. "12R"
    pub race_number: String,
}

/// Parser for race list pages
pub struct RaceListParser;

impl RaceListParser {
    /// The row of the venue's final race, if the page lists one
    pub fn final_race_entry(
        doc: &Document,
        selectors: &SelectorConfig,
        venue_label: &str,
        marker: &str,
    ) -> Result<Option<RaceListEntry>, ScrapeError> {
        let header_sel = compile(&selectors.group_header)?;
        let item_sel = compile(&selectors.item)?;
        let title_sel = compile(&selectors.item_title)?;
        let number_sel = compile(&selectors.race_number)?;

        let groups = doc.select_containing(&selectors.group, &selectors.group_header, venue_label)?;
        debug!(venue_label, groups = groups.len(), "Matched venue groups");

        for group in groups {
            let venue = group
                .select(&header_sel)
                .next()
                .map(|h| text_of(&h))
                .unwrap_or_default();

            for title in group.select(&title_sel) {
                let title_text = text_of(&title);
                if !title_text.contains(marker) {
                    continue;
                }
                let Some(item) = closest(title, &item_sel) else {
                    continue;
                };
                let race_number = item
                    .select(&number_sel)
                    .next()
                    .map(|n| text_of(&n))
                    .unwrap_or_default();

                return Ok(Some(RaceListEntry {
                    venue,
                    title: title_text,
                    race_number,
                }));
            }
        }

        Ok(None)
    }

    /// Race number of the venue's final race.
    ///
    /// Returns `ScrapeError::NoFeatureRace` when the venue has no group on the
    /// page, no item carries the marker, or the race number is unusable.
    pub fn find_final_race(
        doc: &Document,
        selectors: &SelectorConfig,
        venue_label: &str,
        marker: &str,
    ) -> Result<u8, ScrapeError> {
        let Some(entry) = Self::final_race_entry(doc, selectors, venue_label, marker)? else {
            debug!(venue_label, marker, "No final race on the list");
            return Err(ScrapeError::NoFeatureRace);
        };

        let number = strip_race_suffix(&entry.race_number)
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| *n > 0)
            .ok_or(ScrapeError::NoFeatureRace)?;

        debug!(race_number = number, venue = %entry.venue, title = %entry.title, "Final race located");
        Ok(number)
    }
}

/// Strip the trailing race-number suffix: "12R" -> "12".
///
/// Returns `None` unless what remains is a non-empty run of digits.
pub fn strip_race_suffix(text: &str) -> Option<String> {
    let digits = text.trim().trim_end_matches(|c: char| !c.is_ascii_digit());
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(digits.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<dl class="RaceList_DataList">
  <dt class="RaceList_DataHeader"><p class="RaceList_DataTitle">笠松</p></dt>
  <dd>
    <ul>
      <li class="RaceList_DataItem"><div class="Race_Num">1R</div><span class="ItemTitle">C4</span></li>
      <li class="RaceList_DataItem"><div class="Race_Num">11R</div><span class="ItemTitle">ファイナルレース</span></li>
    </ul>
  </dd>
</dl>
<dl class="RaceList_DataList">
  <dt class="RaceList_DataHeader"><p class="RaceList_DataTitle"> 高知 </p></dt>
  <dd>
    <ul>
      <li class="RaceList_DataItem"><div class="Race_Num">1R</div><span class="ItemTitle">C3-4</span></li>
      <li class="RaceList_DataItem"><div class="Race_Num">9R</div><span class="ItemTitle">黒潮スプリンターズ</span></li>
      <li class="RaceList_DataItem"><div class="Race_Num">12R</div><span class="ItemTitle">一発逆転ファイナルレース</span></li>
    </ul>
  </dd>
</dl>
</body>
</html>"#;

    fn find(html: &str) -> Result<u8, ScrapeError> {
        let doc = Document::parse(html).unwrap();
        RaceListParser::find_final_race(&doc, &SelectorConfig::default(), "高知", "ファイナルレース")
    }

    #[test]
    fn test_strip_race_suffix() {
        assert_eq!(strip_race_suffix("9R").as_deref(), Some("9"));
        assert_eq!(strip_race_suffix("12R").as_deref(), Some("12"));
        assert_eq!(strip_race_suffix(" 10R\n").as_deref(), Some("10"));
        assert_eq!(strip_race_suffix("7").as_deref(), Some("7"));
        assert_eq!(strip_race_suffix("R"), None);
        assert_eq!(strip_race_suffix(""), None);
        assert_eq!(strip_race_suffix("第1R"), None);
    }

    #[test]
    fn test_final_race_entry() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let entry = RaceListParser::final_race_entry(&doc, &SelectorConfig::default(), "高知", "ファイナルレース")
            .unwrap()
            .unwrap();

        assert_eq!(entry.venue, "高知");
        assert_eq!(entry.title, "一発逆転ファイナルレース");
        assert_eq!(entry.race_number, "12R");
    }

    #[test]
    fn test_find_final_race_for_venue() {
        // The other venue's final race comes first and must be skipped
        assert_eq!(find(SAMPLE_HTML).unwrap(), 12);
    }

    #[test]
    fn test_no_venue_group() {
        let html = SAMPLE_HTML.replace("高知", "佐賀");
        assert_eq!(find(&html), Err(ScrapeError::NoFeatureRace));
    }

    #[test]
    fn test_venue_without_final_race() {
        let html = SAMPLE_HTML.replace("一発逆転ファイナルレース", "土佐春花賞");
        assert_eq!(find(&html), Err(ScrapeError::NoFeatureRace));
    }

    #[test]
    fn test_empty_race_number() {
        let html = SAMPLE_HTML.replace(">12R<", "><");
        assert_eq!(find(&html), Err(ScrapeError::NoFeatureRace));
    }

    #[test]
    fn test_zero_race_number() {
        let html = SAMPLE_HTML.replace(">12R<", ">0R<");
        assert_eq!(find(&html), Err(ScrapeError::NoFeatureRace));
    }

    #[test]
    fn test_invalid_selector_is_parse_error() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let selectors = SelectorConfig {
            item: "li[[".to_string(),
            ..Default::default()
        };
        let result = RaceListParser::find_final_race(&doc, &selectors, "高知", "ファイナルレース");
        assert!(matches!(result, Err(ScrapeError::Parse(_))));
    }
}
