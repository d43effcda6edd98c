//! Configuration for the Keiba gacha service.

use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Target venue and the marker identifying its final race
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    /// Numeric venue code used in race IDs (54 = Kochi)
    #[serde(default = "default_venue_code")]
    pub code: String,
    /// Venue name as printed in the race list headers
    #[serde(default = "default_venue_label")]
    pub label: String,
    #[serde(default = "default_final_race_marker")]
    pub final_race_marker: String,
    /// Offset of the venue's local time from UTC, used to decide "today"
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

fn default_venue_code() -> String {
    "54".to_string()
}

fn default_venue_label() -> String {
    "高知".to_string()
}

fn default_final_race_marker() -> String {
    "ファイナルレース".to_string()
}

fn default_utc_offset_hours() -> i32 {
    9
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            code: default_venue_code(),
            label: default_venue_label(),
            final_race_marker: default_final_race_marker(),
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

/// Page fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_list_base_url")]
    pub list_base_url: String,
    #[serde(default = "default_detail_base_url")]
    pub detail_base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_referer")]
    pub referer: String,
    /// Encoding label of the detail page (WHATWG label)
    #[serde(default = "default_legacy_encoding")]
    pub legacy_encoding: String,
    /// Upper bound for navigation plus network settling in the browser
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
    /// Quiet window with no network activity before a page counts as rendered
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub chrome_executable: Option<String>,
}

fn default_list_base_url() -> String {
    "https://nar.netkeiba.com/top/race_list.html".to_string()
}

fn default_detail_base_url() -> String {
    "https://nar.netkeiba.com/race/shutuba.html".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64)".to_string()
}

fn default_referer() -> String {
    "https://www.netkeiba.com/".to_string()
}

fn default_legacy_encoding() -> String {
    "EUC-JP".to_string()
}

fn default_wait_timeout_ms() -> u64 {
    8000
}

fn default_settle_ms() -> u64 {
    500
}

fn default_request_timeout_ms() -> u64 {
    10000
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            list_base_url: default_list_base_url(),
            detail_base_url: default_detail_base_url(),
            user_agent: default_user_agent(),
            referer: default_referer(),
            legacy_encoding: default_legacy_encoding(),
            wait_timeout_ms: default_wait_timeout_ms(),
            settle_ms: default_settle_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            chrome_executable: None,
        }
    }
}

/// CSS selectors for the race list and race card markup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default = "default_group_header")]
    pub group_header: String,
    #[serde(default = "default_item")]
    pub item: String,
    #[serde(default = "default_item_title")]
    pub item_title: String,
    #[serde(default = "default_race_number")]
    pub race_number: String,
    #[serde(default = "default_entrant")]
    pub entrant: String,
}

fn default_group() -> String {
    ".RaceList_DataList".to_string()
}

fn default_group_header() -> String {
    ".RaceList_DataHeader".to_string()
}

fn default_item() -> String {
    ".RaceList_DataItem".to_string()
}

fn default_item_title() -> String {
    ".ItemTitle".to_string()
}

fn default_race_number() -> String {
    ".Race_Num".to_string()
}

fn default_entrant() -> String {
    ".HorseList .HorseName".to_string()
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            group: default_group(),
            group_header: default_group_header(),
            item: default_item(),
            item_title: default_item_title(),
            race_number: default_race_number(),
            entrant: default_entrant(),
        }
    }
}

/// Gacha timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GachaConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
}

fn default_tick_ms() -> u64 {
    100
}

fn default_duration_ms() -> u64 {
    2000
}

impl Default for GachaConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            duration_ms: default_duration_ms(),
        }
    }
}

impl GachaConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tick_ms == 0 {
            anyhow::bail!("gacha.tick_ms must be positive");
        }
        if self.duration_ms < self.tick_ms {
            anyhow::bail!(
                "gacha.duration_ms ({}) must be at least gacha.tick_ms ({})",
                self.duration_ms,
                self.tick_ms
            );
        }
        Ok(())
    }
}

/// Named store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_field")]
    pub field: String,
}

fn default_db_path() -> String {
    "data/gacha.db".to_string()
}

fn default_collection() -> String {
    "horses".to_string()
}

fn default_field() -> String {
    "name".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            collection: default_collection(),
            field: default_field(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub venue: VenueConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub gacha: GachaConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from environment and config file
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables (GACHA__SERVER__PORT, etc.)
            .add_source(
                config::Environment::with_prefix("GACHA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app: AppConfig = config.try_deserialize()?;
        app.gacha.validate()?;
        Ok(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.venue.code, "54");
        assert_eq!(config.venue.utc_offset_hours, 9);
        assert_eq!(config.fetch.legacy_encoding, "EUC-JP");
        assert_eq!(config.selectors.entrant, ".HorseList .HorseName");
        assert_eq!(config.gacha.tick_ms, 100);
        assert_eq!(config.gacha.duration_ms, 2000);
    }

    #[test]
    fn test_gacha_validation() {
        assert!(GachaConfig::default().validate().is_ok());

        let zero_tick = GachaConfig {
            tick_ms: 0,
            duration_ms: 2000,
        };
        assert!(zero_tick.validate().is_err());

        let short = GachaConfig {
            tick_ms: 100,
            duration_ms: 50,
        };
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"venue": {"code": "47", "label": "笠松"}}"#).unwrap();
        assert_eq!(config.venue.code, "47");
        assert_eq!(config.venue.label, "笠松");
        assert_eq!(config.venue.final_race_marker, "ファイナルレース");
        assert_eq!(config.server.host, "0.0.0.0");
    }
}
