//! Configuration model and settings store abstraction.
//!
//! The whole configuration is one serde document replaced atomically; the
//! scheduler and monitor loops re-read it every cycle so edits take effect
//! without restarts.

use async_trait::async_trait;
use chrono::{NaiveTime, Weekday};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AubadeError, AubadeResult};
use crate::schedule::{DaySchedule, HolidaySchedule};

/// Placeholder address used before a speaker has been configured.
pub const DEFAULT_PLACEHOLDER_IP: &str = "10.0.0.0";

/// A speaker under automation control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerTarget {
    /// LAN address of the speaker.
    pub ip_address: String,
    /// Display name for logs and session records.
    #[serde(default)]
    pub name: String,
    /// Cached RINCON UUID. Group membership answers only cover speakers
    /// whose UUID has been cached here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Per-speaker volume override applied at start, falling back to the
    /// global default volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_volume: Option<u8>,
}

/// A named media source (station stream, Spotify URL or YouTube Music URL).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaEntry {
    pub name: String,
    pub url: String,
}

impl MediaEntry {
    fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

fn default_volume() -> u8 {
    10
}

fn default_max_volume() -> u8 {
    100
}

fn default_start_time() -> NaiveTime {
    NaiveTime::from_hms_opt(6, 0, 0).unwrap_or_default()
}

fn default_stop_time() -> NaiveTime {
    NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default()
}

fn default_ip() -> String {
    DEFAULT_PLACEHOLDER_IP.to_string()
}

fn all_weekdays() -> Vec<Weekday> {
    vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ]
}

fn default_stations() -> Vec<MediaEntry> {
    vec![
        MediaEntry::new(
            "Antenne Vorarlberg",
            "web.radio.antennevorarlberg.at/av-live/stream/mp3",
        ),
        MediaEntry::new("Radio V", "orf-live.ors-shoutcast.at/vbg-q2a"),
        MediaEntry::new(
            "Rock Antenne Bayern",
            "stream.rockantenne.bayern/80er-rock/stream/mp3",
        ),
        MediaEntry::new("Kronehit", "onair.krone.at/kronehit.mp3"),
        MediaEntry::new("Ö3", "orf-live.ors-shoutcast.at/oe3-q2a"),
        MediaEntry::new("Radio Paloma", "www3.radiopaloma.de/RP-Hauptkanal.pls"),
    ]
}

fn default_spotify_items() -> Vec<MediaEntry> {
    vec![
        MediaEntry::new(
            "Top 50 Global",
            "https://open.spotify.com/playlist/37i9dQZEVXbMDoHDwVN2tF",
        ),
        MediaEntry::new(
            "Astroworld",
            "https://open.spotify.com/album/41GuZcammIkupMPKH2OJ6I",
        ),
    ]
}

fn default_youtube_music_items() -> Vec<MediaEntry> {
    vec![
        MediaEntry::new("Supermix", "https://music.youtube.com/playlist?list=LM"),
        MediaEntry::new(
            "Energize",
            "https://music.youtube.com/watch?v=dQw4w9WgXcQ",
        ),
    ]
}

/// The whole automation configuration, replaced as one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Default playback volume (0-100).
    pub volume: u8,
    /// Upper bound accepted for any volume write.
    pub max_volume: u8,
    /// Default start of the playback window.
    pub start_time: NaiveTime,
    /// Default end of the playback window.
    pub stop_time: NaiveTime,
    /// Legacy single-speaker address; kept for configs that predate the
    /// roster. The placeholder value means "unset".
    pub ip_address: String,
    /// Speakers under automation; the first entry is the sync master.
    pub speakers: Vec<SpeakerTarget>,
    /// Known internet radio stations.
    pub stations: Vec<MediaEntry>,
    /// Known Spotify tracks/playlists/albums.
    pub spotify_items: Vec<MediaEntry>,
    /// Known YouTube Music tracks/playlists.
    pub youtube_music_items: Vec<MediaEntry>,
    /// Explicit station autoplay fallback; also the audible-output fallback
    /// handed to YouTube Music playback.
    pub auto_play_station_url: Option<String>,
    /// Explicit Spotify autoplay fallback.
    pub auto_play_spotify_url: Option<String>,
    /// Explicit YouTube Music autoplay fallback.
    pub auto_play_youtube_music_url: Option<String>,
    /// Pick a random known station at start.
    pub auto_play_random_station: bool,
    /// Pick a random known Spotify item at start.
    pub auto_play_random_spotify: bool,
    /// Pick a random known YouTube Music item at start.
    pub auto_play_random_youtube_music: bool,
    /// Per-weekday schedule overrides.
    pub daily_schedules: HashMap<Weekday, DaySchedule>,
    /// Date-pinned overrides; these win over the weekday entry.
    pub holiday_schedules: Vec<HolidaySchedule>,
    /// Weekdays on which the automation runs at all. An empty list disables
    /// every day; an absent field means all seven.
    pub active_days: Vec<Weekday>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            max_volume: default_max_volume(),
            start_time: default_start_time(),
            stop_time: default_stop_time(),
            ip_address: default_ip(),
            speakers: Vec::new(),
            stations: default_stations(),
            spotify_items: default_spotify_items(),
            youtube_music_items: default_youtube_music_items(),
            auto_play_station_url: None,
            auto_play_spotify_url: None,
            auto_play_youtube_music_url: None,
            auto_play_random_station: false,
            auto_play_random_spotify: false,
            auto_play_random_youtube_music: false,
            daily_schedules: HashMap::new(),
            holiday_schedules: Vec::new(),
            active_days: all_weekdays(),
        }
    }
}

impl Settings {
    /// Returns true when `day` is enabled for automation.
    #[must_use]
    pub fn is_active_day(&self, day: Weekday) -> bool {
        self.active_days.contains(&day)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings Store
// ─────────────────────────────────────────────────────────────────────────────

/// Storage abstraction for the configuration document.
///
/// `load` returns `None` while no document exists yet; callers treat that as
/// "retry shortly" rather than an error.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Reads the current settings snapshot.
    async fn load(&self) -> Option<Settings>;

    /// Replaces the whole settings document.
    async fn replace(&self, settings: Settings) -> AubadeResult<()>;
}

/// In-memory settings store for embedding and tests.
#[derive(Default)]
pub struct MemorySettingsStore {
    inner: RwLock<Option<Settings>>,
}

impl MemorySettingsStore {
    /// Creates an empty store (loads return `None`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `settings`.
    #[must_use]
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            inner: RwLock::new(Some(settings)),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Option<Settings> {
        self.inner.read().clone()
    }

    async fn replace(&self, settings: Settings) -> AubadeResult<()> {
        *self.inner.write() = Some(settings);
        Ok(())
    }
}

impl From<serde_json::Error> for AubadeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Settings(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.volume, 10);
        assert_eq!(settings.max_volume, 100);
        assert_eq!(settings.start_time, NaiveTime::from_hms_opt(6, 0, 0).unwrap());
        assert_eq!(settings.stop_time, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        assert_eq!(settings.ip_address, DEFAULT_PLACEHOLDER_IP);
        assert_eq!(settings.stations.len(), 6);
        assert_eq!(settings.active_days.len(), 7);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str("{}").expect("empty doc should parse");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn explicit_empty_active_days_disable_all() {
        let settings: Settings =
            serde_json::from_str(r#"{"activeDays":[]}"#).expect("should parse");
        assert!(!settings.is_active_day(Weekday::Mon));
    }

    #[test]
    fn settings_round_trip_through_json() {
        let mut settings = Settings::default();
        settings.speakers.push(SpeakerTarget {
            ip_address: "192.168.1.50".into(),
            name: "Kitchen".into(),
            uuid: Some("RINCON_000E58AA".into()),
            startup_volume: Some(25),
        });
        let json = serde_json::to_string(&settings).expect("serialize");
        let back: Settings = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, settings);
    }

    #[tokio::test]
    async fn memory_store_replace_then_load() {
        let store = MemorySettingsStore::new();
        assert!(store.load().await.is_none());

        store.replace(Settings::default()).await.expect("replace");
        assert!(store.load().await.is_some());
    }
}
