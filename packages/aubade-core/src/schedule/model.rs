//! Schedule types and playback eligibility rules.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

fn default_synced() -> bool {
    true
}

/// Per-day overrides of the playback window and source.
///
/// Every field is optional; absent values fall back to the global defaults
/// in [`Settings`](crate::settings::Settings).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DaySchedule {
    /// Start of the playback window.
    pub start_time: Option<NaiveTime>,
    /// End of the playback window.
    pub stop_time: Option<NaiveTime>,
    /// Explicit station stream for this day.
    pub station_url: Option<String>,
    /// Explicit Spotify URL for this day.
    pub spotify_url: Option<String>,
    /// Explicit YouTube Music URL for this day.
    pub youtube_music_url: Option<String>,
    /// Pick a random known station instead of an explicit source.
    pub play_random_station: bool,
    /// Pick a random known Spotify item instead of an explicit source.
    pub play_random_spotify: bool,
    /// Pick a random known YouTube Music item instead of an explicit source.
    pub play_random_youtube_music: bool,
    /// Group all speakers behind the first one and command only the master.
    /// Defaults to true.
    #[serde(default = "default_synced")]
    pub is_synced_playback: bool,
}

impl Default for DaySchedule {
    fn default() -> Self {
        Self {
            start_time: None,
            stop_time: None,
            station_url: None,
            spotify_url: None,
            youtube_music_url: None,
            play_random_station: false,
            play_random_spotify: false,
            play_random_youtube_music: false,
            is_synced_playback: true,
        }
    }
}

impl DaySchedule {
    /// Returns true when this schedule names any playback source.
    #[must_use]
    pub fn has_playback_target(&self) -> bool {
        self.play_random_station
            || self.play_random_spotify
            || self.play_random_youtube_music
            || non_blank(&self.station_url)
            || non_blank(&self.spotify_url)
            || non_blank(&self.youtube_music_url)
    }
}

fn non_blank(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// A [`DaySchedule`] pinned to a calendar date. Wins over the weekday entry
/// for that date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidaySchedule {
    /// The date this override applies to.
    pub date: NaiveDate,
    /// Display name (e.g. the calendar event summary).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Explicitly silence this date.
    #[serde(default)]
    pub skip_playback: bool,
    /// The window and source overrides for the date.
    #[serde(flatten)]
    pub day: DaySchedule,
}

impl HolidaySchedule {
    /// Returns true when this date should produce no playback.
    ///
    /// A holiday is silent when marked as such or when it names no playback
    /// source at all. Plain weekday schedules are never silenced this way.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.skip_playback || !self.day.has_playback_target()
    }
}

/// The schedule governing one concrete date.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedSchedule {
    /// The weekday's recurring override.
    Daily(DaySchedule),
    /// A date-pinned override.
    Holiday(HolidaySchedule),
}

impl ResolvedSchedule {
    /// The window and source overrides, regardless of origin.
    #[must_use]
    pub fn day(&self) -> &DaySchedule {
        match self {
            Self::Daily(day) => day,
            Self::Holiday(holiday) => &holiday.day,
        }
    }

    /// Returns true when this schedule should produce no playback.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        match self {
            Self::Daily(_) => false,
            Self::Holiday(holiday) => holiday.is_skipped(),
        }
    }
}

/// Outcome of resolving a single date against the configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum DayResolution {
    /// The weekday is switched off; holidays cannot override this.
    Inactive,
    /// An override governs the date.
    Scheduled(ResolvedSchedule),
    /// No override; global defaults apply.
    Defaults,
}
