//! Domain types returned by the Sonos client.

use serde::{Deserialize, Serialize};

/// Metadata of the currently loaded track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Raw `r:streamContent` payload for radio streams ("Artist - Title").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_content: Option<String>,
    /// Absolute album art URL; relative paths are resolved against the
    /// speaker address at parse time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_art_uri: Option<String>,
}

impl TrackInfo {
    /// Metadata is usable when both title and artist are present.
    #[must_use]
    pub fn is_valid_metadata(&self) -> bool {
        !self.title.trim().is_empty() && !self.artist.trim().is_empty()
    }

    /// Human-readable "Title - Artist" line for logs and notifications.
    #[must_use]
    pub fn display_string(&self) -> String {
        format!("{} - {}", self.title, self.artist)
    }
}

/// Playback position within the current track, in whole seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackProgress {
    pub position_secs: u64,
    pub duration_secs: u64,
}

/// One entry of a speaker's play queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    /// Zero-based position across the whole queue (not just this page).
    pub index: usize,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_uri: Option<String>,
}

/// One page of a speaker's play queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePage {
    pub items: Vec<QueueItem>,
    pub start_index: usize,
    pub number_returned: usize,
    pub total_matches: usize,
}

impl QueuePage {
    /// Creates an empty page anchored at `start_index`.
    #[must_use]
    pub fn empty(start_index: usize) -> Self {
        Self {
            items: Vec::new(),
            start_index,
            number_returned: 0,
            total_matches: start_index,
        }
    }

    /// Whether another page exists past this one.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.total_matches > self.start_index + self.number_returned
    }
}
