//! Playback history storage.
//!
//! Every distinct piece of media the monitor observes becomes one session
//! row: opened when the media is first seen, closed when it stops or is
//! replaced. The store trait keeps persistence pluggable; the in-memory
//! implementation backs tests and setups without a database.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::AubadeResult;

/// Broad classification of what a speaker is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    /// Track with full metadata from the speaker's queue.
    Track,
    Spotify,
    YouTubeMusic,
    /// Configured radio station.
    Station,
    /// Unrecognized stream URL.
    Stream,
}

impl MediaType {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Track => "Track",
            Self::Spotify => "Spotify",
            Self::YouTubeMusic => "YouTube Music",
            Self::Station => "Station",
            Self::Stream => "Stream",
        }
    }
}

/// A playback session as stored, with its assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSessionRecord {
    pub id: i64,
    pub speaker_ip: String,
    pub speaker_name: String,
    pub media_type: MediaType,
    pub track: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    pub started_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<i64>,
}

/// Session data as captured by the monitor, before an id is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlaybackSession {
    pub speaker_ip: String,
    pub speaker_name: String,
    pub media_type: MediaType,
    pub track: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub started_at: NaiveDateTime,
}

/// Persistence boundary for playback history.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores a new open session and returns its id.
    async fn create(&self, session: NewPlaybackSession) -> AubadeResult<i64>;

    /// Writes end time and observed duration. Serves both the periodic
    /// refresh of a running session and its final close; the end time is a
    /// running watermark until the session stops being observed.
    async fn update_end(&self, id: i64, ended_at: NaiveDateTime, duration_secs: i64)
        -> AubadeResult<()>;

    /// All stored sessions, in creation order.
    async fn all(&self) -> AubadeResult<Vec<PlaybackSessionRecord>>;
}

/// In-memory session store.
pub struct MemorySessionStore {
    sessions: DashMap<i64, PlaybackSessionRecord>,
    next_id: AtomicI64,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: NewPlaybackSession) -> AubadeResult<i64> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sessions.insert(
            id,
            PlaybackSessionRecord {
                id,
                speaker_ip: session.speaker_ip,
                speaker_name: session.speaker_name,
                media_type: session.media_type,
                track: session.track,
                artist: session.artist,
                album: session.album,
                started_at: session.started_at,
                ended_at: None,
                duration_secs: None,
            },
        );
        Ok(id)
    }

    async fn update_end(
        &self,
        id: i64,
        ended_at: NaiveDateTime,
        duration_secs: i64,
    ) -> AubadeResult<()> {
        if let Some(mut record) = self.sessions.get_mut(&id) {
            record.ended_at = Some(ended_at);
            record.duration_secs = Some(duration_secs);
        }
        Ok(())
    }

    async fn all(&self) -> AubadeResult<Vec<PlaybackSessionRecord>> {
        let mut records: Vec<PlaybackSessionRecord> =
            self.sessions.iter().map(|r| r.value().clone()).collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .expect("date")
            .and_hms_opt(h, m, 0)
            .expect("time")
    }

    fn new_session(ip: &str, track: &str) -> NewPlaybackSession {
        NewPlaybackSession {
            speaker_ip: ip.to_string(),
            speaker_name: "Kitchen".to_string(),
            media_type: MediaType::Station,
            track: track.to_string(),
            artist: Some("Live Stream".to_string()),
            album: None,
            started_at: at(6, 0),
        }
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids() {
        let store = MemorySessionStore::new();
        let a = store.create(new_session("10.0.0.1", "A")).await.expect("create");
        let b = store.create(new_session("10.0.0.1", "B")).await.expect("create");
        assert!(b > a);
    }

    #[tokio::test]
    async fn update_end_sets_end_and_duration() {
        let store = MemorySessionStore::new();
        let id = store.create(new_session("10.0.0.1", "A")).await.expect("create");
        store.update_end(id, at(6, 30), 1800).await.expect("update");

        let records = store.all().await.expect("all");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ended_at, Some(at(6, 30)));
        assert_eq!(records[0].duration_secs, Some(1800));
    }

    #[tokio::test]
    async fn update_end_of_unknown_id_is_ignored() {
        let store = MemorySessionStore::new();
        store.update_end(99, at(6, 30), 10).await.expect("update");
        assert!(store.all().await.expect("all").is_empty());
    }

    #[tokio::test]
    async fn all_returns_creation_order() {
        let store = MemorySessionStore::new();
        for track in ["A", "B", "C"] {
            store.create(new_session("10.0.0.1", track)).await.expect("create");
        }
        let records = store.all().await.expect("all");
        let tracks: Vec<&str> = records.iter().map(|r| r.track.as_str()).collect();
        assert_eq!(tracks, vec!["A", "B", "C"]);
    }

    #[test]
    fn media_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&MediaType::YouTubeMusic).expect("json"),
            "\"you_tube_music\""
        );
        assert_eq!(MediaType::YouTubeMusic.label(), "YouTube Music");
    }
}
