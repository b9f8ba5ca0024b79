//! Background monitor that turns observed playback into history sessions.
//!
//! Every poll cycle each configured speaker is checked. A new piece of
//! media opens a session, a change of media closes the old one and opens
//! the next, a stopped transport closes whatever is open. Duration updates
//! for unchanged media are throttled so a radio station playing all day
//! does not produce a write per cycle.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use super::session_store::{MediaType, NewPlaybackSession, SessionStore};
use crate::clock::Clock;
use crate::protocol_constants::{DURATION_PERSIST_SECS, MONITOR_INTERVAL_SECS};
use crate::settings::{Settings, SettingsStore, SpeakerTarget};
use crate::sonos::utils::{contains_ci, normalize_station_url};
use crate::sonos::SonosConnector;

#[derive(Debug, Clone)]
struct ActiveSession {
    id: i64,
    signature: String,
    started_at: NaiveDateTime,
    last_persist: NaiveDateTime,
}

/// What the monitor decided a speaker is currently playing.
#[derive(Debug, Clone, PartialEq)]
struct ObservedMedia {
    media_type: MediaType,
    track: String,
    artist: Option<String>,
    album: Option<String>,
}

impl ObservedMedia {
    /// Canonical `title|artist|album` identity. Two observations with the
    /// same signature belong to the same session.
    fn signature(&self) -> String {
        format!(
            "{}|{}|{}",
            self.track,
            self.artist.as_deref().unwrap_or(""),
            self.album.as_deref().unwrap_or("")
        )
    }
}

/// Polls speakers and records playback history.
pub struct PlaybackMonitor {
    sonos: Arc<dyn SonosConnector>,
    settings: Arc<dyn SettingsStore>,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    active: DashMap<String, ActiveSession>,
}

impl PlaybackMonitor {
    #[must_use]
    pub fn new(
        sonos: Arc<dyn SonosConnector>,
        settings: Arc<dyn SettingsStore>,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sonos,
            settings,
            sessions,
            clock,
            active: DashMap::new(),
        }
    }

    /// Runs the poll loop until cancelled. Open sessions are closed on the
    /// way out so history never ends with dangling rows.
    pub async fn run(&self, cancel: CancellationToken) {
        log::info!("[Monitor] Playback monitor started");
        loop {
            self.poll_once().await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.clock.sleep(Duration::from_secs(MONITOR_INTERVAL_SECS)) => {}
            }
        }
        self.close_all().await;
        log::info!("[Monitor] Playback monitor stopped");
    }

    /// One poll cycle over every configured speaker.
    pub async fn poll_once(&self) {
        let Some(settings) = self.settings.load().await else {
            return;
        };
        for speaker in &settings.speakers {
            self.poll_speaker(&settings, speaker).await;
        }
    }

    async fn poll_speaker(&self, settings: &Settings, speaker: &SpeakerTarget) {
        let ip = speaker.ip_address.as_str();
        let playing = self.sonos.get_is_playing(ip).await.unwrap_or(false);
        let now = self.clock.now();

        if !playing {
            self.close_session(ip, now).await;
            return;
        }

        let observed = self.observe(settings, ip).await;
        let signature = observed.signature();

        let current = self.active.get(ip).map(|a| a.value().clone());
        match current {
            None => self.open_session(speaker, observed, now).await,
            Some(active) if active.signature != signature => {
                self.close_session(ip, now).await;
                self.open_session(speaker, observed, now).await;
            }
            Some(active) => {
                let since_persist = now.signed_duration_since(active.last_persist);
                if since_persist.num_seconds() >= DURATION_PERSIST_SECS {
                    let duration = now.signed_duration_since(active.started_at).num_seconds();
                    if let Err(e) = self.sessions.update_end(active.id, now, duration).await {
                        log::warn!("[Monitor] Duration update failed for {}: {}", ip, e);
                    }
                    if let Some(mut entry) = self.active.get_mut(ip) {
                        entry.last_persist = now;
                    }
                }
            }
        }
    }

    async fn observe(&self, settings: &Settings, ip: &str) -> ObservedMedia {
        let info = self.sonos.get_track_info(ip).await.ok().flatten();
        let station = self.sonos.get_current_station(ip).await.unwrap_or_default();

        if let Some(info) = info.filter(|i| i.is_valid_metadata()) {
            // Full metadata still gets refined by the transport URI so
            // service playback is attributed to the right source.
            let media_type = if contains_ci(&station, "spotify") {
                MediaType::Spotify
            } else if contains_ci(&station, "youtube") {
                MediaType::YouTubeMusic
            } else {
                MediaType::Track
            };
            return ObservedMedia {
                media_type,
                track: info.title,
                artist: Some(info.artist),
                album: Some(info.album).filter(|a| !a.trim().is_empty()),
            };
        }

        if contains_ci(&station, "spotify") {
            return ObservedMedia {
                media_type: MediaType::Spotify,
                track: "Spotify Connect".to_string(),
                artist: Some("Spotify".to_string()),
                album: None,
            };
        }
        if contains_ci(&station, "youtube") {
            return ObservedMedia {
                media_type: MediaType::YouTubeMusic,
                track: "YouTube Music".to_string(),
                artist: Some("YouTube Music".to_string()),
                album: None,
            };
        }

        let normalized = normalize_station_url(&station);
        let known = settings.stations.iter().find(|entry| {
            let entry_url = normalize_station_url(&entry.url);
            !entry_url.is_empty() && contains_ci(&normalized, &entry_url)
        });
        if let Some(entry) = known {
            return ObservedMedia {
                media_type: MediaType::Station,
                track: entry.name.clone(),
                artist: Some("Live Stream".to_string()),
                album: None,
            };
        }

        ObservedMedia {
            media_type: MediaType::Stream,
            track: "Playing Stream".to_string(),
            artist: Some(normalized).filter(|u| !u.is_empty()),
            album: None,
        }
    }

    async fn open_session(&self, speaker: &SpeakerTarget, observed: ObservedMedia, now: NaiveDateTime) {
        let session = NewPlaybackSession {
            speaker_ip: speaker.ip_address.clone(),
            speaker_name: speaker.name.clone(),
            media_type: observed.media_type,
            track: observed.track.clone(),
            artist: observed.artist.clone(),
            album: observed.album.clone(),
            started_at: now,
        };
        match self.sessions.create(session).await {
            Ok(id) => {
                log::debug!(
                    "[Monitor] {} now playing {} ({})",
                    speaker.ip_address,
                    observed.track,
                    observed.media_type.label()
                );
                self.active.insert(
                    speaker.ip_address.clone(),
                    ActiveSession {
                        id,
                        signature: observed.signature(),
                        started_at: now,
                        last_persist: now,
                    },
                );
            }
            Err(e) => {
                log::warn!(
                    "[Monitor] Failed to open session for {}: {}",
                    speaker.ip_address,
                    e
                );
            }
        }
    }

    async fn close_session(&self, ip: &str, now: NaiveDateTime) {
        if let Some((_, active)) = self.active.remove(ip) {
            let duration = now
                .signed_duration_since(active.started_at)
                .num_seconds()
                .max(0);
            if let Err(e) = self.sessions.update_end(active.id, now, duration).await {
                log::warn!("[Monitor] Failed to close session for {}: {}", ip, e);
            }
        }
    }

    async fn close_all(&self) {
        let ips: Vec<String> = self.active.iter().map(|e| e.key().clone()).collect();
        let now = self.clock.now();
        for ip in ips {
            self.close_session(&ip, now).await;
        }
    }
}
