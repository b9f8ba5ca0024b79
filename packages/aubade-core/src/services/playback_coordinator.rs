//! Scheduled playback orchestration.
//!
//! One long-lived loop: wait for the next start instant, prepare the
//! configured speakers, play the selected media, hold until the stop
//! instant, stop everything, repeat. All device failures are absorbed by
//! the client layer, so a dead speaker delays nothing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, NaiveTime};
use futures::future::join_all;
use rand::seq::IndexedRandom;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::notify::Notifier;
use crate::protocol_constants::{EMPTY_ROSTER_RETRY_SECS, MAX_WAIT_SLICE_SECS};
use crate::schedule::{sleep_or_cancel, wait_until_start_time, DaySchedule};
use crate::settings::{MediaEntry, Settings, SettingsStore};
use crate::sonos::SonosConnector;

/// What to play once the speakers are prepared.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PlayCommand {
    Station(String),
    Spotify(String),
    YouTubeMusic {
        url: String,
        fallback: Option<String>,
    },
    /// Resume whatever transport URI is already loaded.
    Resume,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn pick_random(items: &[MediaEntry]) -> Option<String> {
    items.choose(&mut rand::rng()).map(|e| e.url.clone())
}

/// Picks the playback target for a start.
///
/// Priority within each level: random Spotify, random YouTube Music,
/// random station, then the explicit URLs in the same media order. The day
/// schedule's level is exhausted before the global autoplay fields are
/// considered. A set random flag always decides, even when its media list
/// is empty; an empty list then degrades to a plain resume.
fn select_play_command(settings: &Settings, day: &DaySchedule) -> PlayCommand {
    // The station that would otherwise play doubles as the audible-output
    // fallback for YouTube Music commands.
    let station_fallback =
        non_blank(&day.station_url).or_else(|| non_blank(&settings.auto_play_station_url));

    if day.play_random_spotify {
        return match pick_random(&settings.spotify_items) {
            Some(url) => PlayCommand::Spotify(url),
            None => PlayCommand::Resume,
        };
    }
    if day.play_random_youtube_music {
        return match pick_random(&settings.youtube_music_items) {
            Some(url) => PlayCommand::YouTubeMusic {
                url,
                fallback: station_fallback,
            },
            None => PlayCommand::Resume,
        };
    }
    if day.play_random_station {
        return match pick_random(&settings.stations) {
            Some(url) => PlayCommand::Station(url),
            None => PlayCommand::Resume,
        };
    }
    if let Some(url) = non_blank(&day.spotify_url) {
        return PlayCommand::Spotify(url);
    }
    if let Some(url) = non_blank(&day.youtube_music_url) {
        return PlayCommand::YouTubeMusic {
            url,
            fallback: station_fallback,
        };
    }
    if let Some(url) = non_blank(&day.station_url) {
        return PlayCommand::Station(url);
    }

    if settings.auto_play_random_spotify {
        return match pick_random(&settings.spotify_items) {
            Some(url) => PlayCommand::Spotify(url),
            None => PlayCommand::Resume,
        };
    }
    if settings.auto_play_random_youtube_music {
        return match pick_random(&settings.youtube_music_items) {
            Some(url) => PlayCommand::YouTubeMusic {
                url,
                fallback: non_blank(&settings.auto_play_station_url),
            },
            None => PlayCommand::Resume,
        };
    }
    if settings.auto_play_random_station {
        return match pick_random(&settings.stations) {
            Some(url) => PlayCommand::Station(url),
            None => PlayCommand::Resume,
        };
    }
    if let Some(url) = non_blank(&settings.auto_play_spotify_url) {
        return PlayCommand::Spotify(url);
    }
    if let Some(url) = non_blank(&settings.auto_play_youtube_music_url) {
        return PlayCommand::YouTubeMusic {
            url,
            fallback: non_blank(&settings.auto_play_station_url),
        };
    }
    if let Some(url) = non_blank(&settings.auto_play_station_url) {
        return PlayCommand::Station(url);
    }

    PlayCommand::Resume
}

/// Length of the playback window. A stop time at or before the start rolls
/// into the next day.
fn playback_duration(start: NaiveTime, stop: NaiveTime) -> chrono::Duration {
    let duration = stop.signed_duration_since(start);
    if duration < chrono::Duration::zero() {
        duration + chrono::Duration::hours(24)
    } else {
        duration
    }
}

/// Drives scheduled playback across the configured speakers.
pub struct PlaybackCoordinator {
    sonos: Arc<dyn SonosConnector>,
    settings: Arc<dyn SettingsStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl PlaybackCoordinator {
    #[must_use]
    pub fn new(
        sonos: Arc<dyn SonosConnector>,
        settings: Arc<dyn SettingsStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sonos,
            settings,
            notifier,
            clock,
        }
    }

    /// Runs start/stop cycles until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        log::info!("[Coordinator] Playback coordinator started");
        while !cancel.is_cancelled() {
            let Some((settings, schedule, start_at)) =
                wait_until_start_time(self.settings.as_ref(), self.clock.as_ref(), &cancel).await
            else {
                break;
            };

            if settings.speakers.is_empty() {
                log::warn!(
                    "[Coordinator] No speakers configured, retrying in {}s",
                    EMPTY_ROSTER_RETRY_SECS
                );
                if !sleep_or_cancel(
                    self.clock.as_ref(),
                    &cancel,
                    Duration::from_secs(EMPTY_ROSTER_RETRY_SECS),
                )
                .await
                {
                    break;
                }
                continue;
            }

            let day = schedule
                .as_ref()
                .map(|s| s.day().clone())
                .unwrap_or_default();
            let stop_time = day.stop_time.unwrap_or(settings.stop_time);
            let stop_at = start_at + playback_duration(start_at.time(), stop_time);

            let started = self.start_speakers(&settings, &day).await;
            if started {
                self.notifier
                    .send(&format!(
                        "Automation started playback on {} speaker(s).",
                        settings.speakers.len()
                    ))
                    .await;
            } else {
                self.notifier
                    .send("Automation could not start playback on every speaker.")
                    .await;
            }

            if !self.hold_until(stop_at, &cancel).await {
                // Shutdown mid-window; leave current playback untouched.
                break;
            }

            self.stop_speakers(&settings, &day).await;
            self.notifier.send("Automation stopped playback.").await;
        }
        log::info!("[Coordinator] Playback coordinator stopped");
    }

    /// Prepares every speaker and plays the selected media. Returns whether
    /// all device calls went through.
    async fn start_speakers(&self, settings: &Settings, day: &DaySchedule) -> bool {
        let ips: Vec<String> = settings
            .speakers
            .iter()
            .map(|s| s.ip_address.clone())
            .collect();

        // Preparation: detach from stale groups and apply startup volumes.
        let preparations = settings.speakers.iter().map(|speaker| {
            let volume = speaker
                .startup_volume
                .unwrap_or(settings.volume)
                .min(settings.max_volume);
            let ip = speaker.ip_address.clone();
            async move {
                self.sonos.ungroup_speaker(&ip).await?;
                self.sonos.set_volume(&ip, volume).await
            }
        });
        let mut ok = join_all(preparations).await.iter().all(|r| r.is_ok());

        let targets = if day.is_synced_playback && ips.len() > 1 {
            let master = ips[0].clone();
            let slaves = ips[1..].to_vec();
            match self.sonos.create_group(&master, &slaves).await {
                Ok(true) => vec![master],
                Ok(false) => {
                    // Incomplete group: play everywhere unsynced rather
                    // than leave stragglers silent.
                    log::warn!("[Coordinator] Group incomplete, playing on all speakers");
                    ok = false;
                    ips.clone()
                }
                Err(e) => {
                    log::warn!("[Coordinator] Grouping failed: {}", e);
                    ok = false;
                    ips.clone()
                }
            }
        } else {
            ips.clone()
        };

        let command = select_play_command(settings, day);
        log::info!(
            "[Coordinator] Starting playback on {} target(s): {:?}",
            targets.len(),
            command
        );

        let plays = targets.iter().map(|ip| {
            let command = command.clone();
            async move {
                match command {
                    PlayCommand::Station(url) => {
                        self.sonos.set_station(ip, &url).await.map(|_| ())
                    }
                    PlayCommand::Spotify(url) => self.sonos.play_spotify(ip, &url, None).await,
                    PlayCommand::YouTubeMusic { url, fallback } => {
                        self.sonos
                            .play_youtube_music(ip, &url, fallback.as_deref())
                            .await
                    }
                    PlayCommand::Resume => self.sonos.start_playing(ip).await,
                }
            }
        });
        let played = join_all(plays).await.iter().all(|r| r.is_ok());
        ok && played
    }

    /// Sleeps in bounded slices until the stop instant. Returns false when
    /// cancelled first.
    async fn hold_until(&self, stop_at: NaiveDateTime, cancel: &CancellationToken) -> bool {
        loop {
            let now = self.clock.now();
            if now >= stop_at {
                return true;
            }
            let remaining = stop_at
                .signed_duration_since(now)
                .to_std()
                .unwrap_or(Duration::ZERO);
            let slice = remaining.min(Duration::from_secs(MAX_WAIT_SLICE_SECS));
            if !sleep_or_cancel(self.clock.as_ref(), cancel, slice).await {
                return false;
            }
        }
    }

    /// Stops every speaker; synced playback also dissolves the group so the
    /// next window starts from a clean slate.
    async fn stop_speakers(&self, settings: &Settings, day: &DaySchedule) {
        let stops = settings
            .speakers
            .iter()
            .map(|s| self.sonos.stop_playing(&s.ip_address));
        for result in join_all(stops).await {
            if let Err(e) = result {
                log::warn!("[Coordinator] Stop failed: {}", e);
            }
        }

        if day.is_synced_playback {
            let ungroups = settings
                .speakers
                .iter()
                .map(|s| self.sonos.ungroup_speaker(&s.ip_address));
            for result in join_all(ungroups).await {
                if let Err(e) = result {
                    log::warn!("[Coordinator] Ungroup failed: {}", e);
                }
            }
        }
        log::info!("[Coordinator] Playback stopped on all speakers");
    }
}
