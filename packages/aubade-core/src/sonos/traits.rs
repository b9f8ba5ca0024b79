//! Client traits for dependency injection.
//!
//! The orchestration services depend on these traits instead of the
//! concrete client so tests can substitute scripted fakes.

use async_trait::async_trait;

use super::transport::ClientResult;
use super::types::{QueuePage, TrackInfo, TrackProgress};
use crate::settings::SpeakerTarget;

/// Transport-level playback and volume control.
#[async_trait]
pub trait SonosTransport: Send + Sync {
    async fn start_playing(&self, ip: &str) -> ClientResult<()>;
    async fn pause_playing(&self, ip: &str) -> ClientResult<()>;
    async fn stop_playing(&self, ip: &str) -> ClientResult<()>;
    async fn next_track(&self, ip: &str) -> ClientResult<()>;
    async fn previous_track(&self, ip: &str) -> ClientResult<()>;
    async fn clear_queue(&self, ip: &str) -> ClientResult<()>;
    async fn get_is_playing(&self, ip: &str) -> ClientResult<bool>;
    async fn get_volume(&self, ip: &str) -> ClientResult<u8>;
    async fn set_volume(&self, ip: &str, volume: u8) -> ClientResult<()>;
    async fn set_station(&self, ip: &str, station: &str) -> ClientResult<bool>;
    async fn reboot_device(&self, ip: &str) -> ClientResult<()>;
}

/// Now-playing metadata, queue browsing and music-service playback.
#[async_trait]
pub trait SonosContent: Send + Sync {
    async fn get_track_info(&self, ip: &str) -> ClientResult<Option<TrackInfo>>;
    async fn get_current_track(&self, ip: &str) -> ClientResult<String>;
    async fn get_track_progress(&self, ip: &str) -> ClientResult<TrackProgress>;
    async fn get_current_station(&self, ip: &str) -> ClientResult<String>;
    async fn get_queue(&self, ip: &str, start_index: usize, count: usize)
        -> ClientResult<QueuePage>;
    async fn play_spotify(
        &self,
        ip: &str,
        url: &str,
        fallback_station: Option<&str>,
    ) -> ClientResult<()>;
    async fn play_youtube_music(
        &self,
        ip: &str,
        url: &str,
        fallback_station: Option<&str>,
    ) -> ClientResult<()>;
}

/// Multi-room group management.
#[async_trait]
pub trait SonosGrouping: Send + Sync {
    async fn get_speaker_uuid(&self, ip: &str) -> ClientResult<Option<String>>;
    async fn create_group(&self, master_ip: &str, slave_ips: &[String]) -> ClientResult<bool>;
    async fn ungroup_speaker(&self, ip: &str) -> ClientResult<()>;
    async fn get_speakers_in_group(
        &self,
        ip: &str,
        roster: &[SpeakerTarget],
    ) -> ClientResult<Vec<String>>;
}

/// Full Sonos client surface. Blanket-implemented for any type that
/// provides all three facets.
pub trait SonosConnector: SonosTransport + SonosContent + SonosGrouping {}

impl<T: SonosTransport + SonosContent + SonosGrouping> SonosConnector for T {}
