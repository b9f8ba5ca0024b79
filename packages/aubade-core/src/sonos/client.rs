//! Concrete Sonos client backed by a shared HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::traits::{SonosContent, SonosGrouping, SonosTransport};
use super::transport::ClientResult;
use super::types::{QueuePage, TrackInfo, TrackProgress};
use super::{grouping, music_services, queue, transport};
use crate::protocol_constants::SOAP_TIMEOUT_SECS;
use crate::settings::SpeakerTarget;

/// Production Sonos client. Thin wrapper delegating every trait method to
/// the free functions in this module tree; holds the HTTP client so
/// connection pools are shared across all speakers.
pub struct SonosConnectorImpl {
    client: Client,
}

impl SonosConnectorImpl {
    /// Wraps an existing HTTP client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// The underlying HTTP client, for callers that share it.
    #[must_use]
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}

impl Default for SonosConnectorImpl {
    fn default() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(SOAP_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::new(client)
    }
}

#[async_trait]
impl SonosTransport for SonosConnectorImpl {
    async fn start_playing(&self, ip: &str) -> ClientResult<()> {
        transport::start_playing(&self.client, ip).await
    }

    async fn pause_playing(&self, ip: &str) -> ClientResult<()> {
        transport::pause_playing(&self.client, ip).await
    }

    async fn stop_playing(&self, ip: &str) -> ClientResult<()> {
        transport::stop_playing(&self.client, ip).await
    }

    async fn next_track(&self, ip: &str) -> ClientResult<()> {
        transport::next_track(&self.client, ip).await
    }

    async fn previous_track(&self, ip: &str) -> ClientResult<()> {
        transport::previous_track(&self.client, ip).await
    }

    async fn clear_queue(&self, ip: &str) -> ClientResult<()> {
        transport::clear_queue(&self.client, ip).await
    }

    async fn get_is_playing(&self, ip: &str) -> ClientResult<bool> {
        transport::get_is_playing(&self.client, ip).await
    }

    async fn get_volume(&self, ip: &str) -> ClientResult<u8> {
        transport::get_volume(&self.client, ip).await
    }

    async fn set_volume(&self, ip: &str, volume: u8) -> ClientResult<()> {
        transport::set_volume(&self.client, ip, volume).await
    }

    async fn set_station(&self, ip: &str, station: &str) -> ClientResult<bool> {
        transport::set_station(&self.client, ip, station).await
    }

    async fn reboot_device(&self, ip: &str) -> ClientResult<()> {
        transport::reboot_device(&self.client, ip).await
    }
}

#[async_trait]
impl SonosContent for SonosConnectorImpl {
    async fn get_track_info(&self, ip: &str) -> ClientResult<Option<TrackInfo>> {
        transport::get_track_info(&self.client, ip).await
    }

    async fn get_current_track(&self, ip: &str) -> ClientResult<String> {
        transport::get_current_track(&self.client, ip).await
    }

    async fn get_track_progress(&self, ip: &str) -> ClientResult<TrackProgress> {
        transport::get_track_progress(&self.client, ip).await
    }

    async fn get_current_station(&self, ip: &str) -> ClientResult<String> {
        transport::get_current_station(&self.client, ip).await
    }

    async fn get_queue(
        &self,
        ip: &str,
        start_index: usize,
        count: usize,
    ) -> ClientResult<QueuePage> {
        queue::get_queue(&self.client, ip, start_index, count).await
    }

    async fn play_spotify(
        &self,
        ip: &str,
        url: &str,
        fallback_station: Option<&str>,
    ) -> ClientResult<()> {
        music_services::play_spotify(&self.client, ip, url, fallback_station).await
    }

    async fn play_youtube_music(
        &self,
        ip: &str,
        url: &str,
        fallback_station: Option<&str>,
    ) -> ClientResult<()> {
        music_services::play_youtube_music(&self.client, ip, url, fallback_station).await
    }
}

#[async_trait]
impl SonosGrouping for SonosConnectorImpl {
    async fn get_speaker_uuid(&self, ip: &str) -> ClientResult<Option<String>> {
        music_services::get_speaker_uuid(&self.client, ip).await
    }

    async fn create_group(&self, master_ip: &str, slave_ips: &[String]) -> ClientResult<bool> {
        grouping::create_group(&self.client, master_ip, slave_ips).await
    }

    async fn ungroup_speaker(&self, ip: &str) -> ClientResult<()> {
        grouping::ungroup_speaker(&self.client, ip).await
    }

    async fn get_speakers_in_group(
        &self,
        ip: &str,
        roster: &[SpeakerTarget],
    ) -> ClientResult<Vec<String>> {
        grouping::get_speakers_in_group(&self.client, ip, roster).await
    }
}
