//! Transport-level device commands.
//!
//! Public operations absorb transient device failures: a speaker that is
//! offline or mid-transition logs a warning and yields a safe default
//! instead of failing the calling loop. The only synchronous error is an
//! unusable speaker address.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use super::services::SonosService;
use super::soap::SoapRequestBuilder;
use super::types::{TrackInfo, TrackProgress};
use super::utils::{build_sonos_url, extract_xml_text, parse_transport_time, speaker_base_url, station_transport_uri};
use crate::protocol_constants::{REBOOT_PATH, SOAP_TIMEOUT_SECS};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors surfaced by the device client boundary.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The speaker address is empty or unusable. Raised before any network
    /// traffic happens.
    #[error("Invalid speaker address: {0}")]
    InvalidAddress(String),
}

/// Convenient Result alias for device client operations.
pub type ClientResult<T> = Result<T, ClientError>;

pub(crate) fn ensure_address(ip: &str) -> ClientResult<()> {
    if ip.trim().is_empty() {
        return Err(ClientError::InvalidAddress(
            "speaker address is empty".into(),
        ));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Playback Commands
// ─────────────────────────────────────────────────────────────────────────────

async fn send_transport_command(client: &Client, ip: &str, action: &'static str) {
    let result = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action(action)
        .instance_id()
        .send()
        .await;

    match result {
        Ok(_) => log::debug!("[Sonos] {} sent to {}", action, ip),
        Err(e) => log::warn!("[Sonos] {} failed for {}: {}", action, ip, e),
    }
}

/// Resumes playback on whatever transport URI is currently loaded.
pub async fn start_playing(client: &Client, ip: &str) -> ClientResult<()> {
    ensure_address(ip)?;
    let result = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("Play")
        .instance_id()
        .arg("Speed", "1")
        .send()
        .await;

    match result {
        Ok(_) => log::debug!("[Sonos] Play sent to {}", ip),
        Err(e) => log::warn!("[Sonos] Play failed for {}: {}", ip, e),
    }
    Ok(())
}

/// Pauses playback.
pub async fn pause_playing(client: &Client, ip: &str) -> ClientResult<()> {
    ensure_address(ip)?;
    send_transport_command(client, ip, "Pause").await;
    Ok(())
}

/// Stops playback.
pub async fn stop_playing(client: &Client, ip: &str) -> ClientResult<()> {
    ensure_address(ip)?;
    send_transport_command(client, ip, "Stop").await;
    Ok(())
}

/// Skips to the next queue entry.
pub async fn next_track(client: &Client, ip: &str) -> ClientResult<()> {
    ensure_address(ip)?;
    send_transport_command(client, ip, "Next").await;
    Ok(())
}

/// Returns to the previous queue entry.
///
/// The transport is paused first and given a moment to settle; skipping
/// backwards during active playback restarts the current track instead.
pub async fn previous_track(client: &Client, ip: &str) -> ClientResult<()> {
    ensure_address(ip)?;
    send_transport_command(client, ip, "Pause").await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    send_transport_command(client, ip, "Previous").await;
    Ok(())
}

/// Removes every entry from the speaker's play queue.
pub async fn clear_queue(client: &Client, ip: &str) -> ClientResult<()> {
    ensure_address(ip)?;
    send_transport_command(client, ip, "RemoveAllTracksFromQueue").await;
    Ok(())
}

/// True when the transport state reports active playback.
pub async fn get_is_playing(client: &Client, ip: &str) -> ClientResult<bool> {
    ensure_address(ip)?;
    let result = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("GetTransportInfo")
        .instance_id()
        .send()
        .await;

    match result {
        Ok(response) => Ok(extract_xml_text(&response, "CurrentTransportState")
            .is_some_and(|state| state == "PLAYING")),
        Err(e) => {
            log::debug!("[Sonos] IsPlaying check failed for {}: {}", ip, e);
            Ok(false)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Volume
// ─────────────────────────────────────────────────────────────────────────────

/// Reads the master-channel volume, zero when the speaker cannot answer.
pub async fn get_volume(client: &Client, ip: &str) -> ClientResult<u8> {
    ensure_address(ip)?;
    let result = SoapRequestBuilder::new(client, ip)
        .service(SonosService::RenderingControl)
        .action("GetVolume")
        .instance_id()
        .arg("Channel", "Master")
        .send()
        .await;

    match result {
        Ok(response) => Ok(extract_xml_text(&response, "CurrentVolume")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)),
        Err(e) => {
            log::debug!("[Sonos] GetVolume failed for {}: {}", ip, e);
            Ok(0)
        }
    }
}

/// Sets the master-channel volume, clamped to 0-100.
pub async fn set_volume(client: &Client, ip: &str, volume: u8) -> ClientResult<()> {
    ensure_address(ip)?;
    let volume = volume.min(100);
    let result = SoapRequestBuilder::new(client, ip)
        .service(SonosService::RenderingControl)
        .action("SetVolume")
        .instance_id()
        .arg("Channel", "Master")
        .arg("DesiredVolume", volume.to_string())
        .send()
        .await;

    match result {
        Ok(_) => log::debug!("[Sonos] Volume {} set for {}", volume, ip),
        Err(e) => log::warn!("[Sonos] SetVolume failed for {}: {}", ip, e),
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Station Playback
// ─────────────────────────────────────────────────────────────────────────────

/// Loads a station stream and starts playing it.
///
/// Bare host/path identifiers are rewritten to the live-radio scheme; the
/// follow-up Play is only issued when the transport URI was accepted.
/// Returns whether the station was set.
pub async fn set_station(client: &Client, ip: &str, station: &str) -> ClientResult<bool> {
    ensure_address(ip)?;
    let uri = station_transport_uri(station);

    let result = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("SetAVTransportURI")
        .instance_id()
        .arg("CurrentURI", uri.as_str())
        .arg("CurrentURIMetaData", "")
        .send()
        .await;

    match result {
        Ok(_) => {
            log::debug!("[Sonos] Station set for {}", ip);
            start_playing(client, ip).await?;
            Ok(true)
        }
        Err(e) => {
            log::warn!("[Sonos] Error setting station for {}: {}", ip, e);
            Ok(false)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Now Playing
// ─────────────────────────────────────────────────────────────────────────────

/// Fetches metadata of the currently loaded track.
///
/// Returns `None` when the speaker is unreachable or carries no usable
/// metadata payload.
pub async fn get_track_info(client: &Client, ip: &str) -> ClientResult<Option<TrackInfo>> {
    ensure_address(ip)?;
    let result = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("GetPositionInfo")
        .instance_id()
        .send()
        .await;

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            log::debug!("[Sonos] GetTrackInfo failed for {}: {}", ip, e);
            return Ok(None);
        }
    };

    // TrackMetaData holds an entity-encoded DIDL-Lite document; the text
    // extraction already decodes one level of escaping.
    let Some(metadata) = extract_xml_text(&response, "TrackMetaData") else {
        return Ok(None);
    };
    if metadata.trim().is_empty() {
        return Ok(None);
    }

    let mut info = TrackInfo {
        title: extract_xml_text(&metadata, "title").unwrap_or_default(),
        artist: extract_xml_text(&metadata, "creator").unwrap_or_default(),
        album: extract_xml_text(&metadata, "album").unwrap_or_default(),
        stream_content: extract_xml_text(&metadata, "streamContent").filter(|s| !s.is_empty()),
        album_art_uri: None,
    };

    if let Some(art) = extract_xml_text(&metadata, "albumArtURI") {
        if !art.trim().is_empty() {
            info.album_art_uri = Some(if art.starts_with('/') {
                format!("{}{}", speaker_base_url(ip), art)
            } else {
                art
            });
        }
    }

    Ok(Some(info))
}

/// Human-readable description of the current track.
pub async fn get_current_track(client: &Client, ip: &str) -> ClientResult<String> {
    let info = get_track_info(client, ip).await?;
    Ok(match info {
        Some(info) if info.is_valid_metadata() => info.display_string(),
        _ => "No metadata available".to_string(),
    })
}

/// Playback position within the current track, zeros when unavailable.
pub async fn get_track_progress(client: &Client, ip: &str) -> ClientResult<TrackProgress> {
    ensure_address(ip)?;
    let result = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("GetPositionInfo")
        .instance_id()
        .send()
        .await;

    match result {
        Ok(response) => {
            let position = extract_xml_text(&response, "RelTime").unwrap_or_default();
            let duration = extract_xml_text(&response, "TrackDuration").unwrap_or_default();
            Ok(TrackProgress {
                position_secs: parse_transport_time(&position),
                duration_secs: parse_transport_time(&duration),
            })
        }
        Err(e) => {
            log::debug!("[Sonos] GetTrackProgress failed for {}: {}", ip, e);
            Ok(TrackProgress::default())
        }
    }
}

/// The transport URI currently loaded on the speaker.
///
/// A reachable speaker without a parsable URI answers "Unknown Station";
/// an unreachable one answers the empty string so callers can distinguish
/// the two without an error path.
pub async fn get_current_station(client: &Client, ip: &str) -> ClientResult<String> {
    ensure_address(ip)?;
    let result = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("GetMediaInfo")
        .instance_id()
        .send()
        .await;

    match result {
        Ok(response) => Ok(extract_xml_text(&response, "CurrentURI")
            .unwrap_or_else(|| "Unknown Station".to_string())),
        Err(e) => {
            log::debug!("[Sonos] GetCurrentStation failed for {}: {}", ip, e);
            Ok(String::new())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Maintenance
// ─────────────────────────────────────────────────────────────────────────────

/// Reboots the speaker via its plain HTTP maintenance endpoint.
pub async fn reboot_device(client: &Client, ip: &str) -> ClientResult<()> {
    ensure_address(ip)?;
    let url = build_sonos_url(ip, REBOOT_PATH);
    let result = client
        .post(&url)
        .timeout(Duration::from_secs(SOAP_TIMEOUT_SECS))
        .send()
        .await
        .and_then(|r| r.error_for_status());

    match result {
        Ok(_) => log::info!("[Sonos] Reboot requested for {}", ip),
        Err(e) => log::warn!("[Sonos] Reboot failed for {}: {}", ip, e),
    }
    Ok(())
}
