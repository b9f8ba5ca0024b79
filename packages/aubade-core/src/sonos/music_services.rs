//! Streaming service playback via virtual line-in URIs.
//!
//! Spotify and YouTube Music content cannot be loaded as plain stream URLs.
//! The speaker accepts an `x-sonos-vli` URI carrying its own RINCON device
//! id plus service-specific DIDL-Lite metadata, then plays through the
//! matching music-service session.

use std::time::Duration;

use reqwest::Client;

use super::didl::{spotify_metadata, youtube_music_metadata, SpotifyKind, YouTubeMusicKind};
use super::services::SonosService;
use super::soap::SoapRequestBuilder;
use super::transport::{ensure_address, set_station, start_playing, ClientResult};
use super::utils::{build_sonos_url, extract_xml_text};
use crate::protocol_constants::{
    DEVICE_DESCRIPTION_PATH, SOAP_TIMEOUT_SECS, SPOTIFY_VLI_SERVICE, YOUTUBE_MUSIC_VLI_SERVICE,
};

// ─────────────────────────────────────────────────────────────────────────────
// Device Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Fetches the speaker's RINCON hardware id (the hex part after `RINCON_`).
///
/// Read from the plain-HTTP device description document, not SOAP. `None`
/// when the speaker is unreachable or the document has no UDN.
pub async fn get_rincon_id(client: &Client, ip: &str) -> ClientResult<Option<String>> {
    ensure_address(ip)?;
    let url = build_sonos_url(ip, DEVICE_DESCRIPTION_PATH);
    let result = client
        .get(&url)
        .timeout(Duration::from_secs(SOAP_TIMEOUT_SECS))
        .send()
        .await;

    let body = match result {
        Ok(response) => match response.text().await {
            Ok(body) => body,
            Err(e) => {
                log::debug!("[Sonos] Device description read failed for {}: {}", ip, e);
                return Ok(None);
            }
        },
        Err(e) => {
            log::debug!("[Sonos] Device description fetch failed for {}: {}", ip, e);
            return Ok(None);
        }
    };

    // UDN reads "uuid:RINCON_<hex>".
    let rincon = extract_xml_text(&body, "UDN")
        .and_then(|udn| udn.trim().strip_prefix("uuid:RINCON_").map(str::to_string))
        .filter(|hex| !hex.is_empty());
    Ok(rincon)
}

/// Full UPnP UUID of the speaker, as used in group membership rosters.
pub async fn get_speaker_uuid(client: &Client, ip: &str) -> ClientResult<Option<String>> {
    Ok(get_rincon_id(client, ip)
        .await?
        .map(|hex| format!("uuid:RINCON_{hex}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Content Id Extraction
// ─────────────────────────────────────────────────────────────────────────────

fn id_until_delimiter(segment: &str) -> String {
    segment
        .split(['?', '&'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn segment_after<'a>(url: &'a str, marker: &str) -> Option<&'a str> {
    url.find(marker).map(|pos| &url[pos + marker.len()..])
}

/// Resolves a Spotify share URL or compact `spotify:kind:id` form.
#[must_use]
pub fn extract_spotify_content(url: &str) -> Option<(SpotifyKind, String)> {
    let url = url.trim();

    for (prefix, kind) in [
        ("spotify:track:", SpotifyKind::Track),
        ("spotify:playlist:", SpotifyKind::Playlist),
        ("spotify:album:", SpotifyKind::Album),
    ] {
        if let Some(rest) = segment_after(url, prefix) {
            let id = id_until_delimiter(rest);
            if !id.is_empty() {
                return Some((kind, id));
            }
        }
    }

    for (marker, kind) in [
        ("/track/", SpotifyKind::Track),
        ("/playlist/", SpotifyKind::Playlist),
        ("/album/", SpotifyKind::Album),
    ] {
        if let Some(rest) = segment_after(url, marker) {
            let id = id_until_delimiter(rest);
            if !id.is_empty() {
                return Some((kind, id));
            }
        }
    }

    None
}

/// Resolves a YouTube Music share URL or compact `ytm:kind:id` form.
///
/// Watch-style ids under six characters are rejected as noise; real video
/// ids are always eleven.
#[must_use]
pub fn extract_youtube_content(url: &str) -> Option<(YouTubeMusicKind, String)> {
    let url = url.trim();

    for (prefix, kind) in [
        ("ytm:track:", YouTubeMusicKind::Track),
        ("ytm:playlist:", YouTubeMusicKind::Playlist),
        ("youtubemusic:track:", YouTubeMusicKind::Track),
        ("youtubemusic:playlist:", YouTubeMusicKind::Playlist),
    ] {
        if let Some(rest) = segment_after(url, prefix) {
            let id = id_until_delimiter(rest);
            if !id.is_empty() {
                return Some((kind, id));
            }
        }
    }

    if let Some(rest) = segment_after(url, "list=") {
        let id = id_until_delimiter(rest);
        if !id.is_empty() {
            return Some((YouTubeMusicKind::Playlist, id));
        }
    }

    if let Some(rest) = segment_after(url, "v=") {
        let id = id_until_delimiter(rest);
        if id.len() >= 6 {
            return Some((YouTubeMusicKind::Track, id));
        }
    }

    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Playback
// ─────────────────────────────────────────────────────────────────────────────

async fn load_vli_uri(client: &Client, ip: &str, uri: &str, metadata: &str) -> bool {
    let result = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("SetAVTransportURI")
        .instance_id()
        .arg("CurrentURI", uri)
        .arg("CurrentURIMetaData", metadata)
        .send()
        .await;

    match result {
        Ok(_) => true,
        Err(e) => {
            log::warn!("[Sonos] Loading service URI failed for {}: {}", ip, e);
            false
        }
    }
}

/// Loads and plays Spotify content from a share URL.
///
/// An unresolvable URL or missing device id degrades to a logged no-op so
/// scheduled playback can continue with whatever transport is loaded.
pub async fn play_spotify(
    client: &Client,
    ip: &str,
    url: &str,
    fallback_station: Option<&str>,
) -> ClientResult<()> {
    ensure_address(ip)?;
    if let Some(station) = fallback_station {
        set_station(client, ip, station).await?;
    }

    let Some((kind, content_id)) = extract_spotify_content(url) else {
        log::warn!("[Sonos] Unrecognized Spotify URL: {}", url);
        return Ok(());
    };
    let Some(rincon) = get_rincon_id(client, ip).await? else {
        log::warn!("[Sonos] No RINCON id for {}, skipping Spotify playback", ip);
        return Ok(());
    };

    let uri = format!("x-sonos-vli:RINCON_{rincon}:{SPOTIFY_VLI_SERVICE},spotify:{content_id}");
    let metadata = spotify_metadata(kind, &content_id);
    if load_vli_uri(client, ip, &uri, &metadata).await {
        log::info!("[Sonos] Playing Spotify {:?} {} on {}", kind, content_id, ip);
        start_playing(client, ip).await?;
    }
    Ok(())
}

/// Loads and plays YouTube Music content from a share URL.
///
/// Same degradation rules as [`play_spotify`].
pub async fn play_youtube_music(
    client: &Client,
    ip: &str,
    url: &str,
    fallback_station: Option<&str>,
) -> ClientResult<()> {
    ensure_address(ip)?;
    if let Some(station) = fallback_station {
        set_station(client, ip, station).await?;
    }

    let Some((kind, content_id)) = extract_youtube_content(url) else {
        log::warn!("[Sonos] Unrecognized YouTube Music URL: {}", url);
        return Ok(());
    };
    let Some(rincon) = get_rincon_id(client, ip).await? else {
        log::warn!(
            "[Sonos] No RINCON id for {}, skipping YouTube Music playback",
            ip
        );
        return Ok(());
    };

    let uri = format!(
        "x-sonos-vli:RINCON_{rincon}:{YOUTUBE_MUSIC_VLI_SERVICE},youtubemusic:{}:{content_id}",
        kind.uri_segment()
    );
    let metadata = youtube_music_metadata(kind, &content_id);
    if load_vli_uri(client, ip, &uri, &metadata).await {
        log::info!(
            "[Sonos] Playing YouTube Music {:?} {} on {}",
            kind,
            content_id,
            ip
        );
        start_playing(client, ip).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sonos::test_support::FakeSpeaker;

    fn device_description(udn: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?><root><device><UDN>{udn}</UDN></device></root>"
        )
    }

    #[test]
    fn spotify_urls_resolve_kind_and_id() {
        assert_eq!(
            extract_spotify_content("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC?si=x"),
            Some((SpotifyKind::Track, "4uLU6hMCjMI75M1A2tKUQC".to_string()))
        );
        assert_eq!(
            extract_spotify_content("https://open.spotify.com/playlist/37i9dQZEVXbMDoHDwVN2tF"),
            Some((SpotifyKind::Playlist, "37i9dQZEVXbMDoHDwVN2tF".to_string()))
        );
        assert_eq!(
            extract_spotify_content("spotify:album:41GuZcammIkupMPKH2OJ6I"),
            Some((SpotifyKind::Album, "41GuZcammIkupMPKH2OJ6I".to_string()))
        );
        assert_eq!(extract_spotify_content("https://example.com/nothing"), None);
    }

    #[test]
    fn youtube_urls_resolve_kind_and_id() {
        assert_eq!(
            extract_youtube_content("https://music.youtube.com/playlist?list=LM"),
            Some((YouTubeMusicKind::Playlist, "LM".to_string()))
        );
        assert_eq!(
            extract_youtube_content("https://music.youtube.com/watch?v=dQw4w9WgXcQ&feature=share"),
            Some((YouTubeMusicKind::Track, "dQw4w9WgXcQ".to_string()))
        );
        assert_eq!(
            extract_youtube_content("ytm:track:dQw4w9WgXcQ"),
            Some((YouTubeMusicKind::Track, "dQw4w9WgXcQ".to_string()))
        );
        // Short v= values are tracking noise, not video ids.
        assert_eq!(extract_youtube_content("https://music.youtube.com/watch?v=ab"), None);
    }

    #[test]
    fn playlist_marker_wins_over_watch_id() {
        let url = "https://music.youtube.com/watch?v=dQw4w9WgXcQ&list=RDCLAK5uy";
        assert_eq!(
            extract_youtube_content(url),
            Some((YouTubeMusicKind::Playlist, "RDCLAK5uy".to_string()))
        );
    }

    #[tokio::test]
    async fn spotify_playback_builds_vli_uri_from_rincon() {
        let speaker = FakeSpeaker::start().await;
        speaker.enqueue(200, &device_description("uuid:RINCON_949F3EC13B9A01400"));
        let client = Client::new();

        play_spotify(
            &client,
            speaker.address(),
            "spotify:playlist:37i9dQZEVXbMDoHDwVN2tF",
            None,
        )
        .await
        .expect("play");

        let requests = speaker.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].path, "/xml/device_description.xml");
        assert!(requests[1].body.contains(
            "x-sonos-vli:RINCON_949F3EC13B9A01400:2,spotify:37i9dQZEVXbMDoHDwVN2tF"
        ));
        assert!(requests[1].body.contains("&lt;DIDL-Lite"));
        assert!(requests[2].body.contains("<u:Play"));
    }

    #[tokio::test]
    async fn youtube_playback_sets_fallback_station_first() {
        let speaker = FakeSpeaker::start().await;
        // Responses: SetAVTransportURI (fallback), Play, device description,
        // SetAVTransportURI (vli), Play.
        speaker.enqueue(200, &crate::sonos::test_support::soap_response(
            "SetAVTransportURIResponse",
            "",
        ));
        speaker.enqueue(200, &crate::sonos::test_support::soap_response("PlayResponse", ""));
        speaker.enqueue(200, &device_description("uuid:RINCON_000E58AA"));
        let client = Client::new();

        play_youtube_music(
            &client,
            speaker.address(),
            "https://music.youtube.com/playlist?list=LM",
            Some("fallback.example/stream"),
        )
        .await
        .expect("play");

        let requests = speaker.requests();
        assert_eq!(requests.len(), 5);
        assert!(requests[0]
            .body
            .contains("x-rincon-mp3radio://fallback.example/stream"));
        assert!(requests[3]
            .body
            .contains("x-sonos-vli:RINCON_000E58AA:4,youtubemusic:playlist:LM"));
    }

    #[tokio::test]
    async fn unrecognized_url_is_a_no_op() {
        let speaker = FakeSpeaker::start().await;
        let client = Client::new();

        play_spotify(&client, speaker.address(), "https://example.com/x", None)
            .await
            .expect("play");
        assert!(speaker.requests().is_empty());
    }
}
