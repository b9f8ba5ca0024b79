//! DIDL-Lite metadata payloads for transport URIs.
//!
//! The service tokens and item id prefixes are magic values of the Sonos
//! music-service integration; the devices reject mismatched combinations.

use crate::protocol_constants::{SPOTIFY_SERVICE_TOKEN, YOUTUBE_MUSIC_SERVICE_TOKEN};

const DIDL_OPEN: &str = r#"<DIDL-Lite xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/" xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/">"#;
const DIDL_CLOSE: &str = "</DIDL-Lite>";

/// The kind of Spotify object behind a shared URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotifyKind {
    Track,
    Playlist,
    Album,
}

impl SpotifyKind {
    fn item_id(&self, content_id: &str) -> String {
        match self {
            Self::Track => format!("00032020spotify%3atrack%3a{content_id}"),
            Self::Playlist => format!("00020000spotify%3aplaylist%3a{content_id}"),
            Self::Album => format!("00020000spotify%3aalbum%3a{content_id}"),
        }
    }

    fn upnp_class(&self) -> &'static str {
        match self {
            Self::Track => "object.item.audioItem.musicTrack",
            Self::Playlist => "object.container.playlistContainer",
            Self::Album => "object.container.album.musicAlbum",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::Track => "Spotify Track",
            Self::Playlist => "Spotify Playlist",
            Self::Album => "Spotify Album",
        }
    }
}

/// The kind of YouTube Music object behind a shared URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YouTubeMusicKind {
    Track,
    Playlist,
}

impl YouTubeMusicKind {
    fn item_id(&self, content_id: &str) -> String {
        match self {
            Self::Track => format!("0004206cyoutubemusic%3atrack%3a{content_id}"),
            Self::Playlist => format!("0006206cyoutubemusic%3aplaylist%3a{content_id}"),
        }
    }

    fn parent_id(&self) -> &'static str {
        match self {
            Self::Track => "0004206cyoutubemusic",
            Self::Playlist => "0006206cyoutubemusic",
        }
    }

    fn upnp_class(&self) -> &'static str {
        match self {
            Self::Track => "object.item.audioItem.musicTrack",
            Self::Playlist => "object.container.playlistContainer",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::Track => "YouTube Music Track",
            Self::Playlist => "YouTube Music Playlist",
        }
    }

    /// Content type segment of the virtual line-in URI.
    pub(crate) fn uri_segment(&self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Playlist => "playlist",
        }
    }
}

fn service_item(item_id: &str, parent_id: &str, title: &str, class: &str, token: &str) -> String {
    let mut didl = String::from(DIDL_OPEN);
    didl.push_str(&format!(
        r#"<item id="{item_id}" parentID="{parent_id}" restricted="true">"#
    ));
    didl.push_str(&format!("<dc:title>{title}</dc:title>"));
    didl.push_str(&format!("<upnp:class>{class}</upnp:class>"));
    didl.push_str(&format!(
        r#"<desc id="cdudn" nameSpace="urn:schemas-rinconnetworks-com:metadata-1-0/">{token}</desc>"#
    ));
    didl.push_str("</item>");
    didl.push_str(DIDL_CLOSE);
    didl
}

/// Metadata accompanying a Spotify virtual line-in URI.
#[must_use]
pub fn spotify_metadata(kind: SpotifyKind, content_id: &str) -> String {
    service_item(
        &kind.item_id(content_id),
        "00020000spotify",
        kind.title(),
        kind.upnp_class(),
        SPOTIFY_SERVICE_TOKEN,
    )
}

/// Metadata accompanying a YouTube Music virtual line-in URI.
#[must_use]
pub fn youtube_music_metadata(kind: YouTubeMusicKind, content_id: &str) -> String {
    service_item(
        &kind.item_id(content_id),
        kind.parent_id(),
        kind.title(),
        kind.upnp_class(),
        YOUTUBE_MUSIC_SERVICE_TOKEN,
    )
}

/// Metadata a slave posts when joining a master's group.
#[must_use]
pub fn group_join_metadata(master_rincon_hex: &str) -> String {
    let mut didl = String::from(
        r#"<DIDL-Lite xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/" xmlns:r="urn:schemas-rinconnetworks-com:metadata-1-0/" xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/">"#,
    );
    didl.push_str(r#"<item id="0" parentID="-1" restricted="true">"#);
    didl.push_str("<dc:title>Master Speaker</dc:title>");
    didl.push_str("<upnp:class>object.item.audioItem.audioBroadcast</upnp:class>");
    didl.push_str(&format!(
        r#"<desc id="cdudn" nameSpace="urn:schemas-rinconnetworks-com:metadata-1-0/">RINCON_{master_rincon_hex}</desc>"#
    ));
    didl.push_str("</item>");
    didl.push_str(DIDL_CLOSE);
    didl
}
