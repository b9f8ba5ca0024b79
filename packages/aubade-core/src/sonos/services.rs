//! Sonos UPnP service definitions.
//!
//! Single source of truth for the service URNs and control paths used by
//! the SOAP layer.

use serde::Serialize;

/// Sonos UPnP services used for control.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SonosService {
    /// Audio/Video transport control (play, pause, stop, transport URIs).
    AVTransport,
    /// Individual speaker volume control.
    RenderingControl,
    /// Queue browsing on the speaker's media server.
    ContentDirectory,
}

impl SonosService {
    /// Returns the UPnP service URN for SOAP requests.
    #[must_use]
    pub fn urn(&self) -> &'static str {
        match self {
            Self::AVTransport => "urn:schemas-upnp-org:service:AVTransport:1",
            Self::RenderingControl => "urn:schemas-upnp-org:service:RenderingControl:1",
            Self::ContentDirectory => "urn:schemas-upnp-org:service:ContentDirectory:1",
        }
    }

    /// Returns the UPnP control endpoint path for SOAP requests.
    #[must_use]
    pub fn control_path(&self) -> &'static str {
        match self {
            Self::AVTransport => "/MediaRenderer/AVTransport/Control",
            Self::RenderingControl => "/MediaRenderer/RenderingControl/Control",
            Self::ContentDirectory => "/MediaServer/ContentDirectory/Control",
        }
    }

    /// Returns a human-readable name for this service.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AVTransport => "AVTransport",
            Self::RenderingControl => "RenderingControl",
            Self::ContentDirectory => "ContentDirectory",
        }
    }
}
