//! Shared XML and URL helpers for the Sonos client.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::protocol_constants::{LIVE_RADIO_SCHEME, SONOS_CONTROL_PORT};

// ─────────────────────────────────────────────────────────────────────────────
// URL Building
// ─────────────────────────────────────────────────────────────────────────────

/// Builds the base HTTP URL for a speaker.
///
/// An address that already carries a port (host:port) is used verbatim,
/// otherwise the standard control port is appended.
#[must_use]
pub fn speaker_base_url(ip: &str) -> String {
    if ip.contains(':') {
        format!("http://{ip}")
    } else {
        format!("http://{ip}:{SONOS_CONTROL_PORT}")
    }
}

/// Builds a full control URL for a speaker endpoint path.
#[must_use]
pub fn build_sonos_url(ip: &str, endpoint: &str) -> String {
    format!("{}{}", speaker_base_url(ip), endpoint)
}

// ─────────────────────────────────────────────────────────────────────────────
// XML Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Escapes all XML special characters (& < > " ').
#[must_use]
pub fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Extracts the text content of the first element matching `tag` by local
/// name, ignoring any namespace prefix.
#[must_use]
pub fn extract_xml_text(xml: &str, tag: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut inside = false;
    let mut value = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == tag.as_bytes() => {
                inside = true;
                value.clear();
            }
            Ok(Event::Text(ref t)) if inside => match t.unescape() {
                Ok(text) => value.push_str(&text),
                Err(_) => return None,
            },
            Ok(Event::End(ref e)) if inside && e.local_name().as_ref() == tag.as_bytes() => {
                return Some(value);
            }
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == tag.as_bytes() => {
                return Some(String::new());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Station URLs
// ─────────────────────────────────────────────────────────────────────────────

/// Strips the live-radio scheme and trims. Used for display and for matching
/// observed transport URIs against the configured station list.
#[must_use]
pub fn normalize_station_url(raw: &str) -> String {
    let trimmed = raw.trim();
    strip_prefix_ci(trimmed, LIVE_RADIO_SCHEME)
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

/// Resolves the transport URI for a configured station.
///
/// HTTP schemes are dropped first; anything still carrying an explicit
/// scheme is passed through, a bare host/path is assumed to be a live
/// stream and gets the radio scheme.
#[must_use]
pub fn station_transport_uri(station: &str) -> String {
    let mut stripped = station.to_string();
    for scheme in ["https://", "http://"] {
        while let Some(rest) = strip_prefix_ci(&stripped, scheme) {
            stripped = rest.to_string();
        }
    }

    if stripped.contains("://") {
        stripped
    } else {
        format!("{LIVE_RADIO_SCHEME}{stripped}")
    }
}

fn strip_prefix_ci<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    if value.len() >= prefix.len() && value[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&value[prefix.len()..])
    } else {
        None
    }
}

/// Case-insensitive substring test.
#[must_use]
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Parses a `H:MM:SS` transport time into whole seconds.
///
/// Malformed input yields zero, matching the tolerant handling of position
/// responses.
#[must_use]
pub fn parse_transport_time(value: &str) -> u64 {
    let mut parts = value.trim().splitn(3, ':');
    let (Some(h), Some(m), Some(s)) = (parts.next(), parts.next(), parts.next()) else {
        return 0;
    };
    let h: u64 = h.parse().unwrap_or(0);
    let m: u64 = m.parse().unwrap_or(0);
    let s: u64 = s.split('.').next().unwrap_or("0").parse().unwrap_or(0);
    h * 3600 + m * 60 + s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_xml_handles_all_specials() {
        assert_eq!(
            escape_xml(r#"<a & "b">'c'"#),
            "&lt;a &amp; &quot;b&quot;&gt;&apos;c&apos;"
        );
    }

    #[test]
    fn extract_text_ignores_namespace_prefix() {
        let xml = "<s:Body><u:GetVolumeResponse><CurrentVolume>42</CurrentVolume></u:GetVolumeResponse></s:Body>";
        assert_eq!(extract_xml_text(xml, "CurrentVolume").as_deref(), Some("42"));
    }

    #[test]
    fn extract_text_unescapes_entities() {
        let xml = "<CurrentURI>x-rincon-mp3radio://a?b=1&amp;c=2</CurrentURI>";
        assert_eq!(
            extract_xml_text(xml, "CurrentURI").as_deref(),
            Some("x-rincon-mp3radio://a?b=1&c=2")
        );
    }

    #[test]
    fn extract_text_misses_absent_tag() {
        assert!(extract_xml_text("<a>1</a>", "b").is_none());
    }

    #[test]
    fn empty_element_yields_empty_string() {
        assert_eq!(
            extract_xml_text("<root><CurrentURI/></root>", "CurrentURI").as_deref(),
            Some("")
        );
    }

    #[test]
    fn station_uri_prefixes_bare_hosts() {
        assert_eq!(
            station_transport_uri("example.com/stream"),
            "x-rincon-mp3radio://example.com/stream"
        );
    }

    #[test]
    fn station_uri_strips_http_schemes_case_insensitively() {
        assert_eq!(
            station_transport_uri("HTTPS://example.com/stream"),
            "x-rincon-mp3radio://example.com/stream"
        );
    }

    #[test]
    fn station_uri_passes_explicit_schemes_through() {
        assert_eq!(
            station_transport_uri("x-sonosapi-stream://s1234"),
            "x-sonosapi-stream://s1234"
        );
    }

    #[test]
    fn normalize_strips_radio_scheme_and_trims() {
        assert_eq!(
            normalize_station_url(" X-RINCON-MP3RADIO://example.com/a "),
            "example.com/a"
        );
        assert_eq!(normalize_station_url("  plain.host/x  "), "plain.host/x");
    }

    #[test]
    fn transport_time_parses_hms() {
        assert_eq!(parse_transport_time("0:03:25"), 205);
        assert_eq!(parse_transport_time("1:00:00"), 3600);
        assert_eq!(parse_transport_time("garbage"), 0);
        assert_eq!(parse_transport_time("0:00:12.500"), 12);
    }

    #[test]
    fn base_url_appends_control_port() {
        assert_eq!(speaker_base_url("192.168.1.50"), "http://192.168.1.50:1400");
        assert_eq!(speaker_base_url("127.0.0.1:8080"), "http://127.0.0.1:8080");
    }
}
