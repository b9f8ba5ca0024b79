//! Fixed protocol and timing constants.
//!
//! The wire values are defined by the Sonos UPnP dialect and changing them
//! would break device compatibility. The timing values define the observable
//! cadence of the scheduler and monitor loops.

// ─────────────────────────────────────────────────────────────────────────────
// HTTP/SOAP
// ─────────────────────────────────────────────────────────────────────────────

/// TCP port of the Sonos control endpoints.
pub const SONOS_CONTROL_PORT: u16 = 1400;

/// Timeout for SOAP HTTP requests (seconds).
///
/// 5 seconds is generous for LAN operations while keeping a dead speaker
/// from stalling a fan-out for long.
pub const SOAP_TIMEOUT_SECS: u64 = 5;

/// Path of the plain HTTP endpoint that reboots a speaker.
pub const REBOOT_PATH: &str = "/reboot";

/// Path of the UPnP description document (RINCON id source).
pub const DEVICE_DESCRIPTION_PATH: &str = "/xml/device_description.xml";

// ─────────────────────────────────────────────────────────────────────────────
// Transport URI Schemes
// ─────────────────────────────────────────────────────────────────────────────

/// Scheme for live internet radio streams.
pub const LIVE_RADIO_SCHEME: &str = "x-rincon-mp3radio://";

/// Transport URI that detaches a speaker from its group.
pub const STANDALONE_TRANSPORT_URI: &str = "x-rincon-standard:";

/// Prefix of a grouped transport URI; the remainder names the group members.
pub const GROUP_URI_PREFIX: &str = "x-rincon-group:";

// ─────────────────────────────────────────────────────────────────────────────
// Music Service Tokens
// ─────────────────────────────────────────────────────────────────────────────

/// Service descriptor token for Spotify DIDL metadata.
pub const SPOTIFY_SERVICE_TOKEN: &str = "SA_RINCON2311_X_#Svc2311-0-Token";

/// Virtual line-in service number for Spotify.
pub const SPOTIFY_VLI_SERVICE: &str = "2";

/// Service descriptor token for YouTube Music DIDL metadata.
pub const YOUTUBE_MUSIC_SERVICE_TOKEN: &str = "SA_RINCON51463_X_#Svc51463-0-Token";

/// Virtual line-in service number for YouTube Music.
pub const YOUTUBE_MUSIC_VLI_SERVICE: &str = "4";

// ─────────────────────────────────────────────────────────────────────────────
// Scheduler Timing
// ─────────────────────────────────────────────────────────────────────────────

/// Upper bound of a single scheduler sleep slice (seconds).
///
/// The wait loop re-reads settings after every slice, so this bounds how
/// stale a schedule edit can remain.
pub const MAX_WAIT_SLICE_SECS: u64 = 60;

/// How far ahead the resolver scans for the next eligible start (days).
pub const SCHEDULE_LOOKAHEAD_DAYS: i64 = 14;

/// Retry delay when no settings document is available yet (seconds).
pub const MISSING_SETTINGS_RETRY_SECS: u64 = 1;

/// Retry delay when the speaker roster is empty (seconds).
pub const EMPTY_ROSTER_RETRY_SECS: u64 = 30;

// ─────────────────────────────────────────────────────────────────────────────
// Monitor Timing
// ─────────────────────────────────────────────────────────────────────────────

/// Interval between playback monitor cycles (seconds).
pub const MONITOR_INTERVAL_SECS: u64 = 15;

/// Minimum spacing between duration writes for an unchanged session (seconds).
pub const DURATION_PERSIST_SECS: i64 = 60;

// ─────────────────────────────────────────────────────────────────────────────
// Calendar Sync
// ─────────────────────────────────────────────────────────────────────────────

/// Linear backoff step between calendar sync attempts (seconds).
pub const CALENDAR_BACKOFF_STEP_SECS: u64 = 5;

/// Cap on the calendar sync backoff (seconds).
pub const CALENDAR_BACKOFF_MAX_SECS: u64 = 30;
