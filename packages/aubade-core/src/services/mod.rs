//! Application services layer.
//!
//! Long-running orchestration on top of the settings store and the Sonos
//! client: the scheduled playback loop, the history monitor and the
//! holiday calendar sync.

pub mod holiday_sync;
pub mod playback_coordinator;
pub mod playback_monitor;
pub mod session_store;

#[cfg(test)]
pub(crate) mod test_support;

pub use holiday_sync::{merge_events, parse_calendar, CalendarEvent, HolidayCalendarSync};
pub use playback_coordinator::PlaybackCoordinator;
pub use playback_monitor::PlaybackMonitor;
pub use session_store::{
    MediaType, MemorySessionStore, NewPlaybackSession, PlaybackSessionRecord, SessionStore,
};
