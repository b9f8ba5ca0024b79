//! Aubade Core - shared library for the Aubade playback automation.
//!
//! Aubade drives Sonos speakers on a schedule: it waits for the next
//! configured start, prepares and optionally groups the speakers, plays
//! the selected station or music-service content, and stops everything at
//! the end of the window. A background monitor records what actually
//! played as history sessions.
//!
//! # Architecture
//!
//! - [`settings`]: Configuration model and the settings store boundary
//! - [`schedule`]: Day/holiday schedule resolution and the wait loop
//! - [`sonos`]: Speaker control over UPnP/SOAP
//! - [`services`]: Orchestration loops (coordinator, monitor, calendar sync)
//! - [`clock`]: Injectable time source so schedule logic is testable
//! - [`error`]: Centralized error types
//!
//! The [`SettingsStore`](settings::SettingsStore),
//! [`SessionStore`](services::SessionStore) and
//! [`Notifier`](notify::Notifier) traits are the host boundaries; the
//! bundled in-memory implementations suit tests and embedding, servers
//! bring their own persistence.

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod clock;
pub mod error;
pub mod notify;
pub mod protocol_constants;
pub mod schedule;
pub mod services;
pub mod settings;
pub mod sonos;

// Re-export commonly used types at the crate root
pub use bootstrap::{bootstrap_services, BootstrapConfig, BootstrappedServices};
pub use clock::{Clock, SystemClock};
pub use error::{AubadeError, AubadeResult};
pub use notify::{LogNotifier, Notifier};
pub use schedule::{DayResolution, DaySchedule, HolidaySchedule, ResolvedSchedule};
pub use settings::{MediaEntry, MemorySettingsStore, Settings, SettingsStore, SpeakerTarget};

// Re-export Sonos types
pub use sonos::{
    ClientError, ClientResult, QueueItem, QueuePage, SonosConnector, SonosConnectorImpl,
    SonosService, TrackInfo, TrackProgress,
};

// Re-export service types
pub use services::{
    HolidayCalendarSync, MediaType, MemorySessionStore, PlaybackCoordinator, PlaybackMonitor,
    PlaybackSessionRecord, SessionStore,
};
