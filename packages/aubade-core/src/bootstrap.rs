//! Application bootstrap and dependency wiring.
//!
//! The composition root: every service is instantiated and wired here, so
//! the dependency graph is visible in one place and hosts can swap any
//! store or notifier implementation before calling in.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, SystemClock};
use crate::notify::Notifier;
use crate::protocol_constants::SOAP_TIMEOUT_SECS;
use crate::services::{HolidayCalendarSync, PlaybackCoordinator, PlaybackMonitor, SessionStore};
use crate::settings::SettingsStore;
use crate::sonos::{SonosConnector, SonosConnectorImpl};

/// Host-provided bootstrap options.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Holiday calendar feed URL; calendar sync is disabled when absent.
    pub calendar_url: Option<String>,
    /// Attempts per calendar sync before giving up until the next cycle.
    pub calendar_max_attempts: u32,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            calendar_url: None,
            calendar_max_attempts: 5,
        }
    }
}

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Sonos client for direct speaker operations.
    pub sonos: Arc<dyn SonosConnector>,
    /// Configuration store shared by all loops.
    pub settings: Arc<dyn SettingsStore>,
    /// Playback history store.
    pub sessions: Arc<dyn SessionStore>,
    /// Notification sink.
    pub notifier: Arc<dyn Notifier>,
    /// Time source; the system clock outside of tests.
    pub clock: Arc<dyn Clock>,
    /// Scheduled playback loop.
    pub coordinator: Arc<PlaybackCoordinator>,
    /// Playback history monitor.
    pub monitor: Arc<PlaybackMonitor>,
    /// Calendar sync, when a feed URL is configured.
    pub holiday_sync: Option<Arc<HolidayCalendarSync>>,
    /// Shared HTTP client for connection pooling.
    http_client: Client,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Returns the shared HTTP client.
    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    /// Spawns the background loops. The returned handles complete once
    /// shutdown has been signalled.
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        let coordinator = Arc::clone(&self.coordinator);
        let cancel = self.cancel_token.clone();
        handles.push(tokio::spawn(async move {
            coordinator.run(cancel).await;
        }));

        let monitor = Arc::clone(&self.monitor);
        let cancel = self.cancel_token.clone();
        handles.push(tokio::spawn(async move {
            monitor.run(cancel).await;
        }));

        if let Some(holiday_sync) = &self.holiday_sync {
            let holiday_sync = Arc::clone(holiday_sync);
            let cancel = self.cancel_token.clone();
            handles.push(tokio::spawn(async move {
                holiday_sync.run(cancel).await;
            }));
        }

        handles
    }

    /// Signals all background loops to wind down.
    pub fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");
        self.cancel_token.cancel();
    }
}

/// Creates the shared HTTP client for all speaker communication.
///
/// One pooled client serves every speaker; the timeout keeps a dead
/// speaker from stalling a whole start cycle.
fn create_http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(SOAP_TIMEOUT_SECS))
        .build()
        .expect("Failed to create HTTP client")
}

/// Wires all services together.
///
/// The host supplies the persistence and notification boundaries; this
/// function supplies everything that talks to speakers and the clock.
pub fn bootstrap_services(
    settings: Arc<dyn SettingsStore>,
    sessions: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
    config: BootstrapConfig,
) -> BootstrappedServices {
    let http_client = create_http_client();
    let cancel_token = CancellationToken::new();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let sonos: Arc<dyn SonosConnector> =
        Arc::new(SonosConnectorImpl::new(http_client.clone()));

    let coordinator = Arc::new(PlaybackCoordinator::new(
        Arc::clone(&sonos),
        Arc::clone(&settings),
        Arc::clone(&notifier),
        Arc::clone(&clock),
    ));

    let monitor = Arc::new(PlaybackMonitor::new(
        Arc::clone(&sonos),
        Arc::clone(&settings),
        Arc::clone(&sessions),
        Arc::clone(&clock),
    ));

    let holiday_sync = config.calendar_url.map(|url| {
        Arc::new(HolidayCalendarSync::new(
            http_client.clone(),
            Arc::clone(&settings),
            Arc::clone(&clock),
            url,
            config.calendar_max_attempts,
        ))
    });

    BootstrappedServices {
        sonos,
        settings,
        sessions,
        notifier,
        clock,
        coordinator,
        monitor,
        holiday_sync,
        http_client,
        cancel_token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogNotifier;
    use crate::services::MemorySessionStore;
    use crate::settings::MemorySettingsStore;

    fn bootstrap(config: BootstrapConfig) -> BootstrappedServices {
        bootstrap_services(
            Arc::new(MemorySettingsStore::new()),
            Arc::new(MemorySessionStore::new()),
            Arc::new(LogNotifier),
            config,
        )
    }

    #[tokio::test]
    async fn calendar_sync_is_optional() {
        let without = bootstrap(BootstrapConfig::default());
        assert!(without.holiday_sync.is_none());

        let with = bootstrap(BootstrapConfig {
            calendar_url: Some("http://calendar.example/at.ics".to_string()),
            ..Default::default()
        });
        assert!(with.holiday_sync.is_some());
    }

    #[tokio::test]
    async fn spawned_loops_stop_on_shutdown() {
        let services = bootstrap(BootstrapConfig::default());
        let handles = services.spawn();
        services.shutdown();
        for handle in handles {
            handle.await.expect("loop task");
        }
    }
}
