//! Holiday calendar synchronization.
//!
//! Pulls an iCalendar feed of public holidays and merges the dates into
//! the holiday schedule list. Merging only ever adds entries or refreshes
//! names; schedules an operator has customized keep their playback
//! settings. Newly added holidays carry no playback target and therefore
//! skip playback until someone configures them.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::error::{AubadeError, AubadeResult};
use crate::protocol_constants::{CALENDAR_BACKOFF_MAX_SECS, CALENDAR_BACKOFF_STEP_SECS};
use crate::schedule::{DaySchedule, HolidaySchedule};
use crate::settings::{Settings, SettingsStore};

const RESYNC_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// One all-day event from the holiday feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub date: NaiveDate,
    pub name: String,
}

/// Parses VEVENT blocks out of an iCalendar document.
///
/// Handles folded lines and both `DTSTART:YYYYMMDDThhmmss` and
/// `DTSTART;VALUE=DATE:YYYYMMDD` forms. Events without a parsable date are
/// dropped.
#[must_use]
pub fn parse_calendar(ics: &str) -> Vec<CalendarEvent> {
    // Unfold continuation lines first (RFC 5545 folds at 75 octets).
    let mut unfolded: Vec<String> = Vec::new();
    for line in ics.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(previous) = unfolded.last_mut() {
                previous.push_str(line.trim_start());
                continue;
            }
        }
        unfolded.push(line.trim_end().to_string());
    }

    let mut events = Vec::new();
    let mut in_event = false;
    let mut date: Option<NaiveDate> = None;
    let mut name: Option<String> = None;

    for line in &unfolded {
        if line == "BEGIN:VEVENT" {
            in_event = true;
            date = None;
            name = None;
        } else if line == "END:VEVENT" {
            if let Some(date) = date.take() {
                events.push(CalendarEvent {
                    date,
                    name: name.take().unwrap_or_else(|| "Holiday".to_string()),
                });
            }
            in_event = false;
        } else if in_event {
            if let Some(value) = property_value(line, "DTSTART") {
                date = value
                    .get(..8)
                    .and_then(|v| NaiveDate::parse_from_str(v, "%Y%m%d").ok());
            } else if let Some(value) = property_value(line, "SUMMARY") {
                let value = value.trim();
                if !value.is_empty() {
                    name = Some(value.to_string());
                }
            }
        }
    }

    events
}

/// Extracts the value of `NAME:value` or `NAME;PARAM=..:value` lines.
fn property_value<'a>(line: &'a str, property: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(property)?;
    if !rest.starts_with(':') && !rest.starts_with(';') {
        return None;
    }
    rest.split_once(':').map(|(_, value)| value)
}

/// Merges calendar events into the holiday schedule list.
///
/// Returns the number of added or renamed entries. Existing entries keep
/// all of their playback configuration.
pub fn merge_events(settings: &mut Settings, events: &[CalendarEvent]) -> usize {
    let mut updates = 0;
    for event in events {
        match settings
            .holiday_schedules
            .iter_mut()
            .find(|h| h.date == event.date)
        {
            Some(existing) => {
                if existing.name.as_deref() != Some(event.name.as_str()) {
                    existing.name = Some(event.name.clone());
                    updates += 1;
                }
            }
            None => {
                settings.holiday_schedules.push(HolidaySchedule {
                    date: event.date,
                    name: Some(event.name.clone()),
                    skip_playback: false,
                    day: DaySchedule {
                        start_time: Some(settings.start_time),
                        stop_time: Some(settings.stop_time),
                        ..Default::default()
                    },
                });
                updates += 1;
            }
        }
    }
    if updates > 0 {
        settings.holiday_schedules.sort_by_key(|h| h.date);
    }
    updates
}

/// Periodically pulls the holiday feed and merges it into settings.
pub struct HolidayCalendarSync {
    client: Client,
    settings: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    calendar_url: String,
    max_attempts: u32,
}

impl HolidayCalendarSync {
    #[must_use]
    pub fn new(
        client: Client,
        settings: Arc<dyn SettingsStore>,
        clock: Arc<dyn Clock>,
        calendar_url: String,
        max_attempts: u32,
    ) -> Self {
        Self {
            client,
            settings,
            clock,
            calendar_url,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Syncs once at startup and then daily, until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        log::info!("[HolidaySync] Calendar sync started for {}", self.calendar_url);
        loop {
            match self.sync_with_retry(&cancel).await {
                Ok(0) => log::debug!("[HolidaySync] Holiday schedules already up to date"),
                Ok(updates) => log::info!("[HolidaySync] Applied {} holiday update(s)", updates),
                Err(e) => log::error!("[HolidaySync] Sync failed: {}", e),
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.clock.sleep(Duration::from_secs(RESYNC_INTERVAL_SECS)) => {}
            }
        }
        log::info!("[HolidaySync] Calendar sync stopped");
    }

    /// One sync with linear backoff between attempts.
    pub async fn sync_with_retry(&self, cancel: &CancellationToken) -> AubadeResult<usize> {
        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            if cancel.is_cancelled() {
                break;
            }
            match self.sync_once().await {
                Ok(updates) => return Ok(updates),
                Err(e) => {
                    last_error = e.to_string();
                    log::warn!(
                        "[HolidaySync] Attempt {}/{} failed: {}",
                        attempt,
                        self.max_attempts,
                        last_error
                    );
                    if attempt < self.max_attempts {
                        let backoff = (u64::from(attempt) * CALENDAR_BACKOFF_STEP_SECS)
                            .min(CALENDAR_BACKOFF_MAX_SECS);
                        self.clock.sleep(Duration::from_secs(backoff)).await;
                    }
                }
            }
        }
        Err(AubadeError::CalendarSync {
            attempts: self.max_attempts,
            last_error,
        })
    }

    async fn sync_once(&self) -> AubadeResult<usize> {
        let response = self
            .client
            .get(&self.calendar_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AubadeError::Device(e.to_string()))?;
        let ics = response
            .text()
            .await
            .map_err(|e| AubadeError::Device(e.to_string()))?;

        let events = parse_calendar(&ics);
        let Some(mut settings) = self.settings.load().await else {
            return Err(AubadeError::Settings(
                "no settings available to merge holidays into".to_string(),
            ));
        };

        let updates = merge_events(&mut settings, &events);
        if updates > 0 {
            self.settings.replace(settings).await?;
        }
        Ok(updates)
    }
}
