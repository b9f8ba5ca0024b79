//! Next-start resolution and the re-entrant wait loop.
//!
//! The resolution functions are pure over `(Settings, now)` so every
//! calendar scenario can be tested without a clock. The wait loop re-reads
//! settings on every wake, so schedule edits made while waiting take effect
//! within one sleep slice.

use std::time::Duration;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::protocol_constants::{
    MAX_WAIT_SLICE_SECS, MISSING_SETTINGS_RETRY_SECS, SCHEDULE_LOOKAHEAD_DAYS,
};
use crate::schedule::model::{DayResolution, ResolvedSchedule};
use crate::settings::{Settings, SettingsStore};

/// Resolves which schedule governs `date`.
///
/// The active-day switch is checked first: an inactive weekday yields
/// [`DayResolution::Inactive`] even when a holiday entry exists for the date.
#[must_use]
pub fn resolve_day(settings: &Settings, date: NaiveDate) -> DayResolution {
    if !settings.is_active_day(date.weekday()) {
        return DayResolution::Inactive;
    }

    if let Some(holiday) = settings.holiday_schedules.iter().find(|h| h.date == date) {
        return DayResolution::Scheduled(ResolvedSchedule::Holiday(holiday.clone()));
    }

    if let Some(day) = settings.daily_schedules.get(&date.weekday()) {
        return DayResolution::Scheduled(ResolvedSchedule::Daily(day.clone()));
    }

    DayResolution::Defaults
}

/// The next start instant the automation will act on.
#[derive(Debug, Clone, PartialEq)]
pub struct NextStart {
    /// Absolute start instant.
    pub target: NaiveDateTime,
    /// Governing schedule; `None` means global defaults.
    pub schedule: Option<ResolvedSchedule>,
    /// Start time-of-day, after override resolution.
    pub start: NaiveTime,
    /// Weekday of the target date.
    pub day: Weekday,
}

/// Scans up to two weeks ahead for the next eligible start.
///
/// A date is skipped when its weekday is inactive or its holiday entry is
/// silent; a silent holiday removes the whole date, it does not fall back to
/// the weekday schedule. Today is skipped unless its start is strictly in
/// the future, so a start shared with the current minute cannot trigger
/// twice. If nothing qualifies the fallback is tomorrow at the default
/// start with no schedule.
#[must_use]
pub fn determine_next_start(settings: &Settings, now: NaiveDateTime) -> NextStart {
    let today = now.date();

    for offset in 0..=SCHEDULE_LOOKAHEAD_DAYS {
        let candidate_date = today + chrono::Duration::days(offset);

        let schedule = match resolve_day(settings, candidate_date) {
            DayResolution::Inactive => continue,
            DayResolution::Scheduled(s) if s.is_skipped() => continue,
            DayResolution::Scheduled(s) => Some(s),
            DayResolution::Defaults => None,
        };

        let start = schedule
            .as_ref()
            .and_then(|s| s.day().start_time)
            .unwrap_or(settings.start_time);

        if offset == 0 && start <= now.time() {
            continue;
        }

        return NextStart {
            target: candidate_date.and_time(start),
            schedule,
            start,
            day: candidate_date.weekday(),
        };
    }

    let fallback_date = today + chrono::Duration::days(1);
    NextStart {
        target: fallback_date.and_time(settings.start_time),
        schedule: None,
        start: settings.start_time,
        day: fallback_date.weekday(),
    }
}

/// Sleeps on the injected clock unless cancelled first.
///
/// Returns false when the token fired.
pub async fn sleep_or_cancel(
    clock: &dyn Clock,
    cancel: &CancellationToken,
    duration: Duration,
) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = clock.sleep(duration) => true,
    }
}

/// Blocks until the next start instant arrives.
///
/// Returns the settings snapshot in force at the moment of release, the
/// governing schedule and the absolute start instant, or `None` when
/// cancelled. Sleeps are capped at one minute so settings edits are picked
/// up promptly.
pub async fn wait_until_start_time(
    store: &dyn SettingsStore,
    clock: &dyn Clock,
    cancel: &CancellationToken,
) -> Option<(Settings, Option<ResolvedSchedule>, NaiveDateTime)> {
    let mut previous: Option<NextStart> = None;

    while !cancel.is_cancelled() {
        let Some(settings) = store.load().await else {
            if !sleep_or_cancel(
                clock,
                cancel,
                Duration::from_secs(MISSING_SETTINGS_RETRY_SECS),
            )
            .await
            {
                return None;
            }
            continue;
        };

        let now = clock.now();

        // A previously announced target for today may have been crossed while
        // sleeping. Recomputing would now skip today (starts are only taken
        // strictly in the future), so the crossing is honored directly.
        let (today_eligible, today_schedule) = match resolve_day(&settings, now.date()) {
            DayResolution::Scheduled(s) if !s.is_skipped() => (true, Some(s)),
            DayResolution::Scheduled(_) | DayResolution::Inactive => (false, None),
            DayResolution::Defaults => (true, None),
        };
        if today_eligible {
            if let Some(prev) = &previous {
                if prev.target.date() == now.date() && now >= prev.target {
                    let start = today_schedule
                        .as_ref()
                        .and_then(|s| s.day().start_time)
                        .unwrap_or(settings.start_time);
                    return Some((settings, today_schedule, now.date().and_time(start)));
                }
            }
        }

        let next = determine_next_start(&settings, now);

        if next.target <= now {
            return Some((settings, next.schedule, next.target));
        }

        let remaining = next.target - now;

        if previous.as_ref() != Some(&next) {
            log::debug!(
                "[Schedule] Starting in {} (target {})",
                format_remaining(remaining),
                next.target
            );
            previous = Some(next.clone());
        }

        let slice = remaining
            .to_std()
            .unwrap_or(Duration::ZERO)
            .min(Duration::from_secs(MAX_WAIT_SLICE_SECS));
        if !sleep_or_cancel(clock, cancel, slice).await {
            return None;
        }
    }

    None
}

fn format_remaining(remaining: chrono::Duration) -> String {
    let total_secs = remaining.num_seconds().max(0);
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;
    if days > 0 {
        format!("{days}d:{hours:02}h:{minutes:02}m:{seconds:02}s")
    } else {
        format!("{hours:02}h:{minutes:02}m:{seconds:02}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::schedule::model::{DaySchedule, HolidaySchedule};
    use crate::settings::MemorySettingsStore;
    use std::sync::Arc;

    // 2025-06-02 is a Monday.
    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        date(day).and_hms_opt(h, m, 0).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day_schedule(start: NaiveTime) -> DaySchedule {
        DaySchedule {
            start_time: Some(start),
            station_url: Some("example.com/stream".into()),
            ..Default::default()
        }
    }

    fn holiday(on: NaiveDate, start: NaiveTime) -> HolidaySchedule {
        HolidaySchedule {
            date: on,
            name: Some("Holiday".into()),
            skip_playback: false,
            day: day_schedule(start),
        }
    }

    #[test]
    fn resolve_day_prefers_holiday_over_daily() {
        let mut settings = Settings::default();
        settings
            .daily_schedules
            .insert(Weekday::Mon, day_schedule(time(8, 0)));
        settings.holiday_schedules.push(holiday(date(2), time(10, 0)));

        match resolve_day(&settings, date(2)) {
            DayResolution::Scheduled(ResolvedSchedule::Holiday(h)) => {
                assert_eq!(h.date, date(2));
            }
            other => panic!("expected holiday, got {other:?}"),
        }
    }

    #[test]
    fn inactive_weekday_beats_holiday() {
        let mut settings = Settings::default();
        settings.active_days.retain(|d| *d != Weekday::Mon);
        settings.holiday_schedules.push(holiday(date(2), time(10, 0)));

        assert_eq!(resolve_day(&settings, date(2)), DayResolution::Inactive);
    }

    #[test]
    fn next_start_uses_default_start_for_plain_day() {
        let settings = Settings::default();
        let next = determine_next_start(&settings, at(2, 5, 0));
        assert_eq!(next.target, at(2, 6, 0));
        assert!(next.schedule.is_none());
        assert_eq!(next.day, Weekday::Mon);
    }

    #[test]
    fn next_start_uses_daily_schedule_override() {
        let mut settings = Settings::default();
        settings
            .daily_schedules
            .insert(Weekday::Mon, day_schedule(time(7, 30)));

        let next = determine_next_start(&settings, at(2, 7, 0));
        assert_eq!(next.target, at(2, 7, 30));
        assert!(matches!(next.schedule, Some(ResolvedSchedule::Daily(_))));
    }

    #[test]
    fn passed_default_start_rolls_to_next_day() {
        let settings = Settings::default();
        let next = determine_next_start(&settings, at(2, 10, 0));
        assert_eq!(next.target, at(3, 6, 0));
    }

    #[test]
    fn passed_today_schedule_selects_next_day_schedule() {
        let mut settings = Settings::default();
        settings
            .daily_schedules
            .insert(Weekday::Mon, day_schedule(time(8, 0)));
        settings
            .daily_schedules
            .insert(Weekday::Tue, day_schedule(time(9, 0)));

        let next = determine_next_start(&settings, at(2, 10, 0));
        assert_eq!(next.target, at(3, 9, 0));
        assert_eq!(next.day, Weekday::Tue);
    }

    #[test]
    fn holiday_today_supplies_the_start() {
        let mut settings = Settings::default();
        settings.holiday_schedules.push(holiday(date(2), time(10, 0)));

        let next = determine_next_start(&settings, at(2, 9, 0));
        assert_eq!(next.target, at(2, 10, 0));
        assert!(matches!(next.schedule, Some(ResolvedSchedule::Holiday(_))));
    }

    #[test]
    fn holiday_on_next_day_is_selected_after_today_passed() {
        let mut settings = Settings::default();
        settings.holiday_schedules.push(holiday(date(3), time(7, 0)));

        let next = determine_next_start(&settings, at(2, 23, 0));
        assert_eq!(next.target, at(3, 7, 0));
        assert!(matches!(next.schedule, Some(ResolvedSchedule::Holiday(_))));
    }

    #[test]
    fn silent_holiday_removes_the_whole_date() {
        let mut settings = Settings::default();
        settings
            .daily_schedules
            .insert(Weekday::Mon, day_schedule(time(8, 0)));
        let mut skipped = holiday(date(2), time(8, 0));
        skipped.skip_playback = true;
        settings.holiday_schedules.push(skipped);

        // No weekday fallback for the silenced date; the scan moves on.
        let next = determine_next_start(&settings, at(2, 5, 0));
        assert_eq!(next.target.date(), date(3));
    }

    #[test]
    fn inactive_days_are_excluded_from_the_scan() {
        let mut settings = Settings::default();
        settings.active_days.retain(|d| *d != Weekday::Mon);

        let next = determine_next_start(&settings, at(2, 5, 0));
        assert_eq!(next.target, at(3, 6, 0));
        assert_eq!(next.day, Weekday::Tue);
    }

    #[test]
    fn start_equal_to_now_counts_as_passed() {
        let settings = Settings::default();
        let next = determine_next_start(&settings, at(2, 6, 0));
        assert_eq!(next.target, at(3, 6, 0));
    }

    #[test]
    fn no_eligible_day_falls_back_to_tomorrow_defaults() {
        let mut settings = Settings::default();
        settings.active_days.clear();

        let next = determine_next_start(&settings, at(2, 5, 0));
        assert_eq!(next.target, at(3, 6, 0));
        assert!(next.schedule.is_none());
    }

    #[tokio::test]
    async fn wait_releases_at_default_start() {
        let store = MemorySettingsStore::with_settings(Settings::default());
        let clock = ManualClock::new(at(2, 5, 0));
        let cancel = CancellationToken::new();

        let (_, schedule, start) = wait_until_start_time(&store, &clock, &cancel)
            .await
            .expect("should release");
        assert!(schedule.is_none());
        assert_eq!(start, at(2, 6, 0));
        assert!(clock.now() >= at(2, 6, 0));
    }

    #[tokio::test]
    async fn wait_releases_at_daily_schedule_start() {
        let mut settings = Settings::default();
        settings
            .daily_schedules
            .insert(Weekday::Mon, day_schedule(time(7, 30)));
        let store = MemorySettingsStore::with_settings(settings);
        let clock = ManualClock::new(at(2, 7, 0));
        let cancel = CancellationToken::new();

        let (_, schedule, start) = wait_until_start_time(&store, &clock, &cancel)
            .await
            .expect("should release");
        assert!(matches!(schedule, Some(ResolvedSchedule::Daily(_))));
        assert_eq!(start, at(2, 7, 30));
    }

    #[tokio::test]
    async fn wait_crosses_into_next_day_when_start_passed() {
        let store = MemorySettingsStore::with_settings(Settings::default());
        let clock = ManualClock::new(at(2, 10, 0));
        let cancel = CancellationToken::new();

        let (_, _, start) = wait_until_start_time(&store, &clock, &cancel)
            .await
            .expect("should release");
        assert_eq!(start, at(3, 6, 0));
    }

    #[tokio::test]
    async fn wait_returns_none_when_cancelled() {
        let store = MemorySettingsStore::new();
        let clock = ManualClock::new(at(2, 5, 0));
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(wait_until_start_time(&store, &clock, &cancel).await.is_none());
    }

    #[tokio::test]
    async fn wait_picks_up_settings_edits_between_slices() {
        let store = Arc::new(MemorySettingsStore::with_settings(Settings::default()));
        let clock = Arc::new(ManualClock::new(at(2, 5, 0)));
        let cancel = CancellationToken::new();

        // Move the start earlier after the first slice has been slept.
        let edit_store = Arc::clone(&store);
        let edit_clock = Arc::clone(&clock);
        let editor = tokio::spawn(async move {
            while edit_clock.now() < at(2, 5, 2) {
                tokio::task::yield_now().await;
            }
            let mut edited = Settings::default();
            edited.start_time = time(5, 30);
            edit_store.replace(edited).await.expect("replace");
        });

        let (_, _, start) = wait_until_start_time(store.as_ref(), clock.as_ref(), &cancel)
            .await
            .expect("should release");
        editor.await.expect("editor task");
        assert_eq!(start, at(2, 5, 30));
    }
}
