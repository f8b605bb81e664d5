//! Protocol helpers: the engine's notion of "now", the grace period,
//! cycle-day arithmetic and the streak multiplier.
//!
//! All dates are local calendar dates. The [`Clock`] trait is the single
//! source of "now" so transitions can be replayed deterministically.

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};

/// Source of local wall-clock time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;

    /// Current local calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Reads the system's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Clock pinned to `date` at `hour:00`.
    pub fn at(date: NaiveDate, hour: u32) -> Self {
        let at = date
            .and_hms_opt(hour.min(23), 0, 0)
            .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN));
        Self(at)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

/// True only while `date` is today and the local hour is below `grace_hours`.
///
/// Grace protects the day still in progress; backfilled dates never qualify.
pub fn is_within_grace(date: NaiveDate, clock: &impl Clock, grace_hours: u32) -> bool {
    let now = clock.now();
    date == now.date() && now.hour() < grace_hours
}

/// 1-based day of the current cycle, clamped to `[1, duration_days]`.
pub fn cycle_day(cycle_start: Option<NaiveDate>, today: NaiveDate, duration_days: u32) -> u32 {
    let Some(start) = cycle_start else {
        return 1;
    };
    let elapsed = (today - start).num_days() + 1;
    let day = elapsed.clamp(1, i64::from(duration_days.max(1)));
    day as u32
}

/// XP multiplier for a streak: `1 + streak / divisor`.
pub fn streak_multiplier(streak: u32, divisor: f64) -> f64 {
    if divisor <= 0.0 {
        return 1.0;
    }
    1.0 + f64::from(streak) / divisor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn grace_applies_to_today_before_threshold() {
        let today = date(2026, 3, 14);
        assert!(is_within_grace(today, &FixedClock::at(today, 0), 3));
        assert!(is_within_grace(today, &FixedClock::at(today, 2), 3));
        assert!(!is_within_grace(today, &FixedClock::at(today, 3), 3));
        assert!(!is_within_grace(today, &FixedClock::at(today, 18), 3));
    }

    #[test]
    fn grace_never_applies_to_other_dates() {
        let today = date(2026, 3, 14);
        for hour in [0, 1, 2, 12, 23] {
            let clock = FixedClock::at(today, hour);
            assert!(!is_within_grace(date(2026, 3, 13), &clock, 3));
            assert!(!is_within_grace(date(2026, 3, 15), &clock, 3));
        }
    }

    #[test]
    fn cycle_day_is_clamped() {
        let start = date(2026, 1, 1);
        assert_eq!(cycle_day(Some(start), start, 75), 1);
        assert_eq!(cycle_day(Some(start), date(2026, 1, 10), 75), 10);
        assert_eq!(cycle_day(Some(start), date(2026, 12, 31), 75), 75);
        // start in the future
        assert_eq!(cycle_day(Some(date(2026, 2, 1)), start, 75), 1);
        assert_eq!(cycle_day(None, start, 75), 1);
    }

    #[test]
    fn streak_multiplier_grows_linearly() {
        assert_eq!(streak_multiplier(0, 30.0), 1.0);
        assert_eq!(streak_multiplier(15, 30.0), 1.5);
        assert_eq!(streak_multiplier(30, 30.0), 2.0);
        assert_eq!(streak_multiplier(10, 0.0), 1.0);
    }

    #[test]
    fn system_clock_today_matches_now() {
        let clock = SystemClock;
        let now = clock.now();
        let today = clock.today();
        // Guard against running exactly across midnight.
        assert!(today == now.date() || today == now.date().succ_opt().unwrap());
    }
}
