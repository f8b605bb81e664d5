//! Rolling momentum over the trailing week.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::fmt;

use crate::completion::CompletionHistory;
use crate::storage::config::MomentumConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MomentumState {
    Strong,
    Stable,
    Weak,
    Critical,
}

impl fmt::Display for MomentumState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MomentumState::Strong => "STRONG",
            MomentumState::Stable => "STABLE",
            MomentumState::Weak => "WEAK",
            MomentumState::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Momentum {
    pub state: MomentumState,
    /// Weighted completion rate over the window, `0.0..=1.0`.
    pub rate: f64,
}

/// Full day 1, partial day 0.5, missing or empty day 0.
fn day_weight(fraction: Option<f64>) -> f64 {
    match fraction {
        Some(f) if f >= 1.0 => 1.0,
        Some(f) if f > 0.0 => 0.5,
        _ => 0.0,
    }
}

/// Classify the `window_days` calendar days ending at `today` (inclusive).
pub fn momentum(history: &CompletionHistory, today: NaiveDate, config: &MomentumConfig) -> Momentum {
    let window = config.window_days.max(1);
    let sum: f64 = (0..window)
        .map(|back| {
            let day = today.checked_sub_days(Days::new(u64::from(back)));
            day_weight(day.and_then(|d| history.get(&d).copied()))
        })
        .sum();
    let rate = sum / f64::from(window);

    let state = if rate >= config.strong {
        MomentumState::Strong
    } else if rate >= config.stable {
        MomentumState::Stable
    } else if rate >= config.weak {
        MomentumState::Weak
    } else {
        MomentumState::Critical
    };
    Momentum { state, rate }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 10).unwrap()
    }

    fn history(fractions: &[f64]) -> CompletionHistory {
        fractions
            .iter()
            .enumerate()
            .map(|(i, f)| (today() - Days::new(i as u64), *f))
            .collect()
    }

    fn classify(h: &CompletionHistory) -> Momentum {
        momentum(h, today(), &MomentumConfig::default())
    }

    #[test]
    fn full_week_is_strong() {
        let m = classify(&history(&[1.0; 7]));
        assert_eq!(m.state, MomentumState::Strong);
        assert_eq!(m.rate, 1.0);
    }

    #[test]
    fn one_missing_day_is_stable_two_is_weak() {
        assert_eq!(classify(&history(&[1.0; 6])).state, MomentumState::Stable);
        assert_eq!(
            classify(&history(&[1.0, 1.0, 1.0, 1.0, 1.0, 0.0])).state,
            MomentumState::Weak
        );
    }

    #[test]
    fn partial_days_count_half() {
        let m = classify(&history(&[0.5, 0.2, 0.9, 0.1, 0.3, 0.6, 0.7]));
        assert_eq!(m.rate, 0.5);
        assert_eq!(m.state, MomentumState::Weak);
    }

    #[test]
    fn empty_history_is_critical() {
        let m = classify(&CompletionHistory::new());
        assert_eq!(m.state, MomentumState::Critical);
        assert_eq!(m.state.to_string(), "CRITICAL");
    }

    #[test]
    fn days_outside_window_are_ignored() {
        let mut h = history(&[1.0; 7]);
        h.insert(today() - Days::new(7), 0.0);
        h.insert(today() + Days::new(1), 0.0);
        assert_eq!(classify(&h).state, MomentumState::Strong);
    }
}
