//! Dashboard views derived from the histories: year heatmap, recent completion
//! series, cumulative XP growth and the monthly review.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::completion::CompletionHistory;
use crate::discipline::DisciplineCalculator;
use crate::progression::{Profile, XpHistory};
use crate::storage::config::ScoreConfig;

/// Days covered by the heatmap, ending today.
pub const HEATMAP_DAYS: u32 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeatmapCell {
    pub date: NaiveDate,
    /// 0 (nothing) ..= 4 (fully complete).
    pub level: u8,
}

fn heat_level(fraction: f64) -> u8 {
    if fraction >= 1.0 {
        4
    } else if fraction >= 0.75 {
        3
    } else if fraction >= 0.5 {
        2
    } else if fraction > 0.0 {
        1
    } else {
        0
    }
}

/// One cell per day for the last [`HEATMAP_DAYS`] days, oldest first.
pub fn heatmap(history: &CompletionHistory, today: NaiveDate) -> Vec<HeatmapCell> {
    trailing_days(today, HEATMAP_DAYS)
        .map(|date| HeatmapCell {
            date,
            level: history.get(&date).copied().map(heat_level).unwrap_or(0),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint<T> {
    pub date: NaiveDate,
    pub value: T,
}

/// Completion percentage (one decimal) for the `days` days ending today.
pub fn completion_series(
    history: &CompletionHistory,
    today: NaiveDate,
    days: u32,
) -> Vec<SeriesPoint<f64>> {
    trailing_days(today, days)
        .map(|date| {
            let pct = history.get(&date).copied().unwrap_or(0.0) * 100.0;
            SeriesPoint {
                date,
                value: (pct * 10.0).round() / 10.0,
            }
        })
        .collect()
}

/// Running XP total by ascending date.
pub fn xp_growth(xp_history: &XpHistory) -> Vec<SeriesPoint<u64>> {
    let mut total = 0u64;
    xp_history
        .iter()
        .map(|(date, xp)| {
            total = total.saturating_add(*xp);
            SeriesPoint {
                date: *date,
                value: total,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReview {
    pub generated_on: NaiveDate,
    pub longest_streak: u32,
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
    pub discipline_score: u8,
    pub resets: usize,
}

pub fn monthly_review(
    profile: &Profile,
    history: &CompletionHistory,
    reset_count: usize,
    today: NaiveDate,
    score: &ScoreConfig,
) -> MonthlyReview {
    MonthlyReview {
        generated_on: today,
        longest_streak: profile.longest_streak,
        total_xp: profile.total_xp,
        discipline_score: DisciplineCalculator::new(score.clone()).score(profile, history, reset_count),
        resets: reset_count,
    }
}

/// `count` consecutive dates ending at `today`, oldest first.
fn trailing_days(today: NaiveDate, count: u32) -> impl Iterator<Item = NaiveDate> {
    (0..count)
        .rev()
        .filter_map(move |back| today.checked_sub_days(Days::new(u64::from(back))))
}
