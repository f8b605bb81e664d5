//! Discipline score: a single 0-100 figure blending completion, streak
//! stability, punctuality and reset history.

use serde::Serialize;

use crate::completion::CompletionHistory;
use crate::progression::Profile;
use crate::storage::config::ScoreConfig;

/// Per-factor breakdown, each factor in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisciplineScore {
    pub score: u8,
    pub completion: f64,
    pub streak: f64,
    pub on_time: f64,
    pub reset: f64,
}

/// Score calculator carrying its weight table.
#[derive(Debug, Clone, Default)]
pub struct DisciplineCalculator {
    config: ScoreConfig,
}

impl DisciplineCalculator {
    pub fn new(config: ScoreConfig) -> Self {
        Self { config }
    }

    /// Mean recorded fraction, or the neutral value with no history.
    fn completion_factor(&self, history: &CompletionHistory) -> f64 {
        if history.is_empty() {
            return self.config.neutral_completion;
        }
        let sum: f64 = history.values().map(|f| f.clamp(0.0, 1.0)).sum();
        sum / history.len() as f64
    }

    fn streak_factor(&self, profile: &Profile) -> f64 {
        if profile.longest_streak == 0 {
            return self.config.baseline_streak_factor;
        }
        let stability = ratio(profile.current_streak, self.config.stability_days);
        let length = ratio(profile.longest_streak, self.config.length_days);
        0.5 * stability + 0.5 * length
    }

    fn reset_factor(&self, reset_count: usize) -> f64 {
        (1.0 - reset_count as f64 * self.config.reset_penalty).max(0.0)
    }

    pub fn breakdown(
        &self,
        profile: &Profile,
        history: &CompletionHistory,
        reset_count: usize,
    ) -> DisciplineScore {
        let completion = self.completion_factor(history);
        let streak = self.streak_factor(profile);
        let on_time = profile
            .on_time_rate
            .unwrap_or(self.config.default_on_time_rate)
            .clamp(0.0, 1.0);
        let reset = self.reset_factor(reset_count);

        let weighted = self.config.completion_weight * completion
            + self.config.streak_weight * streak
            + self.config.on_time_weight * on_time
            + self.config.reset_weight * reset;
        let score = (weighted * 100.0).clamp(0.0, 100.0).round() as u8;

        tracing::debug!(score, completion, streak, on_time, reset, "discipline score");
        DisciplineScore {
            score,
            completion,
            streak,
            on_time,
            reset,
        }
    }

    pub fn score(&self, profile: &Profile, history: &CompletionHistory, reset_count: usize) -> u8 {
        self.breakdown(profile, history, reset_count).score
    }
}

/// `min(1, value / days)`; a zero-day window counts as saturated.
fn ratio(value: u32, days: u32) -> f64 {
    if days == 0 {
        return 1.0;
    }
    (f64::from(value) / f64::from(days)).min(1.0)
}
