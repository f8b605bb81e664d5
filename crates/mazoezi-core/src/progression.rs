//! Progression ledger: streaks, XP, levels and prestige.
//!
//! The ledger is a pure transition function. Given the current profile, the
//! day's record and its evaluation it returns the next profile and the flags to
//! persist; nothing is written until the session commits the whole
//! [`DayTransition`].
//!
//! ## Transitions
//!
//! ```text
//! complete, not credited   -> streak+1, XP award, level-up / prestige
//! complete, credited       -> no-op
//! incomplete, in grace     -> no-op (day still open)
//! incomplete, past grace   -> freeze token consumed | reset required
//! incomplete, judged       -> no-op
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::ActiveChallenge;
use crate::completion::{DayRecord, Evaluation};
use crate::events::Event;
use crate::protocol::{cycle_day, streak_multiplier};
use crate::relapse::{ArchivedCycle, RelapseReason};
use crate::storage::config::XpConfig;

/// XP earned per date.
pub type XpHistory = BTreeMap<NaiveDate, u64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub notifications: bool,
}

/// Aggregate progression state of the single local profile.
///
/// Missing fields deserialize to their defaults; absence is not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Profile {
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub prestige_count: u32,
    pub freeze_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_time_rate: Option<f64>,
    pub preferences: Preferences,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_challenge: Option<ActiveChallenge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_accepted_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Length of the active cycle, or `fallback` without a challenge.
    pub fn duration_days(&self, fallback: u32) -> u32 {
        self.active_challenge
            .as_ref()
            .map(|c| c.duration_days)
            .unwrap_or(fallback)
    }
}

/// Partial profile update with shallow-merge semantics: only fields that are
/// `Some` are written, everything else stays as stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(rename = "totalXP", skip_serializing_if = "Option::is_none")]
    pub total_xp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_streak: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longest_streak: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prestige_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeze_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_time_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_challenge: Option<ActiveChallenge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_accepted_at: Option<DateTime<Utc>>,
}

fn changed<T: PartialEq + Clone>(before: &T, after: &T) -> Option<T> {
    (before != after).then(|| after.clone())
}

fn changed_opt<T: PartialEq + Clone>(before: &Option<T>, after: &Option<T>) -> Option<T> {
    if before != after {
        after.clone()
    } else {
        None
    }
}

impl ProfilePatch {
    /// Fields that differ between `before` and `after`.
    ///
    /// Optional fields are never cleared by a patch; the engine only ever sets them.
    pub fn diff(before: &Profile, after: &Profile) -> Self {
        Self {
            total_xp: changed(&before.total_xp, &after.total_xp),
            current_streak: changed(&before.current_streak, &after.current_streak),
            longest_streak: changed(&before.longest_streak, &after.longest_streak),
            prestige_count: changed(&before.prestige_count, &after.prestige_count),
            freeze_tokens: changed(&before.freeze_tokens, &after.freeze_tokens),
            cycle_start_date: changed_opt(&before.cycle_start_date, &after.cycle_start_date),
            on_time_rate: changed_opt(&before.on_time_rate, &after.on_time_rate),
            preferences: changed(&before.preferences, &after.preferences),
            active_challenge: changed_opt(&before.active_challenge, &after.active_challenge),
            protocol_accepted_at: changed_opt(
                &before.protocol_accepted_at,
                &after.protocol_accepted_at,
            ),
        }
    }

    /// Patch that overwrites every field present in `profile`.
    pub fn full(profile: &Profile) -> Self {
        Self::diff(&Profile::default(), profile).with_counters(profile)
    }

    fn with_counters(mut self, profile: &Profile) -> Self {
        self.total_xp = Some(profile.total_xp);
        self.current_streak = Some(profile.current_streak);
        self.longest_streak = Some(profile.longest_streak);
        self.prestige_count = Some(profile.prestige_count);
        self.freeze_tokens = Some(profile.freeze_tokens);
        self.preferences = Some(profile.preferences.clone());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Level and progress toward the next one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelProgress {
    pub level: u32,
    pub total_xp: u64,
    pub xp_into_level: u64,
    pub xp_per_level: u64,
    /// 0.0 .. 100.0 progress within the current level.
    pub percent: f64,
    pub prestige_count: u32,
}

/// What the ledger decided for a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Day completed for the first time; streak extended and XP awarded.
    Credited { xp: u64 },
    /// Day was already credited; nothing changes.
    AlreadyCredited,
    /// Day is incomplete but still inside the grace window.
    WithinGrace,
    /// Day is incomplete; a freeze token preserved the streak.
    FreezeConsumed { tokens_left: u32 },
    /// Day is incomplete and no token is left; the cycle must reset.
    ResetRequired,
    /// The cycle was archived and restarted.
    Reset,
    /// Day is incomplete and was already forgiven or reset.
    AlreadyJudged,
}

/// Result of applying one day to the profile.
#[derive(Debug, Clone, PartialEq)]
pub struct DayTransition {
    pub profile: Profile,
    pub record: DayRecord,
    pub verdict: Verdict,
    pub xp_awarded: Option<u64>,
    pub events: Vec<Event>,
}

/// Streak, XP and level state machine.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    config: XpConfig,
}

impl Ledger {
    /// Create a ledger with the default XP economy.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: XpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &XpConfig {
        &self.config
    }

    fn per_level(&self) -> u64 {
        self.config.per_level.max(1)
    }

    fn level_cap(&self) -> u64 {
        u64::from(self.config.prestige_level.max(1))
    }

    /// `((xp / per_level) mod cap) + 1`, clamped to `[1, cap]`.
    pub fn level_for_xp(&self, total_xp: u64) -> u32 {
        let cap = self.level_cap();
        let level = (total_xp / self.per_level()) % cap + 1;
        level.clamp(1, cap) as u32
    }

    /// Whether `total_xp` has reached the prestige level.
    ///
    /// Uses the unwrapped level so a single large award cannot skip past the cap.
    fn reaches_prestige(&self, total_xp: u64) -> bool {
        total_xp / self.per_level() + 1 >= self.level_cap()
    }

    /// XP for a fully completed day.
    ///
    /// `streak` is the streak after today's increment.
    pub fn full_day_award(&self, standard_count: usize, streak: u32, prestige_count: u32) -> u64 {
        let base = self.config.per_standard * standard_count as u64 + self.config.full_day_bonus;
        let mut multiplier = streak_multiplier(streak, self.config.streak_divisor);
        if prestige_count > 0 {
            multiplier *= self.config.prestige_boost;
        }
        (base as f64 * multiplier).round().max(0.0) as u64
    }

    pub fn progress(&self, profile: &Profile) -> LevelProgress {
        let per_level = self.per_level();
        let xp_into_level = profile.total_xp % per_level;
        LevelProgress {
            level: self.level_for_xp(profile.total_xp),
            total_xp: profile.total_xp,
            xp_into_level,
            xp_per_level: per_level,
            percent: xp_into_level as f64 / per_level as f64 * 100.0,
            prestige_count: profile.prestige_count,
        }
    }

    /// Decide what `date` does to the profile.
    ///
    /// `within_grace` is the caller's grace test for `date`; `at` stamps events.
    pub fn judge(
        &self,
        profile: &Profile,
        record: &DayRecord,
        evaluation: &Evaluation,
        date: NaiveDate,
        within_grace: bool,
        at: NaiveDateTime,
    ) -> DayTransition {
        let mut next = profile.clone();
        let mut record = record.clone();
        let mut events = Vec::new();
        let mut xp_awarded = None;

        let verdict = if evaluation.all_complete {
            if record.xp_awarded {
                Verdict::AlreadyCredited
            } else {
                next.current_streak += 1;
                next.longest_streak = next.longest_streak.max(next.current_streak);
                events.push(Event::StreakExtended {
                    streak: next.current_streak,
                    longest: next.longest_streak,
                    at,
                });

                let xp = self.full_day_award(
                    evaluation.total,
                    next.current_streak,
                    next.prestige_count,
                );
                let previous_level = self.level_for_xp(next.total_xp);
                next.total_xp = next.total_xp.saturating_add(xp);
                record.xp_awarded = true;
                xp_awarded = Some(xp);
                events.push(Event::XpAwarded {
                    date,
                    amount: xp,
                    total_xp: next.total_xp,
                    at,
                });

                let level = self.level_for_xp(next.total_xp);
                if self.reaches_prestige(next.total_xp) {
                    next.prestige_count += 1;
                    next.total_xp = 0;
                    tracing::info!(prestige_count = next.prestige_count, "prestige reached");
                    events.push(Event::Prestige {
                        prestige_count: next.prestige_count,
                        at,
                    });
                } else if level > previous_level {
                    tracing::info!(level, "level up");
                    events.push(Event::LevelUp { level, at });
                }
                Verdict::Credited { xp }
            }
        } else if within_grace {
            Verdict::WithinGrace
        } else if record.has_miss_verdict() {
            Verdict::AlreadyJudged
        } else if next.freeze_tokens > 0 {
            next.freeze_tokens -= 1;
            record.freeze_applied = true;
            tracing::info!(%date, tokens_left = next.freeze_tokens, "freeze token consumed");
            events.push(Event::FreezeConsumed {
                date,
                tokens_left: next.freeze_tokens,
                at,
            });
            Verdict::FreezeConsumed {
                tokens_left: next.freeze_tokens,
            }
        } else {
            Verdict::ResetRequired
        };

        DayTransition {
            profile: next,
            record,
            verdict,
            xp_awarded,
            events,
        }
    }

    /// Archive the current cycle and restart the streak and cycle clock.
    pub fn reset(
        &self,
        profile: &Profile,
        reason: RelapseReason,
        missed_standard: Option<String>,
        now: NaiveDateTime,
        fallback_duration: u32,
    ) -> (Profile, ArchivedCycle) {
        let today = now.date();
        let day = cycle_day(
            profile.cycle_start_date,
            today,
            profile.duration_days(fallback_duration),
        );
        let archived = ArchivedCycle::new(profile.cycle_start_date, day, reason, missed_standard, now);

        let mut next = profile.clone();
        next.current_streak = 0;
        next.cycle_start_date = Some(today);
        tracing::info!(cycle_day = day, reason = reason.id(), "cycle reset");
        (next, archived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::evaluate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn noon(d: NaiveDate) -> NaiveDateTime {
        d.and_hms_opt(12, 0, 0).unwrap()
    }

    fn steps_challenge() -> ActiveChallenge {
        ActiveChallenge::from_catalog("steps10k").unwrap()
    }

    fn judge_steps(ledger: &Ledger, profile: &Profile, record: &DayRecord, grace: bool) -> DayTransition {
        let challenge = steps_challenge();
        let eval = evaluate(&challenge.standards, record);
        let d = date(2026, 5, 4);
        ledger.judge(profile, record, &eval, d, grace, noon(d))
    }

    fn done() -> DayRecord {
        let mut r = DayRecord::default();
        r.set("steps10k", 10_000.0);
        r
    }

    #[test]
    fn level_formula_wraps_at_cap() {
        let ledger = Ledger::new();
        assert_eq!(ledger.level_for_xp(0), 1);
        assert_eq!(ledger.level_for_xp(999), 1);
        assert_eq!(ledger.level_for_xp(1000), 2);
        assert_eq!(ledger.level_for_xp(99_000), 100);
        assert_eq!(ledger.level_for_xp(100_000), 1);
    }

    #[test]
    fn award_uses_post_increment_streak() {
        let ledger = Ledger::new();
        // 50 * 1 + 200 = 250, streak 1 -> 250 * (1 + 1/30)
        assert_eq!(ledger.full_day_award(1, 1, 0), 258);
        // 7 standards, streak 30 -> 550 * 2
        assert_eq!(ledger.full_day_award(7, 30, 0), 1100);
        // prestige boost
        assert_eq!(ledger.full_day_award(7, 30, 2), 1155);
    }

    #[test]
    fn completed_day_extends_streak_and_awards_once() {
        let ledger = Ledger::new();
        let profile = Profile {
            current_streak: 4,
            longest_streak: 4,
            ..Profile::default()
        };
        let first = judge_steps(&ledger, &profile, &done(), false);
        assert_eq!(first.profile.current_streak, 5);
        assert_eq!(first.profile.longest_streak, 5);
        assert_eq!(first.verdict, Verdict::Credited { xp: 292 });
        assert!(first.record.xp_awarded);

        let second = judge_steps(&ledger, &first.profile, &first.record, false);
        assert_eq!(second.verdict, Verdict::AlreadyCredited);
        assert_eq!(second.profile, first.profile);
        assert!(second.events.is_empty());
    }

    #[test]
    fn level_up_event_fires_when_crossing_boundary() {
        let ledger = Ledger::new();
        let profile = Profile {
            total_xp: 900,
            ..Profile::default()
        };
        let t = judge_steps(&ledger, &profile, &done(), false);
        assert!(t
            .events
            .iter()
            .any(|e| matches!(e, Event::LevelUp { level: 2, .. })));
    }

    #[test]
    fn prestige_resets_xp_and_counts() {
        let ledger = Ledger::new();
        let profile = Profile {
            total_xp: 98_900,
            ..Profile::default()
        };
        let t = judge_steps(&ledger, &profile, &done(), false);
        assert_eq!(t.profile.total_xp, 0);
        assert_eq!(t.profile.prestige_count, 1);
        assert_eq!(ledger.level_for_xp(t.profile.total_xp), 1);
        assert!(t.events.iter().any(|e| matches!(e, Event::Prestige { prestige_count: 1, .. })));
        assert!(!t.events.iter().any(|e| matches!(e, Event::LevelUp { .. })));
    }

    #[test]
    fn oversized_award_cannot_skip_prestige() {
        let ledger = Ledger::with_config(XpConfig {
            full_day_bonus: 5_000,
            ..XpConfig::default()
        });
        let profile = Profile {
            total_xp: 97_500,
            ..Profile::default()
        };
        let t = judge_steps(&ledger, &profile, &done(), false);
        assert_eq!(t.profile.prestige_count, 1);
        assert_eq!(t.profile.total_xp, 0);
    }

    #[test]
    fn incomplete_within_grace_is_pending() {
        let ledger = Ledger::new();
        let profile = Profile::default();
        let t = judge_steps(&ledger, &profile, &DayRecord::default(), true);
        assert_eq!(t.verdict, Verdict::WithinGrace);
        assert_eq!(t.profile, profile);
    }

    #[test]
    fn freeze_token_forgives_once() {
        let ledger = Ledger::new();
        let profile = Profile {
            current_streak: 9,
            longest_streak: 12,
            freeze_tokens: 1,
            ..Profile::default()
        };
        let t = judge_steps(&ledger, &profile, &DayRecord::default(), false);
        assert_eq!(t.verdict, Verdict::FreezeConsumed { tokens_left: 0 });
        assert_eq!(t.profile.freeze_tokens, 0);
        assert_eq!(t.profile.current_streak, 9);
        assert!(t.record.freeze_applied);

        let again = judge_steps(&ledger, &t.profile, &t.record, false);
        assert_eq!(again.verdict, Verdict::AlreadyJudged);
    }

    #[test]
    fn no_token_requires_reset() {
        let ledger = Ledger::new();
        let t = judge_steps(&ledger, &Profile::default(), &DayRecord::default(), false);
        assert_eq!(t.verdict, Verdict::ResetRequired);
    }

    #[test]
    fn reset_archives_and_restarts_cycle() {
        let ledger = Ledger::new();
        let profile = Profile {
            current_streak: 3,
            longest_streak: 8,
            cycle_start_date: Some(date(2026, 5, 1)),
            active_challenge: Some(steps_challenge()),
            ..Profile::default()
        };
        let now = noon(date(2026, 5, 4));
        let (next, archived) =
            ledger.reset(&profile, RelapseReason::Travel, Some("10,000 Steps".into()), now, 75);
        assert_eq!(next.current_streak, 0);
        assert_eq!(next.longest_streak, 8);
        assert_eq!(next.cycle_start_date, Some(date(2026, 5, 4)));
        assert_eq!(archived.cycle_day_at_reset, 4);
        assert_eq!(archived.cycle_start_date, Some(date(2026, 5, 1)));
        assert_eq!(archived.relapse_reason, RelapseReason::Travel);
    }

    #[test]
    fn patch_diff_only_carries_changes() {
        let before = Profile::default();
        let after = Profile {
            current_streak: 1,
            longest_streak: 1,
            ..Profile::default()
        };
        let patch = ProfilePatch::diff(&before, &after);
        assert_eq!(patch.current_streak, Some(1));
        assert_eq!(patch.total_xp, None);
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 2);
        assert!(ProfilePatch::diff(&after, &after).is_empty());
    }

    #[test]
    fn profile_reads_legacy_camel_case_document() {
        let json = r#"{"totalXP": 1200, "currentStreak": 2, "longestStreak": 5,
                       "cycleStartDate": "2026-01-03", "currentCycleDay": 4}"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.total_xp, 1200);
        assert_eq!(profile.longest_streak, 5);
        assert_eq!(profile.freeze_tokens, 0);
        assert_eq!(profile.cycle_start_date, Some(date(2026, 1, 3)));
    }

    #[test]
    fn progress_reports_percent_into_level() {
        let ledger = Ledger::new();
        let profile = Profile {
            total_xp: 2_250,
            ..Profile::default()
        };
        let p = ledger.progress(&profile);
        assert_eq!(p.level, 3);
        assert_eq!(p.xp_into_level, 250);
        assert_eq!(p.percent, 25.0);
    }
}
