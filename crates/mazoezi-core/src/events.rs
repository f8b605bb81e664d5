use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::relapse::RelapseReason;

/// Every progression state change produces an Event.
/// The presentation layer renders them (level-up modal, reset notice, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ChallengeStarted {
        challenge_id: String,
        duration_days: u32,
        standards: usize,
        at: NaiveDateTime,
    },
    DayEvaluated {
        date: NaiveDate,
        fraction: f64,
        all_complete: bool,
        at: NaiveDateTime,
    },
    StreakExtended {
        streak: u32,
        longest: u32,
        at: NaiveDateTime,
    },
    XpAwarded {
        date: NaiveDate,
        amount: u64,
        total_xp: u64,
        at: NaiveDateTime,
    },
    LevelUp {
        level: u32,
        at: NaiveDateTime,
    },
    /// Max level reached; XP rolled over and the prestige counter advanced.
    Prestige {
        prestige_count: u32,
        at: NaiveDateTime,
    },
    FreezeConsumed {
        date: NaiveDate,
        tokens_left: u32,
        at: NaiveDateTime,
    },
    FreezeGranted {
        granted: u32,
        tokens: u32,
        at: NaiveDateTime,
    },
    CycleReset {
        cycle_day: u32,
        reason: RelapseReason,
        at: NaiveDateTime,
    },
}
