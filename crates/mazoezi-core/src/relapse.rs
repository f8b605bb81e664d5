//! Relapse intelligence.
//!
//! Every cycle reset is archived with its context (why, which weekday, which
//! standard was missed). Once enough resets exist the analyzer surfaces the
//! recurring risk factors.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a cycle was reset. `Other` doubles as the "skip" sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum RelapseReason {
    Schedule,
    Travel,
    Fatigue,
    Motivation,
    Illness,
    #[default]
    Other,
}

impl RelapseReason {
    pub const ALL: [RelapseReason; 6] = [
        RelapseReason::Schedule,
        RelapseReason::Travel,
        RelapseReason::Fatigue,
        RelapseReason::Motivation,
        RelapseReason::Illness,
        RelapseReason::Other,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            RelapseReason::Schedule => "schedule",
            RelapseReason::Travel => "travel",
            RelapseReason::Fatigue => "fatigue",
            RelapseReason::Motivation => "motivation",
            RelapseReason::Illness => "illness",
            RelapseReason::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RelapseReason::Schedule => "Schedule conflict",
            RelapseReason::Travel => "Travel",
            RelapseReason::Fatigue => "Fatigue",
            RelapseReason::Motivation => "Motivation drop",
            RelapseReason::Illness => "Illness",
            RelapseReason::Other => "Other",
        }
    }
}

impl From<String> for RelapseReason {
    /// Unknown ids collapse to `Other` so an archive never holds a reasonless entry.
    fn from(s: String) -> Self {
        s.parse().unwrap_or(RelapseReason::Other)
    }
}

impl std::str::FromStr for RelapseReason {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelapseReason::ALL
            .into_iter()
            .find(|r| r.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown relapse reason: {s}"))
    }
}

impl fmt::Display for RelapseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Weekday stored as 0 = Sunday .. 6 = Saturday, the backup file's encoding.
mod weekday_index {
    use chrono::Weekday;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(day: &Weekday, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(day.num_days_from_sunday() as u8)
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Index(u8),
        Name(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Weekday, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Index(i) if i < 7 => Ok((0..i).fold(Weekday::Sun, |day, _| day.succ())),
            Raw::Index(i) => Err(de::Error::custom(format!("weekday index {i} out of range"))),
            Raw::Name(name) => name
                .parse::<Weekday>()
                .map_err(|_| de::Error::custom(format!("unknown weekday {name}"))),
        }
    }
}

/// One archived reset. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedCycle {
    #[serde(default)]
    pub id: String,
    pub cycle_start_date: Option<NaiveDate>,
    #[serde(alias = "cycleDay")]
    pub cycle_day_at_reset: u32,
    #[serde(default)]
    pub relapse_reason: RelapseReason,
    #[serde(with = "weekday_index")]
    pub relapse_day_of_week: Weekday,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missed_standard: Option<String>,
    pub archived_at: DateTime<Utc>,
}

impl ArchivedCycle {
    /// Archive entry stamped with the local time `now`.
    pub fn new(
        cycle_start_date: Option<NaiveDate>,
        cycle_day_at_reset: u32,
        relapse_reason: RelapseReason,
        missed_standard: Option<String>,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            cycle_start_date,
            cycle_day_at_reset,
            relapse_reason,
            relapse_day_of_week: now.weekday(),
            missed_standard,
            archived_at: local_to_utc(now),
        }
    }
}

pub(crate) fn local_to_utc(local: NaiveDateTime) -> DateTime<Utc> {
    Local
        .from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local))
}

/// Context handed to a [`RelapsePrompt`] when a reset is imminent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResetContext {
    pub date: NaiveDate,
    pub cycle_day: u32,
    pub missed_standard: Option<String>,
}

/// Supplies the reason for an imminent reset, typically by asking the user.
///
/// Returning `None` means the user skipped; the engine then records
/// [`RelapseReason::Other`].
pub trait RelapsePrompt {
    fn relapse_reason(&mut self, ctx: &ResetContext) -> Option<RelapseReason>;
}

impl RelapsePrompt for RelapseReason {
    fn relapse_reason(&mut self, _ctx: &ResetContext) -> Option<RelapseReason> {
        Some(*self)
    }
}

impl<F> RelapsePrompt for F
where
    F: FnMut(&ResetContext) -> Option<RelapseReason>,
{
    fn relapse_reason(&mut self, ctx: &ResetContext) -> Option<RelapseReason> {
        self(ctx)
    }
}

/// Recurring risk factors across archived resets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelapsePatterns {
    pub top_reason: Option<RelapseReason>,
    /// Three-letter weekday, e.g. "Mon".
    pub top_day: Option<String>,
    pub top_missed: Option<String>,
    pub total_resets: usize,
}

impl RelapsePatterns {
    /// Human-readable insight lines for the risk panel.
    pub fn insights(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(day) = &self.top_day {
            lines.push(format!("Most resets on {day}s."));
        }
        if let Some(missed) = &self.top_missed {
            lines.push(format!("{missed} most frequently missed."));
        }
        if let Some(reason) = &self.top_reason {
            lines.push(format!("Common reason: {}.", reason.label()));
        }
        lines
    }
}

/// Most frequent value; on a tie the value seen first wins.
fn most_frequent<T: PartialEq>(values: impl IntoIterator<Item = T>) -> Option<T> {
    let mut tally: Vec<(T, usize)> = Vec::new();
    for value in values {
        match tally.iter_mut().find(|(v, _)| *v == value) {
            Some((_, count)) => *count += 1,
            None => tally.push((value, 1)),
        }
    }

    let mut best: Option<(T, usize)> = None;
    for (value, count) in tally {
        if best.as_ref().map_or(true, |(_, c)| count > *c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v)
}

/// Mine `archive` (newest first) for recurring reset factors.
///
/// Returns `None` below `min_sample` entries: too few resets to call a pattern.
/// Ties go to the value seen first, i.e. the most recent one.
pub fn analyze_patterns(archive: &[ArchivedCycle], min_sample: usize) -> Option<RelapsePatterns> {
    if archive.len() < min_sample.max(1) {
        return None;
    }

    Some(RelapsePatterns {
        top_reason: most_frequent(archive.iter().map(|c| c.relapse_reason)),
        top_day: most_frequent(archive.iter().map(|c| c.relapse_day_of_week)).map(|d| d.to_string()),
        top_missed: most_frequent(archive.iter().filter_map(|c| c.missed_standard.clone())),
        total_resets: archive.len(),
    })
}
