//! Backup export and import.
//!
//! The backup is a single JSON document:
//!
//! ```json
//! {
//!   "profile": { "totalXP": 0, "currentStreak": 0, ... },
//!   "todayData": { "2026-05-04": { "reading": 10, "_xpAwarded": true } },
//!   "completionHistory": { "2026-05-04": 1.0 },
//!   "xpHistory": { "2026-05-04": 292 },
//!   "archivedCycles": [ ... ]
//! }
//! ```
//!
//! A payload is validated in full before anything is written. `todayData` may
//! also be a single flat record (`{ "reading": 10, "_xpAwarded": true }`), which
//! is filed under the importing day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::completion::{CompletionHistory, DayRecord};
use crate::error::{Result, SnapshotError};
use crate::progression::{Profile, XpHistory};
use crate::relapse::ArchivedCycle;
use crate::storage::Store;

/// Keys every backup must carry. `todayData` is optional.
const REQUIRED_KEYS: [&str; 4] = ["profile", "completionHistory", "xpHistory", "archivedCycles"];

/// Either shape `todayData` takes in a backup file.
#[derive(Deserialize)]
#[serde(untagged)]
enum TodayData {
    ByDate(BTreeMap<NaiveDate, DayRecord>),
    Record(DayRecord),
}

impl TodayData {
    fn resolve(self, today: NaiveDate) -> BTreeMap<NaiveDate, DayRecord> {
        match self {
            TodayData::ByDate(days) => days,
            TodayData::Record(record) => BTreeMap::from([(today, record)]),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    profile: Profile,
    #[serde(default)]
    today_data: Option<TodayData>,
    completion_history: CompletionHistory,
    xp_history: XpHistory,
    archived_cycles: Vec<ArchivedCycle>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub profile: Profile,
    #[serde(default)]
    pub today_data: BTreeMap<NaiveDate, DayRecord>,
    pub completion_history: CompletionHistory,
    pub xp_history: XpHistory,
    /// Newest first.
    pub archived_cycles: Vec<ArchivedCycle>,
}

impl Snapshot {
    /// Snapshot of everything in `store`. Today's record is always present,
    /// even when nothing was logged yet.
    pub fn export<S: Store + ?Sized>(store: &S, today: NaiveDate) -> Result<Self> {
        let mut today_data = store.days()?;
        today_data.entry(today).or_default();
        Ok(Self {
            profile: store.profile()?,
            today_data,
            completion_history: store.completion_history()?,
            xp_history: store.xp_history()?,
            archived_cycles: store.cycles()?,
        })
    }

    /// Validate and decode a backup payload. A flat `todayData` record is
    /// dated `today`.
    ///
    /// # Errors
    /// Returns a [`SnapshotError`] for non-JSON input, a missing key, a value
    /// of the wrong shape, or a completion fraction or on-time rate outside
    /// `[0, 1]`.
    pub fn parse(json: &str, today: NaiveDate) -> Result<Self, SnapshotError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| SnapshotError::Invalid(e.to_string()))?;
        let Some(obj) = value.as_object() else {
            return Err(SnapshotError::Invalid("expected a JSON object".to_string()));
        };
        if let Some(missing) = REQUIRED_KEYS.into_iter().find(|k| !obj.contains_key(*k)) {
            return Err(SnapshotError::MissingKey(missing));
        }
        let raw: RawSnapshot =
            serde_json::from_value(value).map_err(|e| SnapshotError::Invalid(e.to_string()))?;

        if let Some((date, fraction)) = raw
            .completion_history
            .iter()
            .find(|(_, f)| !(0.0..=1.0).contains(*f))
        {
            return Err(SnapshotError::Invalid(format!(
                "completion for {date} is {fraction}, expected 0..=1"
            )));
        }
        if let Some(rate) = raw.profile.on_time_rate.filter(|r| !(0.0..=1.0).contains(r)) {
            return Err(SnapshotError::Invalid(format!(
                "onTimeRate is {rate}, expected 0..=1"
            )));
        }

        Ok(Self {
            profile: raw.profile,
            today_data: raw.today_data.map(|t| t.resolve(today)).unwrap_or_default(),
            completion_history: raw.completion_history,
            xp_history: raw.xp_history,
            archived_cycles: raw.archived_cycles,
        })
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse `json` and apply it to `store`. Nothing is written on error.
    pub fn import<S: Store + ?Sized>(store: &mut S, json: &str, today: NaiveDate) -> Result<Self> {
        let snapshot = Self::parse(json, today)?;
        store.import_snapshot(&snapshot)?;
        Ok(snapshot)
    }
}
