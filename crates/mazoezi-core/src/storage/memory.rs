//! In-process store for tests and embedding.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::{merge_json, CycleStore, DayStore, HistoryStore, ProfileStore, Store};
use crate::completion::{CompletionHistory, DayRecord};
use crate::error::{DatabaseError, Result};
use crate::progression::{Profile, ProfilePatch, XpHistory};
use crate::relapse::ArchivedCycle;
use crate::snapshot::Snapshot;

/// Store that keeps everything in memory. The profile is held as a JSON
/// document so merges behave exactly like the SQLite store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    profile: serde_json::Value,
    days: BTreeMap<NaiveDate, DayRecord>,
    completion: CompletionHistory,
    xp: XpHistory,
    /// Newest first.
    cycles: Vec<ArchivedCycle>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `profile`.
    pub fn with_profile(profile: &Profile) -> Result<Self> {
        let mut store = Self::new();
        store.merge_profile(&ProfilePatch::full(profile))?;
        Ok(store)
    }
}

impl ProfileStore for MemoryStore {
    fn profile(&self) -> Result<Profile> {
        if self.profile.is_null() {
            return Ok(Profile::default());
        }
        serde_json::from_value(self.profile.clone()).map_err(|e| {
            DatabaseError::CorruptRecord {
                key: "profile".to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    fn merge_profile(&mut self, patch: &ProfilePatch) -> Result<()> {
        merge_json(&mut self.profile, &serde_json::to_value(patch)?);
        Ok(())
    }
}

impl DayStore for MemoryStore {
    fn day(&self, date: NaiveDate) -> Result<DayRecord> {
        Ok(self.days.get(&date).cloned().unwrap_or_default())
    }

    fn set_day(&mut self, date: NaiveDate, record: &DayRecord) -> Result<()> {
        self.days.insert(date, record.clone());
        Ok(())
    }

    fn days(&self) -> Result<BTreeMap<NaiveDate, DayRecord>> {
        Ok(self.days.clone())
    }
}

impl HistoryStore for MemoryStore {
    fn completion_history(&self) -> Result<CompletionHistory> {
        Ok(self.completion.clone())
    }

    fn set_completion(&mut self, date: NaiveDate, fraction: f64) -> Result<()> {
        self.completion.insert(date, fraction);
        Ok(())
    }

    fn xp_history(&self) -> Result<XpHistory> {
        Ok(self.xp.clone())
    }

    fn add_xp(&mut self, date: NaiveDate, xp: u64) -> Result<()> {
        let entry = self.xp.entry(date).or_insert(0);
        *entry = entry.saturating_add(xp);
        Ok(())
    }
}

impl CycleStore for MemoryStore {
    fn cycles(&self) -> Result<Vec<ArchivedCycle>> {
        Ok(self.cycles.clone())
    }

    fn append_cycle(&mut self, cycle: &ArchivedCycle) -> Result<()> {
        self.cycles.insert(0, cycle.clone());
        Ok(())
    }
}

impl Store for MemoryStore {
    fn import_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        // stage on a copy so a failure leaves the store untouched
        let mut next = self.clone();
        next.merge_profile(&ProfilePatch::full(&snapshot.profile))?;
        next.completion = snapshot.completion_history.clone();
        next.xp = snapshot.xp_history.clone();
        next.cycles = snapshot.archived_cycles.clone();
        for (date, record) in &snapshot.today_data {
            next.days.insert(*date, record.clone());
        }
        *self = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relapse::RelapseReason;

    #[test]
    fn append_keeps_newest_first() {
        let mut store = MemoryStore::new();
        let at = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
        store
            .append_cycle(&ArchivedCycle::new(None, 1, RelapseReason::Travel, None, at))
            .unwrap();
        store
            .append_cycle(&ArchivedCycle::new(None, 2, RelapseReason::Fatigue, None, at))
            .unwrap();
        let cycles = store.cycles().unwrap();
        assert_eq!(cycles[0].relapse_reason, RelapseReason::Fatigue);
        assert_eq!(cycles[1].relapse_reason, RelapseReason::Travel);
    }

    #[test]
    fn seeded_profile_reads_back() {
        let profile = Profile {
            total_xp: 1_500,
            freeze_tokens: 2,
            ..Profile::default()
        };
        let store = MemoryStore::with_profile(&profile).unwrap();
        assert_eq!(store.profile().unwrap(), profile);
    }
}
