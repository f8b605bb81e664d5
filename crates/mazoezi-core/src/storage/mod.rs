pub mod config;
pub mod database;
pub mod memory;
pub mod migrations;

pub use config::Config;
pub use database::Database;
pub use memory::MemoryStore;

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::completion::{CompletionHistory, DayRecord};
use crate::error::{ConfigError, Result};
use crate::progression::{Profile, ProfilePatch, XpHistory};
use crate::relapse::ArchivedCycle;
use crate::snapshot::Snapshot;

/// Returns the data directory, creating it if needed.
///
/// `MAZOEZI_DATA_DIR` wins when set; otherwise `~/.config/mazoezi[-dev]/`
/// depending on `MAZOEZI_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("MAZOEZI_DATA_DIR") {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("MAZOEZI_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("mazoezi-dev")
            } else {
                base_dir.join("mazoezi")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}

/// Shallow merge: every top-level key of `patch` replaces the one in `target`.
/// Keys absent from the patch are kept, including ones this crate does not know.
pub fn merge_json(target: &mut serde_json::Value, patch: &serde_json::Value) {
    let Some(patch) = patch.as_object() else {
        return;
    };
    if !target.is_object() {
        *target = serde_json::Value::Object(serde_json::Map::new());
    }
    if let Some(obj) = target.as_object_mut() {
        for (key, value) in patch {
            obj.insert(key.clone(), value.clone());
        }
    }
}

/// The single profile document.
pub trait ProfileStore {
    /// Stored profile, or the default profile when none exists.
    fn profile(&self) -> Result<Profile>;

    /// Shallow-merge `patch` into the stored document.
    fn merge_profile(&mut self, patch: &ProfilePatch) -> Result<()>;
}

/// Raw day records keyed by date.
pub trait DayStore {
    /// Record for `date`; empty when never written.
    fn day(&self, date: NaiveDate) -> Result<DayRecord>;

    fn set_day(&mut self, date: NaiveDate, record: &DayRecord) -> Result<()>;

    fn days(&self) -> Result<BTreeMap<NaiveDate, DayRecord>>;
}

/// Completion and XP histories.
pub trait HistoryStore {
    fn completion_history(&self) -> Result<CompletionHistory>;

    /// Overwrite the fraction recorded for `date`.
    fn set_completion(&mut self, date: NaiveDate, fraction: f64) -> Result<()>;

    fn xp_history(&self) -> Result<XpHistory>;

    /// Add `xp` to whatever `date` already earned.
    fn add_xp(&mut self, date: NaiveDate, xp: u64) -> Result<()>;
}

/// Append-only archive of reset cycles.
pub trait CycleStore {
    /// Archived cycles, newest first.
    fn cycles(&self) -> Result<Vec<ArchivedCycle>>;

    fn append_cycle(&mut self, cycle: &ArchivedCycle) -> Result<()>;
}

/// Everything the session persists.
pub trait Store: ProfileStore + DayStore + HistoryStore + CycleStore {
    /// Apply a validated backup.
    ///
    /// The profile is merged, both histories and the archive are replaced,
    /// and each day record in the backup overwrites its date.
    fn import_snapshot(&mut self, snapshot: &Snapshot) -> Result<()>;
}

impl<S: ProfileStore + ?Sized> ProfileStore for &mut S {
    fn profile(&self) -> Result<Profile> {
        (**self).profile()
    }
    fn merge_profile(&mut self, patch: &ProfilePatch) -> Result<()> {
        (**self).merge_profile(patch)
    }
}

impl<S: DayStore + ?Sized> DayStore for &mut S {
    fn day(&self, date: NaiveDate) -> Result<DayRecord> {
        (**self).day(date)
    }
    fn set_day(&mut self, date: NaiveDate, record: &DayRecord) -> Result<()> {
        (**self).set_day(date, record)
    }
    fn days(&self) -> Result<BTreeMap<NaiveDate, DayRecord>> {
        (**self).days()
    }
}

impl<S: HistoryStore + ?Sized> HistoryStore for &mut S {
    fn completion_history(&self) -> Result<CompletionHistory> {
        (**self).completion_history()
    }
    fn set_completion(&mut self, date: NaiveDate, fraction: f64) -> Result<()> {
        (**self).set_completion(date, fraction)
    }
    fn xp_history(&self) -> Result<XpHistory> {
        (**self).xp_history()
    }
    fn add_xp(&mut self, date: NaiveDate, xp: u64) -> Result<()> {
        (**self).add_xp(date, xp)
    }
}

impl<S: CycleStore + ?Sized> CycleStore for &mut S {
    fn cycles(&self) -> Result<Vec<ArchivedCycle>> {
        (**self).cycles()
    }
    fn append_cycle(&mut self, cycle: &ArchivedCycle) -> Result<()> {
        (**self).append_cycle(cycle)
    }
}

impl<S: Store + ?Sized> Store for &mut S {
    fn import_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        (**self).import_snapshot(snapshot)
    }
}
