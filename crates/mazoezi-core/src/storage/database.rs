//! SQLite-backed store.
//!
//! Provides persistent storage for:
//! - The profile document (JSON in the key-value table)
//! - Raw day records
//! - Completion and XP histories
//! - The archive of reset cycles

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;

use super::{data_dir, merge_json, CycleStore, DayStore, HistoryStore, ProfileStore, Store};
use crate::completion::{CompletionHistory, DayRecord};
use crate::error::{DatabaseError, Result};
use crate::progression::{Profile, ProfilePatch, XpHistory};
use crate::relapse::ArchivedCycle;
use crate::snapshot::Snapshot;

const PROFILE_KEY: &str = "profile";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite database holding one profile's progression state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/mazoezi.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(data_dir()?.join("mazoezi.db"))
    }

    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        tracing::debug!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Open an in-memory database (tests and throwaway sessions).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        super::migrations::migrate(&self.conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        kv_get(&self.conn, key)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        kv_set(&self.conn, key, value)
    }
}

fn kv_get(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
        row.get::<_, String>(0)
    })
    .optional()
}

fn kv_set(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a stored date column; rows with unreadable dates are skipped.
fn parse_date(raw: &str, table: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(d) => Some(d),
        Err(e) => {
            tracing::warn!(table, date = raw, error = %e, "skipping row with unreadable date");
            None
        }
    }
}

fn profile_document(conn: &Connection) -> Result<serde_json::Value> {
    match kv_get(conn, PROFILE_KEY)? {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| {
            DatabaseError::CorruptRecord {
                key: PROFILE_KEY.to_string(),
                message: e.to_string(),
            }
            .into()
        }),
        None => Ok(serde_json::Value::Object(serde_json::Map::new())),
    }
}

fn merge_profile_into(conn: &Connection, patch: &ProfilePatch) -> Result<()> {
    let mut doc = profile_document(conn)?;
    merge_json(&mut doc, &serde_json::to_value(patch)?);
    kv_set(conn, PROFILE_KEY, &serde_json::to_string(&doc)?)?;
    Ok(())
}

fn write_day(conn: &Connection, date: NaiveDate, record: &DayRecord) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO days (date, record) VALUES (?1, ?2)",
        params![date_key(date), serde_json::to_string(record)?],
    )?;
    Ok(())
}

fn write_completion(conn: &Connection, date: NaiveDate, fraction: f64) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO completion (date, fraction) VALUES (?1, ?2)",
        params![date_key(date), fraction],
    )?;
    Ok(())
}

fn write_cycle(conn: &Connection, cycle: &ArchivedCycle) -> Result<()> {
    conn.execute(
        "INSERT INTO archived_cycles (id, archived_at, body) VALUES (?1, ?2, ?3)",
        params![
            cycle.id,
            cycle.archived_at.to_rfc3339(),
            serde_json::to_string(cycle)?
        ],
    )?;
    Ok(())
}

impl ProfileStore for Database {
    fn profile(&self) -> Result<Profile> {
        let doc = profile_document(&self.conn)?;
        serde_json::from_value(doc).map_err(|e| {
            DatabaseError::CorruptRecord {
                key: PROFILE_KEY.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    fn merge_profile(&mut self, patch: &ProfilePatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        merge_profile_into(&self.conn, patch)
    }
}

impl DayStore for Database {
    fn day(&self, date: NaiveDate) -> Result<DayRecord> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT record FROM days WHERE date = ?1",
                params![date_key(date)],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(raw) => Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(%date, error = %e, "unreadable day record, treating as empty");
                DayRecord::default()
            })),
            None => Ok(DayRecord::default()),
        }
    }

    fn set_day(&mut self, date: NaiveDate, record: &DayRecord) -> Result<()> {
        write_day(&self.conn, date, record)
    }

    fn days(&self) -> Result<BTreeMap<NaiveDate, DayRecord>> {
        let mut stmt = self.conn.prepare("SELECT date, record FROM days ORDER BY date")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut days = BTreeMap::new();
        for row in rows {
            let (raw_date, raw_record) = row?;
            let Some(date) = parse_date(&raw_date, "days") else {
                continue;
            };
            match serde_json::from_str(&raw_record) {
                Ok(record) => {
                    days.insert(date, record);
                }
                Err(e) => tracing::warn!(%date, error = %e, "skipping unreadable day record"),
            }
        }
        Ok(days)
    }
}

impl HistoryStore for Database {
    fn completion_history(&self) -> Result<CompletionHistory> {
        let mut stmt = self.conn.prepare("SELECT date, fraction FROM completion")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?;

        let mut history = CompletionHistory::new();
        for row in rows {
            let (raw, fraction) = row?;
            if let Some(date) = parse_date(&raw, "completion") {
                history.insert(date, fraction);
            }
        }
        Ok(history)
    }

    fn set_completion(&mut self, date: NaiveDate, fraction: f64) -> Result<()> {
        write_completion(&self.conn, date, fraction)
    }

    fn xp_history(&self) -> Result<XpHistory> {
        let mut stmt = self.conn.prepare("SELECT date, xp FROM xp_history")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

        let mut history = XpHistory::new();
        for row in rows {
            let (raw, xp) = row?;
            if let Some(date) = parse_date(&raw, "xp_history") {
                history.insert(date, u64::try_from(xp).unwrap_or(0));
            }
        }
        Ok(history)
    }

    fn add_xp(&mut self, date: NaiveDate, xp: u64) -> Result<()> {
        let xp = i64::try_from(xp).unwrap_or(i64::MAX);
        self.conn.execute(
            "INSERT INTO xp_history (date, xp) VALUES (?1, ?2)
             ON CONFLICT(date) DO UPDATE SET xp = xp + excluded.xp",
            params![date_key(date), xp],
        )?;
        Ok(())
    }
}

impl CycleStore for Database {
    fn cycles(&self) -> Result<Vec<ArchivedCycle>> {
        let mut stmt = self
            .conn
            .prepare("SELECT seq, body FROM archived_cycles ORDER BY seq DESC")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;

        let mut cycles = Vec::new();
        for row in rows {
            let (seq, body) = row?;
            match serde_json::from_str(&body) {
                Ok(cycle) => cycles.push(cycle),
                Err(e) => tracing::warn!(seq, error = %e, "skipping unreadable archived cycle"),
            }
        }
        Ok(cycles)
    }

    fn append_cycle(&mut self, cycle: &ArchivedCycle) -> Result<()> {
        write_cycle(&self.conn, cycle)
    }
}

impl Store for Database {
    fn import_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        let tx = self.conn.transaction()?;

        merge_profile_into(&tx, &ProfilePatch::full(&snapshot.profile))?;

        tx.execute("DELETE FROM completion", [])?;
        for (date, fraction) in &snapshot.completion_history {
            write_completion(&tx, *date, *fraction)?;
        }

        tx.execute("DELETE FROM xp_history", [])?;
        for (date, xp) in &snapshot.xp_history {
            tx.execute(
                "INSERT INTO xp_history (date, xp) VALUES (?1, ?2)",
                params![date_key(*date), i64::try_from(*xp).unwrap_or(i64::MAX)],
            )?;
        }

        // archive arrives newest first; insert oldest first so seq order matches
        tx.execute("DELETE FROM archived_cycles", [])?;
        for cycle in snapshot.archived_cycles.iter().rev() {
            write_cycle(&tx, cycle)?;
        }

        for (date, record) in &snapshot.today_data {
            write_day(&tx, *date, record)?;
        }

        tx.commit()?;
        tracing::info!(
            days = snapshot.today_data.len(),
            cycles = snapshot.archived_cycles.len(),
            "backup imported"
        );
        Ok(())
    }
}
