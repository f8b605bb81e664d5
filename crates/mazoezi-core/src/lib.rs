//! # Mazoezi Core Library
//!
//! This library provides the progression engine behind the Mazoezi daily
//! discipline tracker. A user commits to a challenge (a fixed set of daily
//! standards over N days); each day's raw inputs are evaluated, and the result
//! drives streaks, experience points, levels and prestige, a discipline score,
//! a rolling momentum state, and reset bookkeeping with pattern analysis.
//!
//! The `mazoezi` CLI binary is a thin front-end over the same library.
//!
//! ## Architecture
//!
//! - **Pure calculators**: [`completion`], [`progression`], [`discipline`],
//!   [`momentum`], [`relapse`] and [`analytics`] never touch storage.
//! - **Session**: [`Session`] is the explicit context that loads state from a
//!   [`Store`], applies transitions and persists them in a fixed order.
//! - **Storage**: SQLite [`Database`], in-process [`MemoryStore`] and the TOML
//!   [`Config`].
//!
//! ## Key Components
//!
//! - [`Ledger`]: streak, XP and level state machine
//! - [`Session`]: challenge lifecycle and day processing
//! - [`Snapshot`]: backup export/import
//! - [`Clock`]: source of local time, swappable for tests

pub mod analytics;
pub mod catalog;
pub mod completion;
pub mod discipline;
pub mod error;
pub mod events;
pub mod momentum;
pub mod progression;
pub mod protocol;
pub mod relapse;
pub mod session;
pub mod snapshot;
pub mod storage;

pub use catalog::{ActiveChallenge, ChallengeTemplate, Goal, Standard, StandardKind};
pub use completion::{evaluate, CompletionHistory, DayRecord, Evaluation, StandardValue};
pub use discipline::{DisciplineCalculator, DisciplineScore};
pub use error::{ConfigError, CoreError, DatabaseError, Result, SnapshotError, ValidationError};
pub use events::Event;
pub use momentum::{Momentum, MomentumState};
pub use progression::{Ledger, LevelProgress, Profile, ProfilePatch, Verdict, XpHistory};
pub use protocol::{Clock, FixedClock, SystemClock};
pub use relapse::{ArchivedCycle, RelapsePatterns, RelapsePrompt, RelapseReason, ResetContext};
pub use session::{DayOutcome, Session};
pub use snapshot::Snapshot;
pub use storage::{Config, Database, MemoryStore, Store};
