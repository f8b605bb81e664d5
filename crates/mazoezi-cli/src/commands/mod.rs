pub mod challenge;
pub mod config;
pub mod cycle;
pub mod data;
pub mod day;
pub mod stats;

use chrono::NaiveDateTime;
use mazoezi_core::{Clock, Config, Database, FixedClock, Session, SystemClock};
use serde::Serialize;

/// Wall clock, or a pinned instant from `--at`.
#[derive(Debug, Clone, Copy)]
pub enum CliClock {
    System(SystemClock),
    Fixed(FixedClock),
}

impl CliClock {
    pub fn new(at: Option<NaiveDateTime>) -> Self {
        match at {
            Some(at) => CliClock::Fixed(FixedClock(at)),
            None => CliClock::System(SystemClock),
        }
    }
}

impl Clock for CliClock {
    fn now(&self) -> NaiveDateTime {
        match self {
            CliClock::System(c) => c.now(),
            CliClock::Fixed(c) => c.now(),
        }
    }
}

pub type CliSession = Session<Database, CliClock>;

/// Open the on-disk database with the user's configuration.
pub fn open_session(clock: CliClock) -> Result<CliSession, Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let db = Database::open()?;
    Ok(Session::open(db, config, clock)?)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
