use clap::Subcommand;
use mazoezi_core::RelapseReason;

use super::{open_session, print_json, CliClock};

#[derive(Subcommand)]
pub enum CycleAction {
    /// Archive the current cycle and restart it today
    Reset {
        /// schedule, travel, fatigue, motivation, illness or other
        #[arg(long, default_value = "other")]
        reason: RelapseReason,
    },
    /// List archived cycles, newest first
    Archive {
        /// Show at most this many entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Grant freeze tokens
    Freeze {
        #[arg(default_value_t = 1)]
        count: u32,
    },
}

pub fn run(action: CycleAction, clock: CliClock) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = open_session(clock)?;
    match action {
        CycleAction::Reset { reason } => {
            let archived = session.reset_cycle(reason)?;
            print_json(&archived)?;
        }
        CycleAction::Archive { limit } => {
            let archive = session.archive();
            let shown = &archive[..limit.unwrap_or(archive.len()).min(archive.len())];
            print_json(shown)?;
        }
        CycleAction::Freeze { count } => {
            let event = session.grant_freeze_tokens(count)?;
            print_json(&event)?;
        }
    }
    Ok(())
}
