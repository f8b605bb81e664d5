use clap::Subcommand;
use mazoezi_core::{Clock, Database, Snapshot};
use std::io::Read;
use std::path::PathBuf;

use super::{print_json, CliClock};

#[derive(Subcommand)]
pub enum DataAction {
    /// Write a full backup as JSON
    Export {
        /// Output file; prints to stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Restore a backup file ("-" reads stdin)
    Import {
        path: PathBuf,
    },
}

pub fn run(action: DataAction, clock: CliClock) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        DataAction::Export { output } => {
            let db = Database::open()?;
            let json = Snapshot::export(&db, clock.today())?.to_json_pretty()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    print_json(&serde_json::json!({ "exported": path }))?;
                }
                None => println!("{json}"),
            }
        }
        DataAction::Import { path } => {
            let json = if path.as_os_str() == "-" {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            } else {
                std::fs::read_to_string(&path)?
            };
            let mut db = Database::open()?;
            let snapshot = Snapshot::import(&mut db, &json, clock.today())?;
            print_json(&serde_json::json!({
                "imported": true,
                "days": snapshot.today_data.len(),
                "archivedCycles": snapshot.archived_cycles.len(),
            }))?;
        }
    }
    Ok(())
}
