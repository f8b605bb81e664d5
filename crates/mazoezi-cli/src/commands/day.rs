use chrono::NaiveDate;
use clap::Subcommand;
use mazoezi_core::{RelapseReason, StandardValue};

use super::{open_session, print_json, CliClock};

/// Parse `true`/`false` or a number.
fn parse_value(raw: &str) -> Result<StandardValue, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "done" => Ok(StandardValue::Flag(true)),
        "false" | "no" => Ok(StandardValue::Flag(false)),
        other => other
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(StandardValue::Amount)
            .ok_or_else(|| format!("expected true, false or a number, got '{raw}'")),
    }
}

#[derive(Subcommand)]
pub enum DayAction {
    /// Show a day's record and evaluation
    Show {
        /// Date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Record a value for one of today's standards
    Set {
        /// Standard id
        id: String,
        /// `true`, `false` or an amount
        #[arg(value_parser = parse_value)]
        value: StandardValue,
        /// Reason recorded if this edit resets the cycle
        #[arg(long, default_value = "other")]
        reason: RelapseReason,
    },
    /// Flip one of today's standards
    Toggle {
        id: String,
        #[arg(long, default_value = "other")]
        reason: RelapseReason,
    },
    /// Judge a day (streak, XP, freeze or reset)
    Process {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "other")]
        reason: RelapseReason,
    },
}

pub fn run(action: DayAction, clock: CliClock) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = open_session(clock)?;
    match action {
        DayAction::Show { date } => {
            let date = date.unwrap_or_else(|| session.today());
            let record = session.day_record(date)?;
            let evaluation = session.evaluate_day(date)?;
            print_json(&serde_json::json!({
                "date": date,
                "record": record,
                "evaluation": evaluation,
            }))?;
        }
        DayAction::Set { id, value, mut reason } => {
            let outcome = session.set_value(&id, value, &mut reason)?;
            print_json(&outcome)?;
        }
        DayAction::Toggle { id, mut reason } => {
            let outcome = session.toggle(&id, &mut reason)?;
            print_json(&outcome)?;
        }
        DayAction::Process { date, mut reason } => {
            let date = date.unwrap_or_else(|| session.today());
            let outcome = session.process_day(date, &mut reason)?;
            print_json(&outcome)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_parse_as_flags_or_amounts() {
        assert_eq!(parse_value("true").unwrap(), StandardValue::Flag(true));
        assert_eq!(parse_value("No").unwrap(), StandardValue::Flag(false));
        assert_eq!(parse_value("2.5").unwrap(), StandardValue::Amount(2.5));
        assert!(parse_value("lots").is_err());
        assert!(parse_value("inf").is_err());
    }
}
