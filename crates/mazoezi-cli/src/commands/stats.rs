use clap::Subcommand;
use mazoezi_core::analytics;

use super::{open_session, print_json, CliClock};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Discipline score with its factor breakdown
    Score,
    /// Momentum over the trailing window
    Momentum,
    /// Recurring reset factors (needs a few resets)
    Patterns,
    /// Level, XP and streaks
    Progress,
    /// Year heatmap of completion levels
    Heatmap,
    /// Completion percentage for recent days
    Completion {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Cumulative XP growth
    Xp,
    /// Monthly review summary
    Review,
}

pub fn run(action: StatsAction, clock: CliClock) -> Result<(), Box<dyn std::error::Error>> {
    let session = open_session(clock)?;
    let today = session.today();

    match action {
        StatsAction::Score => print_json(&session.discipline_score())?,
        StatsAction::Momentum => print_json(&session.momentum())?,
        StatsAction::Patterns => match session.patterns() {
            Some(patterns) => print_json(&serde_json::json!({
                "patterns": patterns,
                "insights": patterns.insights(),
            }))?,
            None => print_json(&serde_json::json!({
                "patterns": null,
                "totalResets": session.archive().len(),
                "minSample": session.config().relapse.min_sample,
            }))?,
        },
        StatsAction::Progress => {
            let profile = session.profile();
            print_json(&serde_json::json!({
                "level": session.progress(),
                "currentStreak": profile.current_streak,
                "longestStreak": profile.longest_streak,
                "freezeTokens": profile.freeze_tokens,
                "cycleDay": session.cycle_day(),
            }))?;
        }
        StatsAction::Heatmap => {
            print_json(&analytics::heatmap(session.completion_history(), today))?;
        }
        StatsAction::Completion { days } => {
            print_json(&analytics::completion_series(session.completion_history(), today, days))?;
        }
        StatsAction::Xp => print_json(&analytics::xp_growth(session.xp_history()))?,
        StatsAction::Review => {
            let review = analytics::monthly_review(
                session.profile(),
                session.completion_history(),
                session.archive().len(),
                today,
                &session.config().score,
            );
            print_json(&review)?;
        }
    }
    Ok(())
}
