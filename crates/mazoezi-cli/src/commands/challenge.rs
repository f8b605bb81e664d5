use clap::{Args, Subcommand, ValueEnum};
use mazoezi_core::catalog::{self, ChallengeCategory, GoalCategory};
use mazoezi_core::{ActiveChallenge, RelapseReason};

use super::{open_session, print_json, CliClock, CliSession};

#[derive(Clone, Copy, ValueEnum)]
pub enum CategoryArg {
    LongForm,
    Fitness,
    Nutrition,
    Mind,
}

impl From<CategoryArg> for ChallengeCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::LongForm => ChallengeCategory::LongForm,
            CategoryArg::Fitness => ChallengeCategory::Fitness,
            CategoryArg::Nutrition => ChallengeCategory::Nutrition,
            CategoryArg::Mind => ChallengeCategory::Mind,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum GoalCategoryArg {
    Movement,
    Hydration,
    Nutrition,
    Mind,
}

impl From<GoalCategoryArg> for GoalCategory {
    fn from(arg: GoalCategoryArg) -> Self {
        match arg {
            GoalCategoryArg::Movement => GoalCategory::Movement,
            GoalCategoryArg::Hydration => GoalCategory::Hydration,
            GoalCategoryArg::Nutrition => GoalCategory::Nutrition,
            GoalCategoryArg::Mind => GoalCategory::Mind,
        }
    }
}

#[derive(Subcommand)]
pub enum ChallengeAction {
    /// List challenge templates
    List {
        #[arg(long, value_enum)]
        category: Option<CategoryArg>,
    },
    /// Show a template and its resolved standards
    Show {
        /// Template id (e.g. "75hardcore")
        id: String,
    },
    /// List the goal library used by custom challenges
    Goals {
        #[arg(long, value_enum)]
        category: Option<GoalCategoryArg>,
    },
    /// Start a catalog challenge; the cycle begins today
    Start {
        id: String,
        #[command(flatten)]
        switch: SwitchArgs,
    },
    /// Start a custom challenge from library goal ids
    Custom {
        /// Cycle length in days
        #[arg(long, default_value_t = 30)]
        days: u32,
        /// Goal ids (see `challenge goals`)
        #[arg(required = true)]
        goals: Vec<String>,
        #[command(flatten)]
        switch: SwitchArgs,
    },
    /// Show the active challenge
    Current,
}

#[derive(Args)]
pub struct SwitchArgs {
    /// Archive a running challenge instead of refusing to start
    #[arg(long)]
    switch: bool,
    /// Reason recorded for the archived cycle (with --switch)
    #[arg(long, default_value = "other")]
    reason: RelapseReason,
}

fn begin(
    session: &mut CliSession,
    challenge: ActiveChallenge,
    args: SwitchArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let event = if args.switch {
        session.switch_challenge(challenge, args.reason)?
    } else {
        session.start_challenge(challenge)?
    };
    print_json(&event)
}

pub fn run(action: ChallengeAction, clock: CliClock) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ChallengeAction::List { category } => {
            let wanted = category.map(ChallengeCategory::from);
            let templates: Vec<_> = catalog::challenges()
                .iter()
                .filter(|t| wanted.map_or(true, |c| t.category == c))
                .collect();
            print_json(&templates)?;
        }
        ChallengeAction::Show { id } => {
            print_json(&ActiveChallenge::from_catalog(&id)?)?;
        }
        ChallengeAction::Goals { category } => {
            let goals: Vec<_> = match category {
                Some(c) => catalog::goals_by_category(c.into()).collect(),
                None => catalog::goals().iter().collect(),
            };
            print_json(&goals)?;
        }
        ChallengeAction::Start { id, switch } => {
            let challenge = ActiveChallenge::from_catalog(&id)?;
            begin(&mut open_session(clock)?, challenge, switch)?;
        }
        ChallengeAction::Custom { days, goals, switch } => {
            let challenge = ActiveChallenge::custom(days, &goals)?;
            begin(&mut open_session(clock)?, challenge, switch)?;
        }
        ChallengeAction::Current => {
            let session = open_session(clock)?;
            let challenge = session.active_challenge()?;
            print_json(&serde_json::json!({
                "challenge": challenge,
                "cycleDay": session.cycle_day(),
                "cycleStartDate": session.profile().cycle_start_date,
            }))?;
        }
    }
    Ok(())
}
