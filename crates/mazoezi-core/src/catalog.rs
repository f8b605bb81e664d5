//! Standardized goal library and challenge templates.
//!
//! There are no free-form goals: challenges reference goals by id, and a
//! started challenge takes an owned snapshot of its standards so later catalog
//! changes never alter a cycle already in progress.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

/// How a standard is judged complete.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StandardKind {
    /// Done only when the recorded value is exactly `true`.
    Boolean,
    /// Done when the recorded amount reaches `target`.
    #[serde(alias = "number")]
    Numeric { target: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalCategory {
    Movement,
    Hydration,
    Nutrition,
    Mind,
}

impl GoalCategory {
    pub const ALL: [GoalCategory; 4] = [
        GoalCategory::Movement,
        GoalCategory::Hydration,
        GoalCategory::Nutrition,
        GoalCategory::Mind,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChallengeCategory {
    LongForm,
    Fitness,
    Nutrition,
    Mind,
    Custom,
}

impl ChallengeCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ChallengeCategory::LongForm => "Long-Form Structural",
            ChallengeCategory::Fitness => "Standard Fitness",
            ChallengeCategory::Nutrition => "Nutrition & Hydration",
            ChallengeCategory::Mind => "Mind & Recovery",
            ChallengeCategory::Custom => "Custom",
        }
    }
}

/// A daily goal as frozen into an active challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standard {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: StandardKind,
    #[serde(default)]
    pub unit: String,
    pub category: GoalCategory,
    #[serde(default)]
    pub icon: String,
}

impl Standard {
    /// Amount that completes a numeric standard; `None` for boolean ones.
    pub fn target(&self) -> Option<f64> {
        match self.kind {
            StandardKind::Numeric { target } => Some(target),
            StandardKind::Boolean => None,
        }
    }
}

/// Static goal definition in the library.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Goal {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(flatten)]
    pub kind: StandardKind,
    pub unit: &'static str,
    pub icon: &'static str,
    pub category: GoalCategory,
}

impl Goal {
    pub fn to_standard(&self) -> Standard {
        Standard {
            id: self.id.to_string(),
            name: self.name.to_string(),
            kind: self.kind,
            unit: self.unit.to_string(),
            category: self.category,
            icon: self.icon.to_string(),
        }
    }
}

/// Static challenge template.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub duration_days: u32,
    pub category: ChallengeCategory,
    pub goal_ids: &'static [&'static str],
    pub terms: &'static str,
}

const fn numeric(
    id: &'static str,
    name: &'static str,
    target: f64,
    unit: &'static str,
    icon: &'static str,
    category: GoalCategory,
) -> Goal {
    Goal {
        id,
        name,
        kind: StandardKind::Numeric { target },
        unit,
        icon,
        category,
    }
}

const fn boolean(
    id: &'static str,
    name: &'static str,
    unit: &'static str,
    icon: &'static str,
    category: GoalCategory,
) -> Goal {
    Goal {
        id,
        name,
        kind: StandardKind::Boolean,
        unit,
        icon,
        category,
    }
}

use GoalCategory::{Hydration, Mind, Movement, Nutrition};

static GOAL_LIBRARY: &[Goal] = &[
    numeric("steps8k", "8,000 Steps", 8000.0, "steps", "fa-shoe-prints", Movement),
    numeric("steps10k", "10,000 Steps", 10000.0, "steps", "fa-shoe-prints", Movement),
    numeric("stepsProgressive", "Progressive Steps", 10000.0, "steps", "fa-shoe-prints", Movement),
    numeric("strengthTraining", "Strength Training", 1.0, "session", "fa-dumbbell", Movement),
    numeric("cardio", "Cardio Block", 1.0, "session", "fa-heart-pulse", Movement),
    numeric("workout", "Structured Workout", 1.0, "session", "fa-dumbbell", Movement),
    numeric("plank", "Plank", 1.0, "session", "fa-stopwatch", Movement),
    numeric("squat", "Squat Challenge", 1.0, "session", "fa-person-walking", Movement),
    numeric("pushup", "Push-Up Challenge", 1.0, "session", "fa-hand-fist", Movement),
    numeric("hiit", "HIIT or Cardio", 1.0, "session", "fa-fire-flame-curved", Movement),
    numeric("movement30", "30-Minute Movement", 30.0, "min", "fa-person-walking", Movement),
    numeric("c25k", "Couch to 5K", 1.0, "session", "fa-road", Movement),
    numeric("water2l", "2L Water", 2.0, "L", "fa-droplet", Hydration),
    numeric("water3l", "3L Water", 3.0, "L", "fa-droplet", Hydration),
    numeric("hydrationHabit", "Hydration Habit", 2.0, "L", "fa-droplet", Hydration),
    numeric("protein", "Protein Target", 2.0, "servings", "fa-egg", Nutrition),
    boolean("balancedDiet", "Balanced Diet Block", "day", "fa-bowl-food", Nutrition),
    numeric("highProtein", "High Protein Meals", 2.0, "meals", "fa-egg", Nutrition),
    boolean("keto", "Keto Nutrition Standard", "day", "fa-leaf", Nutrition),
    boolean("wholeFoods", "Whole Foods Nutrition", "day", "fa-apple-whole", Nutrition),
    boolean("plantBased", "Plant-Based Nutrition", "day", "fa-leaf", Nutrition),
    boolean("noFastFood", "No Fast Food", "", "fa-utensils", Nutrition),
    boolean("intermittentFasting", "Intermittent Fasting Block", "day", "fa-clock", Nutrition),
    numeric("reading", "Daily Reading", 10.0, "min", "fa-book", Mind),
    numeric("meditation", "Mindfulness Meditation", 10.0, "min", "fa-spa", Mind),
    numeric("sleep", "Sleep Standard", 7.0, "hrs", "fa-moon", Mind),
    numeric("mobility", "Mobility & Stretch", 1.0, "session", "fa-person-running", Mind),
    numeric("sleepQuality", "Sleep Quality Block", 7.0, "hrs", "fa-moon", Mind),
];

const LONG_FORM_TERMS: &str = "All standards daily. 3-hour grace. 1 freeze token per 30 days.";
const DAILY_TERMS: &str = "Complete daily. 3-hour grace.";
const COMPLY_TERMS: &str = "Comply daily. 3-hour grace.";
const CUSTOM_TERMS: &str =
    "All standards daily. 3-hour grace. 1 freeze token per 30 days. No editing mid-cycle.";

const fn template(
    id: &'static str,
    name: &'static str,
    duration_days: u32,
    category: ChallengeCategory,
    goal_ids: &'static [&'static str],
    terms: &'static str,
) -> ChallengeTemplate {
    ChallengeTemplate {
        id,
        name,
        duration_days,
        category,
        goal_ids,
        terms,
    }
}

static CHALLENGES: &[ChallengeTemplate] = &[
    template(
        "75hardcore",
        "75-Day Hardcore Protocol",
        75,
        ChallengeCategory::LongForm,
        &["steps10k", "water3l", "workout", "protein", "reading", "noFastFood", "sleep"],
        LONG_FORM_TERMS,
    ),
    template(
        "75balanced",
        "75-Day Balanced Protocol",
        75,
        ChallengeCategory::LongForm,
        &["steps10k", "water3l", "workout", "balancedDiet", "reading", "sleep"],
        LONG_FORM_TERMS,
    ),
    template(
        "66habit",
        "66-Day Habit Reset Protocol",
        66,
        ChallengeCategory::LongForm,
        &["steps10k", "water3l", "workout", "protein", "reading", "sleep"],
        LONG_FORM_TERMS,
    ),
    template("steps10k", "10,000 Steps Daily", 30, ChallengeCategory::Fitness, &["steps10k"], DAILY_TERMS),
    template("plank", "Plank Challenge", 30, ChallengeCategory::Fitness, &["plank"], DAILY_TERMS),
    template("squat", "Squat Challenge", 30, ChallengeCategory::Fitness, &["squat"], DAILY_TERMS),
    template("pushup", "Push-Up Challenge", 30, ChallengeCategory::Fitness, &["pushup"], DAILY_TERMS),
    template("hiit", "HIIT or Cardio Challenge", 30, ChallengeCategory::Fitness, &["hiit"], DAILY_TERMS),
    template(
        "movement30",
        "30-Minute Daily Movement",
        30,
        ChallengeCategory::Fitness,
        &["movement30"],
        DAILY_TERMS,
    ),
    template(
        "c25k",
        "Couch to 5K",
        42,
        ChallengeCategory::Fitness,
        &["c25k"],
        "Follow program sessions. 3-hour grace.",
    ),
    template(
        "water",
        "Daily Water Intake Target",
        30,
        ChallengeCategory::Nutrition,
        &["water3l"],
        "Meet target daily. 3-hour grace.",
    ),
    template(
        "wholeFoods",
        "Whole Foods Nutrition Block",
        30,
        ChallengeCategory::Nutrition,
        &["wholeFoods"],
        COMPLY_TERMS,
    ),
    template(
        "plantBased",
        "Plant-Based Nutrition Block",
        30,
        ChallengeCategory::Nutrition,
        &["plantBased"],
        COMPLY_TERMS,
    ),
    template("keto", "Keto Style Nutrition Block", 30, ChallengeCategory::Nutrition, &["keto"], COMPLY_TERMS),
    template(
        "intermittentFasting",
        "Intermittent Fasting Block",
        30,
        ChallengeCategory::Nutrition,
        &["intermittentFasting"],
        "Complete fasting window daily. 3-hour grace.",
    ),
    template(
        "meditation",
        "Daily Mindfulness Meditation",
        30,
        ChallengeCategory::Mind,
        &["meditation"],
        DAILY_TERMS,
    ),
    template(
        "mobility",
        "Mobility & Stretch Routine",
        30,
        ChallengeCategory::Mind,
        &["mobility"],
        DAILY_TERMS,
    ),
    template(
        "sleepQuality",
        "Sleep Quality Block",
        30,
        ChallengeCategory::Mind,
        &["sleepQuality"],
        "Meet sleep target daily. 3-hour grace.",
    ),
];

pub fn goals() -> &'static [Goal] {
    GOAL_LIBRARY
}

pub fn goal_by_id(id: &str) -> Option<&'static Goal> {
    GOAL_LIBRARY.iter().find(|g| g.id == id)
}

pub fn goals_by_category(category: GoalCategory) -> impl Iterator<Item = &'static Goal> {
    GOAL_LIBRARY.iter().filter(move |g| g.category == category)
}

pub fn challenges() -> &'static [ChallengeTemplate] {
    CHALLENGES
}

pub fn challenge_by_id(id: &str) -> Option<&'static ChallengeTemplate> {
    CHALLENGES.iter().find(|c| c.id == id)
}

/// Resolve a template's goal ids into owned standards, skipping unknown ids.
pub fn standards_for(template: &ChallengeTemplate) -> Vec<Standard> {
    resolve_goals(template.goal_ids.iter().copied())
}

fn resolve_goals<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<Standard> {
    ids.into_iter()
        .filter_map(goal_by_id)
        .map(Goal::to_standard)
        .collect()
}

/// The challenge a profile is currently committed to.
///
/// `standards` is a snapshot taken at start and never edited mid-cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveChallenge {
    pub id: String,
    pub name: String,
    #[serde(alias = "duration")]
    pub duration_days: u32,
    pub standards: Vec<Standard>,
    #[serde(default)]
    pub goal_ids: Vec<String>,
    #[serde(default, alias = "terms")]
    pub terms_text: String,
}

impl ActiveChallenge {
    pub fn from_template(template: &ChallengeTemplate) -> Self {
        Self {
            id: template.id.to_string(),
            name: template.name.to_string(),
            duration_days: template.duration_days,
            standards: standards_for(template),
            goal_ids: template.goal_ids.iter().map(|s| s.to_string()).collect(),
            terms_text: template.terms.to_string(),
        }
    }

    /// Look up a template by id and snapshot it.
    ///
    /// # Errors
    /// Returns a validation error if the id is not in the catalog.
    pub fn from_catalog(id: &str) -> Result<Self> {
        challenge_by_id(id)
            .map(Self::from_template)
            .ok_or_else(|| ValidationError::UnknownChallenge(id.to_string()).into())
    }

    /// Build a custom challenge from hand-picked library goals.
    ///
    /// # Errors
    /// Returns a validation error if the duration is zero or none of the ids
    /// name a library goal.
    pub fn custom(duration_days: u32, goal_ids: &[String]) -> Result<Self> {
        if duration_days == 0 {
            return Err(ValidationError::InvalidValue {
                field: "duration".into(),
                message: "must be at least one day".into(),
            }
            .into());
        }
        let standards = resolve_goals(goal_ids.iter().map(String::as_str));
        if standards.is_empty() {
            return Err(ValidationError::EmptyCollection("custom challenge goals".into()).into());
        }
        Ok(Self {
            id: "custom".into(),
            name: format!("Custom ({duration_days} days)"),
            duration_days,
            goal_ids: standards.iter().map(|s| s.id.clone()).collect(),
            standards,
            terms_text: CUSTOM_TERMS.into(),
        })
    }

    pub fn standard(&self, id: &str) -> Option<&Standard> {
        self.standards.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn library_ids_are_unique() {
        let ids: HashSet<_> = goals().iter().map(|g| g.id).collect();
        assert_eq!(ids.len(), goals().len());
        assert_eq!(goals().len(), 28);
    }

    #[test]
    fn every_template_resolves_all_goals() {
        assert_eq!(challenges().len(), 18);
        for c in challenges() {
            assert_eq!(standards_for(c).len(), c.goal_ids.len(), "{}", c.id);
        }
    }

    #[test]
    fn hardcore_snapshot_has_seven_standards() {
        let active = ActiveChallenge::from_catalog("75hardcore").unwrap();
        assert_eq!(active.duration_days, 75);
        assert_eq!(active.standards.len(), 7);
        assert_eq!(active.standard("noFastFood").unwrap().kind, StandardKind::Boolean);
        assert_eq!(active.standard("water3l").unwrap().target(), Some(3.0));
    }

    #[test]
    fn unknown_challenge_is_rejected() {
        assert!(ActiveChallenge::from_catalog("100hard").is_err());
    }

    #[test]
    fn custom_challenge_drops_unknown_goals() {
        let ids = vec!["reading".to_string(), "nope".to_string(), "water2l".to_string()];
        let active = ActiveChallenge::custom(21, &ids).unwrap();
        assert_eq!(active.name, "Custom (21 days)");
        assert_eq!(active.goal_ids, vec!["reading", "water2l"]);
        assert!(ActiveChallenge::custom(21, &["nope".to_string()]).is_err());
        assert!(ActiveChallenge::custom(0, &ids).is_err());
    }

    #[test]
    fn standard_kind_serializes_as_tagged_type() {
        let reading = goal_by_id("reading").unwrap().to_standard();
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["type"], "numeric");
        assert_eq!(json["target"], 10.0);

        let keto = goal_by_id("keto").unwrap().to_standard();
        let json = serde_json::to_value(&keto).unwrap();
        assert_eq!(json["type"], "boolean");
        let back: Standard = serde_json::from_value(json).unwrap();
        assert_eq!(back, keto);
    }

    #[test]
    fn decodes_challenge_saved_by_the_web_app() {
        let json = serde_json::json!({
            "id": "75balanced",
            "name": "75-Day Balanced Protocol",
            "duration": 75,
            "goalIds": ["steps10k", "balancedDiet"],
            "terms": "All standards daily. 3-hour grace. 1 freeze token per 30 days.",
            "standards": [
                {"id": "steps10k", "name": "10,000 Steps", "target": 10000, "unit": "steps",
                 "icon": "fa-shoe-prints", "type": "number", "category": "movement"},
                {"id": "balancedDiet", "name": "Balanced Diet Block", "target": 1, "unit": "day",
                 "icon": "fa-bowl-food", "type": "boolean", "category": "nutrition"}
            ]
        });
        let active: ActiveChallenge = serde_json::from_value(json).unwrap();
        assert_eq!(active.duration_days, 75);
        assert_eq!(active.standard("steps10k").unwrap().target(), Some(10_000.0));
        assert_eq!(active.standard("balancedDiet").unwrap().kind, StandardKind::Boolean);
        assert_eq!(active.terms_text, "All standards daily. 3-hour grace. 1 freeze token per 30 days.");
    }

    #[test]
    fn goals_by_category_partitions_library() {
        let total: usize = GoalCategory::ALL
            .iter()
            .map(|c| goals_by_category(*c).count())
            .sum();
        assert_eq!(total, goals().len());
    }
}
