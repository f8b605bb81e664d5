//! Completion evaluation for a single day.
//!
//! A day's raw inputs are judged against the active challenge's frozen
//! standards. Evaluation is pure: the same record and standards always give
//! the same [`Evaluation`], so re-processing a day is safe.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{Standard, StandardKind};

/// Completion fraction per date, in `[0, 1]`.
pub type CompletionHistory = BTreeMap<NaiveDate, f64>;

/// A value recorded for one standard.
///
/// Anything the UI wrote is kept; values that are neither a boolean nor a
/// number are judged as zero rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StandardValue {
    Flag(bool),
    Amount(f64),
    Other(serde_json::Value),
}

impl StandardValue {
    /// Numeric reading of the value; numeric strings are parsed, anything
    /// else counts as 0.
    pub fn amount(&self) -> f64 {
        let n = match self {
            StandardValue::Amount(n) => *n,
            StandardValue::Other(serde_json::Value::String(s)) => {
                s.trim().parse::<f64>().unwrap_or(0.0)
            }
            _ => 0.0,
        };
        if n.is_finite() {
            n
        } else {
            0.0
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, StandardValue::Flag(true))
    }
}

impl From<bool> for StandardValue {
    fn from(v: bool) -> Self {
        StandardValue::Flag(v)
    }
}

impl From<f64> for StandardValue {
    fn from(v: f64) -> Self {
        StandardValue::Amount(v)
    }
}

/// Raw inputs for one date plus the engine's bookkeeping flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    /// Completion for this date has been credited (streak and XP).
    #[serde(rename = "_xpAwarded", default, skip_serializing_if = "is_false")]
    pub xp_awarded: bool,
    /// A freeze token already forgave this date.
    #[serde(rename = "_freezeApplied", default, skip_serializing_if = "is_false")]
    pub freeze_applied: bool,
    /// This date already triggered a cycle reset.
    #[serde(rename = "_resetApplied", default, skip_serializing_if = "is_false")]
    pub reset_applied: bool,
    #[serde(flatten)]
    pub values: BTreeMap<String, StandardValue>,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl DayRecord {
    pub fn get(&self, standard_id: &str) -> Option<&StandardValue> {
        self.values.get(standard_id)
    }

    pub fn set(&mut self, standard_id: impl Into<String>, value: impl Into<StandardValue>) {
        self.values.insert(standard_id.into(), value.into());
    }

    /// Whether an incomplete verdict (freeze or reset) was already applied.
    pub fn has_miss_verdict(&self) -> bool {
        self.freeze_applied || self.reset_applied
    }
}

/// Whether `standard` is satisfied by `value`.
pub fn is_done(standard: &Standard, value: Option<&StandardValue>) -> bool {
    match standard.kind {
        StandardKind::Boolean => value.is_some_and(StandardValue::is_true),
        StandardKind::Numeric { target } => {
            value.map(StandardValue::amount).unwrap_or(0.0) >= target
        }
    }
}

/// Result of judging one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub total: usize,
    pub done: usize,
    pub fraction: f64,
    pub all_complete: bool,
    /// First standard, in challenge order, that is not done.
    pub first_missed: Option<String>,
}

/// Judge `record` against `standards`.
///
/// An empty standard set is always incomplete with fraction 0.
pub fn evaluate(standards: &[Standard], record: &DayRecord) -> Evaluation {
    let mut done = 0;
    let mut first_missed = None;
    for standard in standards {
        if is_done(standard, record.get(&standard.id)) {
            done += 1;
        } else if first_missed.is_none() {
            first_missed = Some(standard.name.clone());
        }
    }

    let total = standards.len();
    let fraction = if total == 0 {
        0.0
    } else {
        done as f64 / total as f64
    };

    Evaluation {
        total,
        done,
        fraction,
        all_complete: total > 0 && done == total,
        first_missed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{goal_by_id, ActiveChallenge};

    fn hardcore() -> Vec<Standard> {
        ActiveChallenge::from_catalog("75hardcore").unwrap().standards
    }

    fn complete_record(standards: &[Standard]) -> DayRecord {
        let mut record = DayRecord::default();
        for s in standards {
            match s.kind {
                StandardKind::Boolean => record.set(&s.id, true),
                StandardKind::Numeric { target } => record.set(&s.id, target),
            }
        }
        record
    }

    #[test]
    fn all_done_is_complete_with_full_fraction() {
        let standards = hardcore();
        let eval = evaluate(&standards, &complete_record(&standards));
        assert!(eval.all_complete);
        assert_eq!(eval.fraction, 1.0);
        assert_eq!(eval.first_missed, None);
    }

    #[test]
    fn empty_standards_never_complete() {
        let eval = evaluate(&[], &DayRecord::default());
        assert!(!eval.all_complete);
        assert_eq!(eval.fraction, 0.0);
        assert_eq!(eval.total, 0);
    }

    #[test]
    fn partial_day_reports_fraction_and_first_miss() {
        let standards = hardcore();
        let mut record = complete_record(&standards);
        record.set("reading", 4.0);
        record.set("noFastFood", false);
        let eval = evaluate(&standards, &record);
        assert!(!eval.all_complete);
        assert_eq!(eval.done, 5);
        assert!((eval.fraction - 5.0 / 7.0).abs() < 1e-12);
        assert_eq!(eval.first_missed.as_deref(), Some("Daily Reading"));
    }

    #[test]
    fn boolean_requires_strict_true() {
        let keto = goal_by_id("keto").unwrap().to_standard();
        assert!(is_done(&keto, Some(&StandardValue::Flag(true))));
        assert!(!is_done(&keto, Some(&StandardValue::Amount(1.0))));
        assert!(!is_done(&keto, Some(&StandardValue::Other("true".into()))));
        assert!(!is_done(&keto, None));
    }

    #[test]
    fn numeric_treats_garbage_as_zero() {
        let water = goal_by_id("water3l").unwrap().to_standard();
        assert!(is_done(&water, Some(&StandardValue::Other("3.5".into()))));
        assert!(!is_done(&water, Some(&StandardValue::Other("lots".into()))));
        assert!(!is_done(&water, Some(&StandardValue::Flag(true))));
        assert!(!is_done(&water, None));
        assert!(is_done(&water, Some(&StandardValue::Amount(3.0))));
    }

    #[test]
    fn record_roundtrips_flat_json_with_flags() {
        let json = r#"{"reading": 12, "keto": true, "water3l": "2", "_xpAwarded": true}"#;
        let record: DayRecord = serde_json::from_str(json).unwrap();
        assert!(record.xp_awarded);
        assert!(!record.freeze_applied);
        assert_eq!(record.get("reading"), Some(&StandardValue::Amount(12.0)));
        assert_eq!(record.get("keto"), Some(&StandardValue::Flag(true)));
        assert_eq!(record.values.len(), 3);

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["_xpAwarded"], true);
        assert!(back.get("_freezeApplied").is_none());
    }

    #[test]
    fn evaluation_is_idempotent() {
        let standards = hardcore();
        let mut record = complete_record(&standards);
        record.set("sleep", 6.5);
        assert_eq!(evaluate(&standards, &record), evaluate(&standards, &record));
    }
}
