//! Integration tests for day processing through a session.
//!
//! These tests drive the engine the way the CLI does: open a session over a
//! store, edit today's record, process days, then reopen the store at a later
//! date to continue.

use chrono::{Days, NaiveDate};
use mazoezi_core::{
    ActiveChallenge, Config, Database, Event, FixedClock, MomentumState, RelapseReason, Session,
    StandardKind, Store, Verdict,
};
use mazoezi_core::storage::{CycleStore, HistoryStore, ProfileStore};

fn day(n: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap() + Days::new(n)
}

fn open<S: Store>(store: S, date: NaiveDate, hour: u32) -> Session<S, FixedClock> {
    Session::open(store, Config::default(), FixedClock::at(date, hour)).unwrap()
}

/// Fill every standard of the active challenge for today.
///
/// Partially logged days are judged as soon as grace ends, so callers log
/// inside the grace window.
fn complete_today<S: Store>(session: &mut Session<S, FixedClock>) {
    let standards = session.active_challenge().unwrap().standards.clone();
    for s in standards {
        let value: mazoezi_core::StandardValue = match s.kind {
            StandardKind::Boolean => true.into(),
            StandardKind::Numeric { target } => target.into(),
        };
        session.set_value(&s.id, value, &mut RelapseReason::Other).unwrap();
    }
}

fn started(challenge: &str, date: NaiveDate) -> Session<Database, FixedClock> {
    let mut s = open(Database::open_memory().unwrap(), date, 1);
    s.start_challenge(ActiveChallenge::from_catalog(challenge).unwrap()).unwrap();
    s
}

#[test]
fn test_full_day_is_complete() {
    let mut s = started("75hardcore", day(0));
    complete_today(&mut s);
    let eval = s.evaluate_day(day(0)).unwrap();
    assert!(eval.all_complete);
    assert_eq!(eval.fraction, 1.0);
    assert_eq!(s.completion_history()[&day(0)], 1.0);
}

#[test]
fn test_reprocessing_is_idempotent() {
    let mut s = started("steps10k", day(0));
    complete_today(&mut s);
    let profile = s.profile().clone();
    let xp = s.store().xp_history().unwrap();

    let again = s.process_day(day(0), &mut RelapseReason::Other).unwrap();
    assert_eq!(again.verdict, Verdict::AlreadyCredited);
    assert_eq!(*s.profile(), profile);
    assert_eq!(s.store().xp_history().unwrap(), xp);
    assert_eq!(s.store().profile().unwrap(), profile);
    assert_eq!(profile.current_streak, 1);
}

#[test]
fn test_streak_builds_across_days_and_xp_is_recorded() {
    let mut s = started("steps10k", day(0));
    complete_today(&mut s);
    for n in 1..=4 {
        s = open(s.into_store(), day(n), 1);
        complete_today(&mut s);
    }
    assert_eq!(s.profile().current_streak, 5);
    assert_eq!(s.profile().longest_streak, 5);
    assert_eq!(s.cycle_day(), 5);

    let xp = s.store().xp_history().unwrap();
    assert_eq!(xp.len(), 5);
    assert_eq!(xp[&day(0)], 258);
    assert_eq!(xp[&day(4)], 292);
    assert_eq!(xp.values().sum::<u64>(), s.profile().total_xp);
    assert_eq!(s.momentum().state, MomentumState::Weak);
}

#[test]
fn test_prestige_resets_level() {
    let mut s = started("steps10k", day(0));
    let mut profile = s.profile().clone();
    profile.total_xp = 98_900;
    let mut store = s.into_store();
    store
        .merge_profile(&mazoezi_core::ProfilePatch::diff(&Default::default(), &profile))
        .unwrap();

    s = open(store, day(0), 1);
    complete_today(&mut s);
    assert_eq!(s.profile().prestige_count, 1);
    assert_eq!(s.profile().total_xp, 0);
    assert_eq!(s.progress().level, 1);
}

#[test]
fn test_missed_day_without_tokens_resets_cycle() {
    let mut s = started("steps10k", day(0));
    complete_today(&mut s);

    // Day 1 is never logged; judge it from day 2.
    s = open(s.into_store(), day(2), 12);
    let outcome = s.process_day(day(1), &mut RelapseReason::Travel).unwrap();

    assert_eq!(outcome.verdict, Verdict::Reset);
    let archived = outcome.archived.unwrap();
    assert_eq!(archived.relapse_reason, RelapseReason::Travel);
    assert_eq!(archived.cycle_day_at_reset, 3);
    assert_eq!(archived.missed_standard.as_deref(), Some("10,000 Steps"));
    assert_eq!(archived.cycle_start_date, Some(day(0)));
    assert!(outcome.events.iter().any(|e| matches!(e, Event::CycleReset { .. })));

    assert_eq!(s.profile().current_streak, 0);
    assert_eq!(s.profile().longest_streak, 1);
    assert_eq!(s.profile().cycle_start_date, Some(day(2)));
    assert_eq!(s.store().cycles().unwrap().len(), 1);
    assert!(s.day_record(day(1)).unwrap().reset_applied);

    // A second look at the same day does not archive again.
    let again = s.process_day(day(1), &mut RelapseReason::Travel).unwrap();
    assert_eq!(again.verdict, Verdict::AlreadyJudged);
    assert_eq!(s.store().cycles().unwrap().len(), 1);
}

#[test]
fn test_freeze_token_preserves_streak() {
    let mut s = started("steps10k", day(0));
    complete_today(&mut s);
    s.grant_freeze_tokens(1).unwrap();

    s = open(s.into_store(), day(2), 12);
    let outcome = s.process_day(day(1), &mut RelapseReason::Other).unwrap();
    assert_eq!(outcome.verdict, Verdict::FreezeConsumed { tokens_left: 0 });
    assert_eq!(s.profile().freeze_tokens, 0);
    assert_eq!(s.profile().current_streak, 1);
    assert!(s.store().cycles().unwrap().is_empty());
    assert!(outcome.archived.is_none());
}

#[test]
fn test_today_incomplete_within_grace_is_left_open() {
    let mut s = started("75hardcore", day(0));
    s = open(s.into_store(), day(1), 2);
    let outcome = s.set_value("reading", 5.0, &mut RelapseReason::Other).unwrap();
    assert_eq!(outcome.verdict, Verdict::WithinGrace);
    assert!(s.store().cycles().unwrap().is_empty());
    assert!((s.completion_history()[&day(1)] - 0.0).abs() < f64::EPSILON);
}

#[test]
fn test_patterns_emerge_after_three_resets() {
    let mut s = started("steps10k", day(0));
    for (n, reason) in [(1, RelapseReason::Fatigue), (3, RelapseReason::Fatigue)] {
        s = open(s.into_store(), day(n), 12);
        s.reset_cycle(reason).unwrap();
    }
    assert!(s.patterns().is_none());

    s = open(s.into_store(), day(5), 12);
    s.reset_cycle(RelapseReason::Fatigue).unwrap();
    let patterns = s.patterns().unwrap();
    assert_eq!(patterns.top_reason, Some(RelapseReason::Fatigue));
    assert_eq!(patterns.total_resets, 3);
    assert!((s.discipline_score().reset - 0.7).abs() < 1e-9);
}

#[test]
fn test_processing_without_challenge_fails() {
    let mut s = open(Database::open_memory().unwrap(), day(0), 12);
    assert!(s.process_day(day(0), &mut RelapseReason::Other).is_err());
    assert!(s.toggle("steps10k", &mut RelapseReason::Other).is_err());
}
