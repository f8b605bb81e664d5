//! Explicit engine context.
//!
//! A [`Session`] owns the store, the configuration and the clock, and caches
//! the profile, histories and archive it loaded at start. Every transition is
//! computed on copies; only a fully computed transition is persisted, in the
//! order completion history, day record, profile, XP history, archive. A crash
//! between steps therefore leaves completion ahead of progression, which can
//! under-credit a day but never credit it twice.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::catalog::ActiveChallenge;
use crate::completion::{evaluate, CompletionHistory, DayRecord, Evaluation, StandardValue};
use crate::discipline::{DisciplineCalculator, DisciplineScore};
use crate::error::{Result, ValidationError};
use crate::events::Event;
use crate::momentum::{momentum, Momentum};
use crate::progression::{LevelProgress, Ledger, Profile, ProfilePatch, Verdict, XpHistory};
use crate::protocol::{cycle_day, is_within_grace, Clock, SystemClock};
use crate::relapse::{analyze_patterns, ArchivedCycle, RelapsePatterns, RelapsePrompt, RelapseReason, ResetContext};
use crate::storage::{Config, Store};

/// What processing one day did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayOutcome {
    pub date: NaiveDate,
    pub evaluation: Evaluation,
    #[serde(flatten)]
    pub verdict: Verdict,
    pub events: Vec<Event>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<ArchivedCycle>,
}

pub struct Session<S: Store, C: Clock = SystemClock> {
    store: S,
    config: Config,
    clock: C,
    ledger: Ledger,
    profile: Profile,
    completion: CompletionHistory,
    xp_history: XpHistory,
    archive: Vec<ArchivedCycle>,
}

impl<S: Store, C: Clock> Session<S, C> {
    /// Load the profile, histories and archive from `store`.
    pub fn open(store: S, config: Config, clock: C) -> Result<Self> {
        let profile = store.profile()?;
        let completion = store.completion_history()?;
        let xp_history = store.xp_history()?;
        let archive = store.cycles()?;
        tracing::debug!(
            days = completion.len(),
            resets = archive.len(),
            challenge = profile.active_challenge.as_ref().map(|c| c.id.as_str()),
            "session opened"
        );
        Ok(Self {
            ledger: Ledger::with_config(config.xp.clone()),
            store,
            config,
            clock,
            profile,
            completion,
            xp_history,
            archive,
        })
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn completion_history(&self) -> &CompletionHistory {
        &self.completion
    }

    pub fn xp_history(&self) -> &XpHistory {
        &self.xp_history
    }

    /// Archived cycles, newest first.
    pub fn archive(&self) -> &[ArchivedCycle] {
        &self.archive
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn active_challenge(&self) -> Result<&ActiveChallenge> {
        self.profile
            .active_challenge
            .as_ref()
            .ok_or_else(|| ValidationError::NoActiveChallenge.into())
    }

    /// Today's raw record.
    pub fn today_record(&self) -> Result<DayRecord> {
        self.store.day(self.today())
    }

    pub fn day_record(&self, date: NaiveDate) -> Result<DayRecord> {
        self.store.day(date)
    }

    /// Evaluate a stored day without judging it.
    pub fn evaluate_day(&self, date: NaiveDate) -> Result<Evaluation> {
        let challenge = self.active_challenge()?;
        Ok(evaluate(&challenge.standards, &self.store.day(date)?))
    }

    fn commit_profile(&mut self, next: Profile) -> Result<()> {
        let patch = ProfilePatch::diff(&self.profile, &next);
        if !patch.is_empty() {
            self.store.merge_profile(&patch)?;
        }
        self.profile = next;
        Ok(())
    }

    /// Begin `challenge`: its standards are frozen and the cycle starts today.
    ///
    /// # Errors
    /// Fails while another challenge is active; use
    /// [`Session::switch_challenge`] to archive it and move on.
    pub fn start_challenge(&mut self, challenge: ActiveChallenge) -> Result<Event> {
        if let Some(current) = &self.profile.active_challenge {
            return Err(ValidationError::ChallengeInProgress(current.id.clone()).into());
        }
        self.begin(challenge)
    }

    /// Archive the active cycle (if any) under `reason`, then begin
    /// `challenge`.
    pub fn switch_challenge(&mut self, challenge: ActiveChallenge, reason: RelapseReason) -> Result<Event> {
        if self.profile.active_challenge.is_none() {
            return self.begin(challenge);
        }
        let (reset, cycle) = self.archive_current(reason)?;
        self.begin_from(reset, challenge, Some(cycle))
    }

    fn begin(&mut self, challenge: ActiveChallenge) -> Result<Event> {
        let profile = self.profile.clone();
        self.begin_from(profile, challenge, None)
    }

    fn begin_from(
        &mut self,
        mut next: Profile,
        challenge: ActiveChallenge,
        archived: Option<ArchivedCycle>,
    ) -> Result<Event> {
        if challenge.standards.is_empty() {
            return Err(ValidationError::EmptyCollection("challenge standards".to_string()).into());
        }
        let now = self.now();
        let event = Event::ChallengeStarted {
            challenge_id: challenge.id.clone(),
            duration_days: challenge.duration_days,
            standards: challenge.standards.len(),
            at: now,
        };

        next.cycle_start_date = Some(now.date());
        next.protocol_accepted_at = Some(crate::relapse::local_to_utc(now));
        next.active_challenge = Some(challenge);
        self.commit_profile(next)?;
        if let Some(cycle) = archived {
            self.store.append_cycle(&cycle)?;
            self.archive.insert(0, cycle);
        }

        tracing::info!(?event, "challenge started");
        Ok(event)
    }

    /// Record `value` for standard `standard_id` on today's record, then
    /// process today.
    pub fn set_value(
        &mut self,
        standard_id: &str,
        value: impl Into<StandardValue>,
        prompt: &mut impl RelapsePrompt,
    ) -> Result<DayOutcome> {
        let challenge = self.active_challenge()?;
        if challenge.standard(standard_id).is_none() {
            return Err(ValidationError::UnknownStandard(standard_id.to_string()).into());
        }

        let today = self.today();
        let mut record = self.store.day(today)?;
        record.set(standard_id, value);
        self.store.set_day(today, &record)?;
        self.process_day(today, prompt)
    }

    /// Flip a standard on today's record: booleans invert, numeric standards
    /// move between 0 and their target.
    pub fn toggle(&mut self, standard_id: &str, prompt: &mut impl RelapsePrompt) -> Result<DayOutcome> {
        let standard = self
            .active_challenge()?
            .standard(standard_id)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownStandard(standard_id.to_string()))?;

        let current = self.store.day(self.today())?;
        let value = match standard.target() {
            None => StandardValue::Flag(!current.get(standard_id).is_some_and(StandardValue::is_true)),
            Some(target) => {
                let have = current.get(standard_id).map(StandardValue::amount).unwrap_or(0.0);
                StandardValue::Amount(if have >= target { 0.0 } else { target })
            }
        };
        self.set_value(standard_id, value, prompt)
    }

    /// Judge `date` against the active challenge and commit the result.
    ///
    /// A reset asks `prompt` for a reason; a skipped prompt records
    /// [`RelapseReason::Other`].
    pub fn process_day(&mut self, date: NaiveDate, prompt: &mut impl RelapsePrompt) -> Result<DayOutcome> {
        let today = self.today();
        if date > today {
            return Err(ValidationError::InvalidValue {
                field: "date".to_string(),
                message: format!("{date} is in the future (today is {today})"),
            }
            .into());
        }

        let challenge = self.active_challenge()?;
        let record = self.store.day(date)?;
        let evaluation = evaluate(&challenge.standards, &record);
        let missed = evaluation.first_missed.clone();
        let now = self.now();
        tracing::debug!(%date, done = evaluation.done, total = evaluation.total, "day evaluated");

        let within_grace = is_within_grace(date, &self.clock, self.config.protocol.grace_hours);
        let transition = self
            .ledger
            .judge(&self.profile, &record, &evaluation, date, within_grace, now);

        let mut events = vec![Event::DayEvaluated {
            date,
            fraction: evaluation.fraction,
            all_complete: evaluation.all_complete,
            at: now,
        }];
        events.extend(transition.events);
        let mut next = transition.profile;
        let mut next_record = transition.record;
        let mut verdict = transition.verdict;
        let mut archived = None;

        if verdict == Verdict::ResetRequired {
            let ctx = ResetContext {
                date,
                cycle_day: self.cycle_day(),
                missed_standard: missed.clone(),
            };
            let reason = prompt.relapse_reason(&ctx).unwrap_or_default();
            let (reset, cycle) = self.ledger.reset(
                &next,
                reason,
                missed,
                now,
                self.config.protocol.default_duration_days,
            );
            events.push(Event::CycleReset {
                cycle_day: cycle.cycle_day_at_reset,
                reason,
                at: now,
            });
            next = reset;
            next_record.reset_applied = true;
            verdict = Verdict::Reset;
            archived = Some(cycle);
        }

        self.store.set_completion(date, evaluation.fraction)?;
        self.completion.insert(date, evaluation.fraction);
        if next_record != record {
            self.store.set_day(date, &next_record)?;
        }
        self.commit_profile(next)?;
        if let Some(xp) = transition.xp_awarded {
            self.store.add_xp(date, xp)?;
            let entry = self.xp_history.entry(date).or_insert(0);
            *entry = entry.saturating_add(xp);
        }
        if let Some(cycle) = &archived {
            self.store.append_cycle(cycle)?;
            self.archive.insert(0, cycle.clone());
        }

        Ok(DayOutcome {
            date,
            evaluation,
            verdict,
            events,
            archived,
        })
    }

    /// Manually archive the current cycle and restart it today.
    pub fn reset_cycle(&mut self, reason: RelapseReason) -> Result<ArchivedCycle> {
        let (next, cycle) = self.archive_current(reason)?;
        self.commit_profile(next)?;
        self.store.append_cycle(&cycle)?;
        self.archive.insert(0, cycle.clone());
        Ok(cycle)
    }

    /// Reset profile and archive entry for the running cycle; nothing is
    /// written.
    fn archive_current(&self, reason: RelapseReason) -> Result<(Profile, ArchivedCycle)> {
        let now = self.now();
        let missed = match &self.profile.active_challenge {
            Some(challenge) => evaluate(&challenge.standards, &self.store.day(now.date())?).first_missed,
            None => None,
        };
        Ok(self.ledger.reset(
            &self.profile,
            reason,
            missed,
            now,
            self.config.protocol.default_duration_days,
        ))
    }

    /// Credit `count` freeze tokens.
    pub fn grant_freeze_tokens(&mut self, count: u32) -> Result<Event> {
        let mut next = self.profile.clone();
        next.freeze_tokens = next.freeze_tokens.saturating_add(count);
        let event = Event::FreezeGranted {
            granted: count,
            tokens: next.freeze_tokens,
            at: self.now(),
        };
        self.commit_profile(next)?;
        tracing::info!(count, tokens = self.profile.freeze_tokens, "freeze tokens granted");
        Ok(event)
    }

    /// Day number within the current cycle, `1..=duration`.
    pub fn cycle_day(&self) -> u32 {
        cycle_day(
            self.profile.cycle_start_date,
            self.today(),
            self.profile
                .duration_days(self.config.protocol.default_duration_days),
        )
    }

    pub fn discipline_score(&self) -> DisciplineScore {
        DisciplineCalculator::new(self.config.score.clone()).breakdown(
            &self.profile,
            &self.completion,
            self.archive.len(),
        )
    }

    pub fn momentum(&self) -> Momentum {
        momentum(&self.completion, self.today(), &self.config.momentum)
    }

    pub fn patterns(&self) -> Option<RelapsePatterns> {
        analyze_patterns(&self.archive, self.config.relapse.min_sample)
    }

    pub fn progress(&self) -> LevelProgress {
        self.ledger.progress(&self.profile)
    }
}
