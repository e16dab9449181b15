//! One evaluation session: the subjects being scored plus the configuration
//! they are scored under.
//!
//! The session is the only owner of its subjects. Every edit goes through
//! [`Session::set_raw_value`], which recomputes the affected composite, so the
//! pipeline output always matches a full recomputation over the current input.
//! Rater assignments only name subjects; gate columns are read from the
//! subjects themselves, so the gate sees exactly the values that get ranked.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Config, WeightPolicy};
use crate::error::{EngineError, Result};
use crate::input::EvaluationInput;
use crate::scoring::calculator::build_subject;
use crate::scoring::ranker::assign_tiers;
use crate::scoring::tiers::tier_counts;
use crate::scoring::{
    compare, rank_with_rule, run_scenario, validate_all, GateReport, RankEntry, RaterAssignment,
    RaterColumn, RawSubject, ScenarioDiff, SubjectScore,
};

/// Result of running the full pipeline once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub entries: Vec<RankEntry>,
    pub gate: GateReport,
    /// Subjects whose weights did not sum to 1.0
    pub mismatched: Vec<String>,
    /// Entries per tier label, in tier-table order
    pub tier_counts: Vec<(String, usize)>,
}

impl Evaluation {
    /// False when any rater column failed the anti-leniency gate
    pub fn submittable(&self) -> bool {
        !self.gate.blocked()
    }

    pub fn is_mismatched(&self, subject_id: &str) -> bool {
        self.mismatched.iter().any(|id| id == subject_id)
    }
}

#[derive(Debug)]
pub struct Session<'a> {
    config: &'a Config,
    raw: Vec<RawSubject>,
    subjects: Vec<SubjectScore>,
    raters: Vec<RaterAssignment>,
}

impl<'a> Session<'a> {
    /// Score every subject under the configured weights.
    pub fn new(config: &'a Config, raw: Vec<RawSubject>) -> Result<Self> {
        let subjects = raw
            .iter()
            .map(|s| build_subject(&s.id, &s.values, &config.weights))
            .collect::<Result<Vec<_>>>()?;

        debug!(subjects = subjects.len(), "session opened");
        Ok(Self {
            config,
            raw,
            subjects,
            raters: Vec::new(),
        })
    }

    /// Open a session over loaded input, registering its rater assignments.
    pub fn from_input(config: &'a Config, input: &EvaluationInput) -> Result<Self> {
        let mut session = Self::new(config, input.subjects.clone())?;
        for assignment in &input.ratings {
            session.assign_rater(assignment.clone())?;
        }
        Ok(session)
    }

    /// Record which subjects a rater scored on one weighted factor.
    ///
    /// One assignment per (rater, factor); every subject must be known.
    pub fn assign_rater(&mut self, assignment: RaterAssignment) -> Result<()> {
        if !self.config.weights.contains_key(&assignment.factor) {
            return Err(EngineError::invalid(format!(
                "rater '{}': factor '{}' is not weighted",
                assignment.rater, assignment.factor
            )));
        }
        if self
            .raters
            .iter()
            .any(|r| r.rater == assignment.rater && r.factor == assignment.factor)
        {
            return Err(EngineError::invalid(format!(
                "rater '{}' already assigned to factor '{}'",
                assignment.rater, assignment.factor
            )));
        }
        let mut seen = HashSet::new();
        for id in &assignment.subjects {
            if self.subject(id).is_none() {
                return Err(EngineError::invalid(format!(
                    "rater '{}': unknown subject '{}'",
                    assignment.rater, id
                )));
            }
            if !seen.insert(id.as_str()) {
                return Err(EngineError::invalid(format!(
                    "rater '{}': subject '{}' listed twice",
                    assignment.rater, id
                )));
            }
        }

        debug!(
            rater = %assignment.rater,
            factor = %assignment.factor,
            subjects = assignment.subjects.len(),
            "rater assigned"
        );
        self.raters.push(assignment);
        Ok(())
    }

    pub fn subjects(&self) -> &[SubjectScore] {
        &self.subjects
    }

    pub fn subject(&self, subject_id: &str) -> Option<&SubjectScore> {
        self.subjects.iter().find(|s| s.subject_id() == subject_id)
    }

    /// Change one raw value and recompute that subject's composite.
    ///
    /// Factors outside the configured weights are still recorded, since
    /// scenario strategies may weight them. On error nothing changes.
    pub fn set_raw_value(&mut self, subject_id: &str, factor_id: &str, value: f64) -> Result<()> {
        let idx = self
            .raw
            .iter()
            .position(|s| s.id == subject_id)
            .ok_or_else(|| EngineError::invalid(format!("unknown subject '{}'", subject_id)))?;

        if !value.is_finite() {
            return Err(EngineError::invalid(format!(
                "factor '{}': raw value must be finite, got {}",
                factor_id, value
            )));
        }

        if self.config.weights.contains_key(factor_id) {
            self.subjects[idx].set_raw_value(factor_id, value)?;
            debug!(
                subject = subject_id,
                factor = factor_id,
                composite = self.subjects[idx].composite(),
                "composite recomputed"
            );
        }
        self.raw[idx].values.insert(factor_id.to_string(), value);
        Ok(())
    }

    /// One gate column per rater assignment, read from the current subjects.
    pub fn rater_columns(&self) -> Vec<RaterColumn> {
        self.raters
            .iter()
            .map(|r| {
                RaterColumn::from_subjects(
                    &r.rater,
                    &r.factor,
                    r.subjects.iter().filter_map(|id| self.subject(id)),
                )
            })
            .collect()
    }

    /// Run the anti-leniency gate over every rater column.
    pub fn gate(&self) -> Result<GateReport> {
        validate_all(&self.rater_columns(), &self.config.distribution)
    }

    fn check_mismatch(&self, mismatched: &[String]) -> Result<()> {
        if mismatched.is_empty() {
            return Ok(());
        }
        match self.config.weight_policy {
            WeightPolicy::Reject => Err(EngineError::invalid(format!(
                "weights do not sum to 1.0 for {} subject(s)",
                mismatched.len()
            ))),
            WeightPolicy::Warn => {
                warn!(count = mismatched.len(), "weights do not sum to 1.0; composites are not comparable");
                Ok(())
            }
        }
    }

    /// Run gate, ranker and tier classifier over the current state.
    ///
    /// Under `weight_policy: reject` any weight mismatch aborts with
    /// `InvalidArgument`; under `warn` the affected subjects are listed in
    /// [`Evaluation::mismatched`].
    pub fn evaluate(&self) -> Result<Evaluation> {
        let mismatched: Vec<String> = self
            .subjects
            .iter()
            .filter(|s| s.weight_mismatch())
            .map(|s| s.subject_id().to_string())
            .collect();

        self.check_mismatch(&mismatched)?;

        let gate = self.gate()?;

        let mut entries = rank_with_rule(&self.subjects, self.config.tie_break);
        assign_tiers(&mut entries, &self.config.tiers)?;
        let counts = tier_counts(&entries, &self.config.tiers);

        info!(
            subjects = entries.len(),
            gate_failures = gate.failures().count(),
            "evaluation complete"
        );

        Ok(Evaluation {
            entries,
            gate,
            mismatched,
            tier_counts: counts,
        })
    }

    /// Rank the session's raw values under two configured strategies and
    /// list the subjects only the alternative puts in its top `top_n`.
    ///
    /// Strategy weights go through the same `weight_policy` as the session
    /// weights; under `warn` the unbalanced subjects are listed in
    /// [`ScenarioDiff::mismatched`].
    pub fn compare(&self, baseline: &str, alternative: &str, top_n: usize) -> Result<ScenarioDiff> {
        let lookup = |name: &str| {
            self.config
                .strategy(name)
                .ok_or_else(|| EngineError::invalid(format!("unknown strategy '{}'", name)))
        };
        let a = run_scenario(&self.raw, lookup(baseline)?, self.config.tie_break)?;
        let b = run_scenario(&self.raw, lookup(alternative)?, self.config.tie_break)?;

        let mut mismatched = a.mismatched;
        for id in b.mismatched {
            if !mismatched.contains(&id) {
                mismatched.push(id);
            }
        }
        self.check_mismatch(&mismatched)?;

        let mut diff = compare(&a.entries, &b.entries, top_n)?;
        diff.mismatched = mismatched;
        Ok(diff)
    }
}
