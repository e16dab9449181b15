use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::calculator;
use crate::error::{EngineError, Result};

/// Tolerance applied when checking that a weight set sums to 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// One weighted measurement of a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    pub factor_id: String,
    pub raw_value: f64,
    pub weight: f64,
}

impl FactorScore {
    pub fn new(factor_id: impl Into<String>, raw_value: f64, weight: f64) -> Self {
        Self {
            factor_id: factor_id.into(),
            raw_value,
            weight,
        }
    }
}

/// Unweighted measurements for one subject, keyed by factor id.
///
/// This is what an input provider hands over; weights are paired with it
/// later, so one set of raw values can be scored under several strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSubject {
    pub id: String,
    pub values: BTreeMap<String, f64>,
}

/// A subject together with its derived composite score.
///
/// The composite is never assigned directly. It is computed when the subject
/// is built and recomputed on every raw value edit, so it always equals
/// `Σ(raw_value × weight)` over `factors`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectScore {
    subject_id: String,
    factors: Vec<FactorScore>,
    composite: f64,
    weight_mismatch: bool,
}

impl SubjectScore {
    /// Build a subject and compute its composite.
    ///
    /// Fails with `InvalidArgument` when `factors` is empty or holds a
    /// non-finite value or a negative weight.
    pub fn new(subject_id: impl Into<String>, factors: Vec<FactorScore>) -> Result<Self> {
        let result = calculator::compute(&factors)?;
        Ok(Self {
            subject_id: subject_id.into(),
            factors,
            composite: result.composite,
            weight_mismatch: result.weight_mismatch,
        })
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn factors(&self) -> &[FactorScore] {
        &self.factors
    }

    pub fn composite(&self) -> f64 {
        self.composite
    }

    /// True when the weights did not sum to 1.0 within tolerance
    pub fn weight_mismatch(&self) -> bool {
        self.weight_mismatch
    }

    /// Raw value recorded for `factor_id`, if the subject carries that factor
    pub fn raw_value(&self, factor_id: &str) -> Option<f64> {
        self.factors
            .iter()
            .find(|f| f.factor_id == factor_id)
            .map(|f| f.raw_value)
    }

    /// Replace one raw value and recompute the composite.
    ///
    /// On error the subject is left exactly as it was.
    pub fn set_raw_value(&mut self, factor_id: &str, value: f64) -> Result<()> {
        let idx = self
            .factors
            .iter()
            .position(|f| f.factor_id == factor_id)
            .ok_or_else(|| {
                EngineError::invalid(format!(
                    "subject '{}' has no factor '{}'",
                    self.subject_id, factor_id
                ))
            })?;

        let mut factors = self.factors.clone();
        factors[idx].raw_value = value;
        let result = calculator::compute(&factors)?;

        self.factors = factors;
        self.composite = result.composite;
        self.weight_mismatch = result.weight_mismatch;
        Ok(())
    }
}

/// Raw scores one rater gave across all subjects for one factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaterColumn {
    pub rater_id: String,
    pub factor_id: String,
    pub values: Vec<f64>,
}

/// A labelled slice `[lower_bound, upper_bound)` of the composite range.
/// The topmost tier of a table is closed at its upper bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tier {
    pub label: String,
    /// Display colour, passed through untouched (e.g. "#ef5350")
    #[serde(default)]
    pub color: String,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl Tier {
    pub fn new(label: impl Into<String>, color: impl Into<String>, lower_bound: f64, upper_bound: f64) -> Self {
        Self {
            label: label.into(),
            color: color.into(),
            lower_bound,
            upper_bound,
        }
    }
}

/// One row of a ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    pub subject_id: String,
    /// 1-based competition rank
    pub rank: usize,
    pub composite: f64,
    /// Tier label, filled in once the entry has been classified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}
