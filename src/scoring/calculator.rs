use std::collections::BTreeMap;

use tracing::debug;

use super::types::{FactorScore, SubjectScore, WEIGHT_SUM_TOLERANCE};
use crate::error::{EngineError, Result};

/// Weighted share one factor adds to the composite
#[derive(Debug, Clone, PartialEq)]
pub struct FactorContribution {
    pub factor_id: String,
    pub raw_value: f64,
    pub weight: f64,
    pub contribution: f64, // raw_value * weight
}

#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    pub composite: f64,
    pub weight_sum: f64,
    /// Weights did not sum to 1.0 ± WEIGHT_SUM_TOLERANCE. The composite is
    /// still the plain weighted sum; nothing is renormalized.
    pub weight_mismatch: bool,
    pub contributions: Vec<FactorContribution>,
}

/// Combine weighted factor scores into one composite.
///
/// Pure. Fails with `InvalidArgument` on an empty factor list, a non-finite
/// raw value, or a weight outside `[0, 1]`.
pub fn compute(factors: &[FactorScore]) -> Result<Composite> {
    if factors.is_empty() {
        return Err(EngineError::invalid("factors must not be empty"));
    }

    let mut composite = 0.0;
    let mut weight_sum = 0.0;
    let mut contributions = Vec::with_capacity(factors.len());

    for factor in factors {
        if !(0.0..=1.0).contains(&factor.weight) {
            return Err(EngineError::invalid(format!(
                "factor '{}': weight must be within [0, 1], got {}",
                factor.factor_id, factor.weight
            )));
        }
        if !factor.raw_value.is_finite() {
            return Err(EngineError::invalid(format!(
                "factor '{}': raw value must be finite, got {}",
                factor.factor_id, factor.raw_value
            )));
        }

        let contribution = factor.raw_value * factor.weight;
        composite += contribution;
        weight_sum += factor.weight;
        contributions.push(FactorContribution {
            factor_id: factor.factor_id.clone(),
            raw_value: factor.raw_value,
            weight: factor.weight,
            contribution,
        });
    }

    let weight_mismatch = !weights_balanced(weight_sum);
    if weight_mismatch {
        debug!(weight_sum, "weights do not sum to 1.0");
    }

    Ok(Composite {
        composite,
        weight_sum,
        weight_mismatch,
        contributions,
    })
}

/// Recompute a subject's composite from its factors.
pub fn compute_subject(subject: &SubjectScore) -> Result<Composite> {
    compute(subject.factors())
}

pub fn weights_balanced(sum: f64) -> bool {
    (sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
}

/// Pair a subject's raw values with a weight set.
///
/// Every weighted factor needs a raw value; raw values for factors outside
/// the weight set are ignored. Factors are kept in weight-set key order so
/// the composite is summed in the same order for every subject.
pub fn build_subject(
    subject_id: &str,
    values: &BTreeMap<String, f64>,
    weights: &BTreeMap<String, f64>,
) -> Result<SubjectScore> {
    let mut factors = Vec::with_capacity(weights.len());
    for (factor_id, weight) in weights {
        let raw_value = values.get(factor_id).copied().ok_or_else(|| {
            EngineError::invalid(format!(
                "subject '{}' has no value for factor '{}'",
                subject_id, factor_id
            ))
        })?;
        factors.push(FactorScore::new(factor_id.clone(), raw_value, *weight));
    }

    for factor_id in values.keys().filter(|k| !weights.contains_key(*k)) {
        debug!(subject = subject_id, factor = %factor_id, "ignoring unweighted factor");
    }

    SubjectScore::new(subject_id, factors)
}
