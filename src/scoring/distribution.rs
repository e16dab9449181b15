use serde::{Deserialize, Serialize};
use tracing::warn;

use super::types::{RaterColumn, SubjectScore};
use crate::error::{EngineError, Result};

/// Calibration target for the anti-leniency gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DistributionTarget {
    pub target: f64,
    pub tolerance: f64,
}

impl Default for DistributionTarget {
    fn default() -> Self {
        Self {
            target: 5.0,
            tolerance: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Validation {
    /// Average of the column; 0.0 for an empty column
    pub mean: f64,
    pub count: usize,
    pub valid: bool,
}

/// Gate outcome for one (rater, factor) column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateResult {
    pub rater_id: String,
    pub factor_id: String,
    pub mean: f64,
    pub count: usize,
    pub target: f64,
    pub tolerance: f64,
    pub valid: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GateReport {
    pub results: Vec<GateResult>,
}

impl GateReport {
    /// Any column failed the gate; submission must be refused.
    pub fn blocked(&self) -> bool {
        self.results.iter().any(|r| !r.valid)
    }

    pub fn failures(&self) -> impl Iterator<Item = &GateResult> {
        self.results.iter().filter(|r| !r.valid)
    }
}

/// Check one rater's column against the calibration target.
///
/// An empty column always passes: a rater who has not scored anyone yet
/// is not penalized.
pub fn validate(column: &RaterColumn, target: f64, tolerance: f64) -> Result<Validation> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(EngineError::invalid(format!(
            "tolerance must be a non-negative number, got {}",
            tolerance
        )));
    }
    if !target.is_finite() {
        return Err(EngineError::invalid(format!("target must be finite, got {}", target)));
    }

    if column.values.is_empty() {
        return Ok(Validation {
            mean: 0.0,
            count: 0,
            valid: true,
        });
    }

    let count = column.values.len();
    let mean = column.values.iter().sum::<f64>() / count as f64;
    let valid = (mean - target).abs() <= tolerance;

    Ok(Validation { mean, count, valid })
}

/// Run the gate over every column independently.
pub fn validate_all(columns: &[RaterColumn], target: &DistributionTarget) -> Result<GateReport> {
    let mut results = Vec::with_capacity(columns.len());

    for column in columns {
        let v = validate(column, target.target, target.tolerance)?;
        if !v.valid {
            warn!(
                rater = %column.rater_id,
                factor = %column.factor_id,
                mean = v.mean,
                target = target.target,
                "rater column outside calibration band"
            );
        }
        results.push(GateResult {
            rater_id: column.rater_id.clone(),
            factor_id: column.factor_id.clone(),
            mean: v.mean,
            count: v.count,
            target: target.target,
            tolerance: target.tolerance,
            valid: v.valid,
        });
    }

    Ok(GateReport { results })
}

/// Which subjects a rater scored on one factor.
///
/// The scores themselves live on the subjects; the gate column is read from
/// them through [`RaterColumn::from_subjects`], so it always reflects the
/// values that feed the composites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RaterAssignment {
    pub rater: String,
    pub factor: String,
    pub subjects: Vec<String>,
}

impl RaterColumn {
    /// View one factor of a rater's scored subjects as a column.
    /// Subjects that do not carry the factor are skipped.
    pub fn from_subjects<'s>(
        rater_id: &str,
        factor_id: &str,
        subjects: impl IntoIterator<Item = &'s SubjectScore>,
    ) -> Self {
        Self {
            rater_id: rater_id.to_string(),
            factor_id: factor_id.to_string(),
            values: subjects
                .into_iter()
                .filter_map(|s| s.raw_value(factor_id))
                .collect(),
        }
    }
}
