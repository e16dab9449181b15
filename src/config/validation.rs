use std::collections::{BTreeMap, HashSet};

use super::schema::{Config, WeightPolicy};
use crate::scoring::calculator::weights_balanced;
use crate::scoring::validate_tiers;

/// Validate configuration at startup.
/// Returns all validation errors at once (not just the first).
///
/// Weight sets that do not sum to 1.0 are only errors under
/// `weight_policy: reject`; otherwise they surface later as flagged rows.
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    let strict = config.weight_policy == WeightPolicy::Reject;

    check_weights("weights", &config.weights, strict, &mut errors);

    if let Err(e) = validate_tiers(&config.tiers) {
        errors.push(format!("tiers: {}", e));
    }
    for (i, tier) in config.tiers.iter().enumerate() {
        if tier.label.trim().is_empty() {
            errors.push(format!("tiers[{}].label: must not be empty", i));
        }
    }

    let d = &config.distribution;
    if !d.target.is_finite() {
        errors.push("distribution.target: must be a finite number".to_string());
    }
    if !d.tolerance.is_finite() || d.tolerance < 0.0 {
        errors.push("distribution.tolerance: must be non-negative".to_string());
    }

    let mut names = HashSet::new();
    for (i, strategy) in config.strategies.iter().enumerate() {
        if strategy.name.trim().is_empty() {
            errors.push(format!("strategies[{}].name: must not be empty", i));
        } else if !names.insert(strategy.name.as_str()) {
            errors.push(format!("strategies[{}].name: duplicate '{}'", i, strategy.name));
        }
        check_weights(&format!("strategies[{}].weights", i), &strategy.weights, strict, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_weights(path: &str, weights: &BTreeMap<String, f64>, strict: bool, errors: &mut Vec<String>) {
    if weights.is_empty() {
        errors.push(format!("{}: at least one factor is required", path));
        return;
    }

    let mut all_valid = true;
    for (factor, weight) in weights {
        if !(0.0..=1.0).contains(weight) {
            errors.push(format!("{}.{}: must be within [0, 1], got {}", path, factor, weight));
            all_valid = false;
        }
    }

    let sum: f64 = weights.values().sum();
    if strict && all_valid && !weights_balanced(sum) {
        errors.push(format!("{}: weights sum to {}, expected 1.0", path, sum));
    }
}
