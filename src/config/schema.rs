use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scoring::tiers::default_tiers;
use crate::scoring::{DistributionTarget, Strategy, Tier, TieBreakRule};

/// Engine configuration.
///
/// Example YAML:
/// ```yaml
/// weights: { skill: 0.4, responsibility: 0.3, effort: 0.2, conditions: 0.1 }
/// weight_policy: warn
/// tiers:
///   - { label: B, color: "#66bb6a", lower_bound: 0, upper_bound: 70 }
///   - { label: A, color: "#ffa726", lower_bound: 70, upper_bound: 100 }
/// distribution: { target: 5.0, tolerance: 0.5 }
/// tie_break: subject_id
/// strategies:
///   - name: tenure
///     weights: { tenure: 1.0 }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Factor id -> weight. Should sum to 1.0.
    #[serde(default = "default_weights")]
    pub weights: BTreeMap<String, f64>,

    /// What to do when a weight set does not sum to 1.0
    #[serde(default)]
    pub weight_policy: WeightPolicy,

    /// Grade bands, ascending and contiguous
    #[serde(default = "default_tiers")]
    pub tiers: Vec<Tier>,

    /// Anti-leniency calibration
    #[serde(default)]
    pub distribution: DistributionTarget,

    #[serde(default)]
    pub tie_break: TieBreakRule,

    /// Alternative weightings for scenario comparison
    #[serde(default = "default_strategies")]
    pub strategies: Vec<Strategy>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            weights: default_weights(),
            weight_policy: WeightPolicy::default(),
            tiers: default_tiers(),
            distribution: DistributionTarget::default(),
            tie_break: TieBreakRule::default(),
            strategies: default_strategies(),
        }
    }
}

impl Config {
    pub fn strategy(&self, name: &str) -> Option<&Strategy> {
        self.strategies.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightPolicy {
    /// Keep the composite, log a warning, mark the row
    #[default]
    Warn,
    /// Refuse to evaluate
    Reject,
}

fn default_weights() -> BTreeMap<String, f64> {
    // Job-evaluation factors
    [
        ("skill", 0.4),
        ("responsibility", 0.3),
        ("effort", 0.2),
        ("conditions", 0.1),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn default_strategies() -> Vec<Strategy> {
    let weights = |pairs: &[(&str, f64)]| {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect::<BTreeMap<_, _>>()
    };
    vec![
        Strategy {
            name: "tenure".to_string(),
            weights: weights(&[("tenure", 1.0)]),
        },
        Strategy {
            name: "growth".to_string(),
            weights: weights(&[("tenure", 0.2), ("performance", 0.5), ("potential", 0.3)]),
        },
    ]
}
