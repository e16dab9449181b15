use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::calculator::build_subject;
use super::ranker::{rank_with_rule, TieBreakRule};
use super::types::{RankEntry, RawSubject, SubjectScore};
use crate::error::{EngineError, Result};

/// A named weighting used to score the same subjects a different way,
/// e.g. tenure-only versus growth-weighted promotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Strategy {
    pub name: String,
    pub weights: BTreeMap<String, f64>,
}

/// Subjects that make B's top-N but not A's.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScenarioDiff {
    pub top_n: usize,
    /// In scenario B's order
    pub only_in_b: Vec<RankEntry>,
    /// Subjects whose strategy weights did not sum to 1.0 in either run
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mismatched: Vec<String>,
}

/// One strategy's ranking plus the subjects scored with unbalanced weights.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRun {
    pub entries: Vec<RankEntry>,
    pub mismatched: Vec<String>,
}

/// Score and rank raw subjects under one strategy.
pub fn run_scenario(subjects: &[RawSubject], strategy: &Strategy, rule: TieBreakRule) -> Result<ScenarioRun> {
    let scored = subjects
        .iter()
        .map(|s| build_subject(&s.id, &s.values, &strategy.weights))
        .collect::<Result<Vec<SubjectScore>>>()?;

    let mismatched: Vec<String> = scored
        .iter()
        .filter(|s| s.weight_mismatch())
        .map(|s| s.subject_id().to_string())
        .collect();

    debug!(
        strategy = %strategy.name,
        subjects = scored.len(),
        mismatched = mismatched.len(),
        "scenario scored"
    );
    Ok(ScenarioRun {
        entries: rank_with_rule(&scored, rule),
        mismatched,
    })
}

/// Find the "hidden gems": subjects in B's top `top_n` that are missing
/// from A's top `top_n`. Membership is by subject id.
///
/// `top_n` must be at least 1 and no longer than either ranking.
pub fn compare(scenario_a: &[RankEntry], scenario_b: &[RankEntry], top_n: usize) -> Result<ScenarioDiff> {
    if top_n == 0 {
        return Err(EngineError::invalid("top_n must be a positive integer"));
    }
    let shortest = scenario_a.len().min(scenario_b.len());
    if top_n > shortest {
        return Err(EngineError::invalid(format!(
            "top_n {} exceeds ranking length (A: {}, B: {})",
            top_n,
            scenario_a.len(),
            scenario_b.len()
        )));
    }

    let top_a: HashSet<&str> = scenario_a[..top_n]
        .iter()
        .map(|e| e.subject_id.as_str())
        .collect();

    let only_in_b = scenario_b[..top_n]
        .iter()
        .filter(|e| !top_a.contains(e.subject_id.as_str()))
        .cloned()
        .collect();

    Ok(ScenarioDiff {
        top_n,
        only_in_b,
        mismatched: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, rank: usize) -> RankEntry {
        RankEntry {
            subject_id: id.to_string(),
            rank,
            composite: 100.0 - rank as f64,
            tier: None,
        }
    }

    fn raw(id: &str, tenure: f64, performance: f64) -> RawSubject {
        RawSubject {
            id: id.to_string(),
            values: [("tenure".to_string(), tenure), ("performance".to_string(), performance)]
                .into_iter()
                .collect(),
        }
    }

    fn strategy(name: &str, pairs: &[(&str, f64)]) -> Strategy {
        Strategy {
            name: name.to_string(),
            weights: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn test_hidden_gems() {
        let a = vec![entry("S1", 1), entry("S2", 2), entry("S3", 3)];
        let b = vec![entry("S1", 1), entry("S3", 2), entry("S2", 3)];
        let diff = compare(&a, &b, 2).unwrap();
        assert_eq!(diff.only_in_b.len(), 1);
        assert_eq!(diff.only_in_b[0].subject_id, "S3");
    }

    #[test]
    fn test_same_top_has_no_gems() {
        let a = vec![entry("S1", 1), entry("S2", 2)];
        let b = vec![entry("S2", 1), entry("S1", 2)];
        assert!(compare(&a, &b, 2).unwrap().only_in_b.is_empty());
    }

    #[test]
    fn test_membership_by_id_not_position() {
        let a = vec![entry("S1", 1), entry("S2", 2)];
        let mut b = vec![entry("S1", 7), entry("S9", 8)];
        b[0].composite = 1.0;
        let diff = compare(&a, &b, 2).unwrap();
        assert_eq!(diff.only_in_b.len(), 1);
        assert_eq!(diff.only_in_b[0].subject_id, "S9");
    }

    #[test]
    fn test_zero_top_n_rejected() {
        let a = vec![entry("S1", 1)];
        assert!(matches!(compare(&a, &a, 0), Err(EngineError::InvalidArgument(_))));
    }

    #[test]
    fn test_top_n_longer_than_ranking_rejected() {
        let a = vec![entry("S1", 1), entry("S2", 2), entry("S3", 3)];
        let b = vec![entry("S1", 1), entry("S2", 2)];
        assert!(matches!(compare(&a, &b, 3), Err(EngineError::InvalidArgument(_))));
    }

    #[test]
    fn test_run_scenarios_surface_growth_candidate() {
        let subjects = vec![raw("veteran", 20.0, 40.0), raw("steady", 15.0, 60.0), raw("rising", 3.0, 95.0)];
        let tenure = strategy("tenure", &[("tenure", 1.0)]);
        let growth = strategy("growth", &[("tenure", 0.2), ("performance", 0.8)]);

        let a = run_scenario(&subjects, &tenure, TieBreakRule::None).unwrap().entries;
        let b = run_scenario(&subjects, &growth, TieBreakRule::None).unwrap().entries;
        // growth: veteran 36, steady 51, rising 76.6
        assert_eq!(b[0].subject_id, "rising");

        let diff = compare(&a, &b, 2).unwrap();
        assert_eq!(diff.only_in_b.len(), 1);
        assert_eq!(diff.only_in_b[0].subject_id, "rising");
    }

    #[test]
    fn test_run_scenario_reports_unbalanced_strategy() {
        let subjects = vec![raw("a", 10.0, 50.0), raw("b", 5.0, 90.0)];
        let partial = strategy("partial", &[("performance", 0.3)]);
        let run = run_scenario(&subjects, &partial, TieBreakRule::None).unwrap();
        assert_eq!(run.mismatched, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(run.entries[0].subject_id, "b");

        let balanced = strategy("tenure", &[("tenure", 1.0)]);
        assert!(run_scenario(&subjects, &balanced, TieBreakRule::None).unwrap().mismatched.is_empty());
    }

    #[test]
    fn test_run_scenario_missing_factor() {
        let subjects = vec![raw("a", 1.0, 2.0)];
        let s = strategy("potential", &[("potential", 1.0)]);
        assert!(run_scenario(&subjects, &s, TieBreakRule::None).is_err());
    }
}
