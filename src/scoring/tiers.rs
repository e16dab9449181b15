use std::collections::HashSet;

use super::types::{RankEntry, Tier};
use crate::error::{EngineError, Result};

/// Check that a tier table is usable for classification.
///
/// Tiers must be non-empty, sorted ascending by `lower_bound`, each with
/// `lower_bound < upper_bound`, and contiguous: every tier starts exactly
/// where the previous one ends. Labels must be unique.
pub fn validate_tiers(tiers: &[Tier]) -> Result<()> {
    if tiers.is_empty() {
        return Err(EngineError::invalid("tier table must not be empty"));
    }

    let mut labels = HashSet::new();
    for (i, tier) in tiers.iter().enumerate() {
        if !labels.insert(tier.label.as_str()) {
            return Err(EngineError::config(format!("duplicate tier label '{}'", tier.label)));
        }
        if !tier.lower_bound.is_finite() || !tier.upper_bound.is_finite() {
            return Err(EngineError::config(format!(
                "tier '{}' has a non-finite bound",
                tier.label
            )));
        }
        if tier.lower_bound >= tier.upper_bound {
            return Err(EngineError::config(format!(
                "tier '{}': lower bound {} must be below upper bound {}",
                tier.label, tier.lower_bound, tier.upper_bound
            )));
        }
        if i == 0 {
            continue;
        }

        let prev = &tiers[i - 1];
        if tier.lower_bound < prev.lower_bound {
            return Err(EngineError::config(format!(
                "tiers not sorted: '{}' starts at {} before '{}' at {}",
                tier.label, tier.lower_bound, prev.label, prev.lower_bound
            )));
        }
        if tier.lower_bound < prev.upper_bound {
            return Err(EngineError::config(format!(
                "tiers '{}' and '{}' overlap",
                prev.label, tier.label
            )));
        }
        if tier.lower_bound > prev.upper_bound {
            return Err(EngineError::config(format!(
                "gap between '{}' (ends {}) and '{}' (starts {})",
                prev.label, prev.upper_bound, tier.label, tier.lower_bound
            )));
        }
    }

    Ok(())
}

/// Find the tier whose interval holds `score`.
///
/// Intervals are half-open `[lower, upper)`, so a boundary value belongs to
/// the tier that starts there. Anything at or above the top bound lands in
/// the topmost tier.
pub fn find_tier(score: f64, tiers: &[Tier]) -> Result<&Tier> {
    validate_tiers(tiers)?;

    if !score.is_finite() {
        return Err(EngineError::invalid(format!("score must be finite, got {}", score)));
    }

    let lowest = tiers[0].lower_bound;
    if score < lowest {
        return Err(EngineError::OutOfRange { score, lowest });
    }

    // Number of tiers starting at or below the score; at least 1 here.
    let idx = tiers.partition_point(|t| t.lower_bound <= score);
    Ok(&tiers[idx - 1])
}

/// Label of the tier holding `score`.
pub fn classify(score: f64, tiers: &[Tier]) -> Result<String> {
    find_tier(score, tiers).map(|t| t.label.clone())
}

/// Classify by rank position instead of score.
///
/// Position 1 of `total` maps to 100 and the last position to `100 / total`;
/// that percentile goes through the same tier table.
pub fn classify_rank(position: usize, total: usize, tiers: &[Tier]) -> Result<String> {
    if total == 0 || position == 0 || position > total {
        return Err(EngineError::invalid(format!(
            "rank position {} outside 1..={}",
            position, total
        )));
    }
    let percentile = 100.0 * (1.0 - (position - 1) as f64 / total as f64);
    classify(percentile, tiers)
}

/// Count classified entries per tier, in tier-table order.
/// Unclassified entries are not counted.
pub fn tier_counts(entries: &[RankEntry], tiers: &[Tier]) -> Vec<(String, usize)> {
    tiers
        .iter()
        .map(|tier| {
            let n = entries
                .iter()
                .filter(|e| e.tier.as_deref() == Some(tier.label.as_str()))
                .count();
            (tier.label.clone(), n)
        })
        .collect()
}

/// Stock S/A/B/C/D grading over a 0-100 composite.
pub fn default_tiers() -> Vec<Tier> {
    vec![
        Tier::new("D", "#9e9e9e", 0.0, 60.0),
        Tier::new("C", "#42a5f5", 60.0, 70.0),
        Tier::new("B", "#66bb6a", 70.0, 80.0),
        Tier::new("A", "#ffa726", 80.0, 90.0),
        Tier::new("S", "#ef5350", 90.0, 100.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn two_tiers() -> Vec<Tier> {
        vec![Tier::new("B", "", 0.0, 70.0), Tier::new("A", "", 70.0, 100.0)]
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let tiers = vec![Tier::new("X", "", 0.0, 50.0), Tier::new("X", "", 50.0, 100.0)];
        assert!(matches!(validate_tiers(&tiers), Err(EngineError::Configuration(_))));
        assert!(classify(10.0, &tiers).is_err());
    }

    #[test]
    fn test_boundary_belongs_to_upper_tier() {
        assert_eq!(classify(70.0, &two_tiers()).unwrap(), "A");
        assert_eq!(classify(69.999, &two_tiers()).unwrap(), "B");
    }

    #[test]
    fn test_top_tier_closed() {
        assert_eq!(classify(100.0, &two_tiers()).unwrap(), "A");
    }

    #[test]
    fn test_above_top_goes_to_top_tier() {
        assert_eq!(classify(130.0, &two_tiers()).unwrap(), "A");
    }

    #[test]
    fn test_lowest_bound_inclusive() {
        assert_eq!(classify(0.0, &two_tiers()).unwrap(), "B");
    }

    #[test]
    fn test_below_lowest_is_out_of_range() {
        let err = classify(-0.5, &two_tiers()).unwrap_err();
        assert_eq!(
            err,
            EngineError::OutOfRange {
                score: -0.5,
                lowest: 0.0
            }
        );
    }

    #[test]
    fn test_empty_tiers_invalid_argument() {
        assert!(matches!(classify(50.0, &[]), Err(EngineError::InvalidArgument(_))));
    }

    #[test]
    fn test_unsorted_tiers_rejected() {
        let tiers = vec![Tier::new("A", "", 70.0, 100.0), Tier::new("B", "", 0.0, 70.0)];
        assert!(matches!(classify(50.0, &tiers), Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_gap_rejected() {
        let tiers = vec![Tier::new("B", "", 0.0, 60.0), Tier::new("A", "", 70.0, 100.0)];
        let err = validate_tiers(&tiers).unwrap_err();
        assert!(err.to_string().contains("gap"));
    }

    #[test]
    fn test_overlap_rejected() {
        let tiers = vec![Tier::new("B", "", 0.0, 75.0), Tier::new("A", "", 70.0, 100.0)];
        let err = validate_tiers(&tiers).unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let tiers = vec![Tier::new("X", "", 10.0, 10.0)];
        assert!(matches!(validate_tiers(&tiers), Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_default_tiers_valid() {
        let tiers = default_tiers();
        assert!(validate_tiers(&tiers).is_ok());
        assert_eq!(classify(95.0, &tiers).unwrap(), "S");
        assert_eq!(classify(80.0, &tiers).unwrap(), "A");
        assert_eq!(classify(59.9, &tiers).unwrap(), "D");
    }

    #[test]
    fn test_find_tier_passes_color_through() {
        let tiers = default_tiers();
        assert_eq!(find_tier(91.0, &tiers).unwrap().color, "#ef5350");
    }

    #[test]
    fn test_classify_rank_positions() {
        let tiers = default_tiers();
        assert_eq!(classify_rank(1, 10, &tiers).unwrap(), "S"); // 100
        assert_eq!(classify_rank(2, 10, &tiers).unwrap(), "S"); // 90
        assert_eq!(classify_rank(3, 10, &tiers).unwrap(), "A"); // 80
        assert_eq!(classify_rank(10, 10, &tiers).unwrap(), "D"); // 10
        assert!(classify_rank(0, 10, &tiers).is_err());
        assert!(classify_rank(11, 10, &tiers).is_err());
    }

    #[test]
    fn test_tier_counts() {
        let entry = |id: &str, tier: Option<&str>| RankEntry {
            subject_id: id.to_string(),
            rank: 1,
            composite: 0.0,
            tier: tier.map(str::to_string),
        };
        let entries = vec![entry("a", Some("S")), entry("b", Some("S")), entry("c", Some("D")), entry("d", None)];
        let counts = tier_counts(&entries, &default_tiers());
        assert_eq!(counts[0], ("D".to_string(), 1));
        assert_eq!(counts[4], ("S".to_string(), 2));
        assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), 3);
    }

    proptest! {
        #[test]
        fn classification_is_stable(score in 0.0f64..150.0) {
            let tiers = default_tiers();
            let snapshot = tiers.clone();
            let first = classify(score, &tiers).unwrap();
            let second = classify(score, &tiers).unwrap();
            prop_assert_eq!(first, second);
            prop_assert_eq!(tiers, snapshot);
        }
    }
}
