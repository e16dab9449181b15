use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::tiers::{find_tier, validate_tiers};
use super::types::{RankEntry, SubjectScore, Tier};
use crate::error::Result;

/// Secondary ordering for subjects with equal composites
pub type TieBreak<'a> = &'a dyn Fn(&SubjectScore, &SubjectScore) -> Ordering;

/// Tie-break rules selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakRule {
    /// Ties share a rank (competition ranking)
    #[default]
    None,
    /// Earlier subjects (creation order) win ties
    InputOrder,
    /// Lexicographically smaller subject id wins ties
    SubjectId,
}

/// Order subjects by composite, highest first.
///
/// Without a tie-break, equal composites share a rank and the next distinct
/// composite skips the tied count (90, 90, 80 -> 1, 1, 3); tied subjects
/// keep their input order. With a tie-break every subject gets a unique
/// rank, and subjects the tie-break still considers equal keep input order.
///
/// The input is not touched; tiers are left unassigned.
pub fn rank(subjects: &[SubjectScore], tie_break: Option<TieBreak>) -> Vec<RankEntry> {
    let mut order: Vec<&SubjectScore> = subjects.iter().collect();

    // sort_by is stable, so equal keys keep input order
    order.sort_by(|a, b| {
        let by_score = b.composite().total_cmp(&a.composite());
        match (by_score, tie_break) {
            (Ordering::Equal, Some(tb)) => tb(*a, *b),
            (ord, _) => ord,
        }
    });

    let mut entries: Vec<RankEntry> = Vec::with_capacity(order.len());
    for (pos, subject) in order.into_iter().enumerate() {
        let rank = match entries.last() {
            Some(prev) if tie_break.is_none() && prev.composite == subject.composite() => prev.rank,
            _ => pos + 1,
        };
        entries.push(RankEntry {
            subject_id: subject.subject_id().to_string(),
            rank,
            composite: subject.composite(),
            tier: None,
        });
    }

    entries
}

/// Rank using a configured rule.
pub fn rank_with_rule(subjects: &[SubjectScore], rule: TieBreakRule) -> Vec<RankEntry> {
    let input_order: TieBreak = &|_: &SubjectScore, _: &SubjectScore| Ordering::Equal;
    let by_id: TieBreak = &|a: &SubjectScore, b: &SubjectScore| a.subject_id().cmp(b.subject_id());

    match rule {
        TieBreakRule::None => rank(subjects, None),
        TieBreakRule::InputOrder => rank(subjects, Some(input_order)),
        TieBreakRule::SubjectId => rank(subjects, Some(by_id)),
    }
}

/// Label every entry with the tier holding its composite.
///
/// All-or-nothing: if any entry cannot be classified, no entry is changed.
pub fn assign_tiers(entries: &mut [RankEntry], tiers: &[Tier]) -> Result<()> {
    validate_tiers(tiers)?;

    let labels = entries
        .iter()
        .map(|e| find_tier(e.composite, tiers).map(|t| t.label.clone()))
        .collect::<Result<Vec<_>>>()?;

    for (entry, label) in entries.iter_mut().zip(labels) {
        entry.tier = Some(label);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::tiers::default_tiers;
    use crate::scoring::FactorScore;
    use proptest::prelude::*;

    fn subject(id: &str, composite: f64) -> SubjectScore {
        SubjectScore::new(id, vec![FactorScore::new("overall", composite, 1.0)]).unwrap()
    }

    fn ranks(entries: &[RankEntry]) -> Vec<usize> {
        entries.iter().map(|e| e.rank).collect()
    }

    fn ids(entries: &[RankEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.subject_id.as_str()).collect()
    }

    #[test]
    fn test_competition_ranking() {
        let subjects = vec![subject("a", 90.0), subject("b", 90.0), subject("c", 80.0)];
        let entries = rank(&subjects, None);
        assert_eq!(ranks(&entries), vec![1, 1, 3]);
        assert_eq!(ids(&entries), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sorted_descending() {
        let subjects = vec![subject("low", 10.0), subject("high", 99.0), subject("mid", 50.0)];
        let entries = rank(&subjects, None);
        assert_eq!(ids(&entries), vec!["high", "mid", "low"]);
        assert_eq!(ranks(&entries), vec![1, 2, 3]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let subjects = vec![subject("z", 70.0), subject("y", 80.0), subject("x", 70.0)];
        let entries = rank(&subjects, None);
        assert_eq!(ids(&entries), vec!["y", "z", "x"]);
        assert_eq!(ranks(&entries), vec![1, 2, 2]);
    }

    #[test]
    fn test_tie_break_gives_unique_ranks() {
        let subjects = vec![subject("b", 90.0), subject("a", 90.0), subject("c", 80.0)];
        let entries = rank_with_rule(&subjects, TieBreakRule::SubjectId);
        assert_eq!(ids(&entries), vec!["a", "b", "c"]);
        assert_eq!(ranks(&entries), vec![1, 2, 3]);
    }

    #[test]
    fn test_input_order_tie_break() {
        let subjects = vec![subject("b", 90.0), subject("a", 90.0)];
        let entries = rank_with_rule(&subjects, TieBreakRule::InputOrder);
        assert_eq!(ids(&entries), vec!["b", "a"]);
        assert_eq!(ranks(&entries), vec![1, 2]);
    }

    #[test]
    fn test_empty_input() {
        assert!(rank(&[], None).is_empty());
    }

    #[test]
    fn test_single_subject() {
        let entries = rank(&[subject("solo", 42.0)], None);
        assert_eq!(ranks(&entries), vec![1]);
    }

    #[test]
    fn test_input_not_mutated() {
        let subjects = vec![subject("a", 10.0), subject("b", 20.0)];
        let snapshot = subjects.clone();
        let _ = rank(&subjects, None);
        assert_eq!(subjects, snapshot);
    }

    #[test]
    fn test_assign_tiers() {
        let subjects = vec![subject("a", 95.0), subject("b", 72.0)];
        let mut entries = rank(&subjects, None);
        assign_tiers(&mut entries, &default_tiers()).unwrap();
        assert_eq!(entries[0].tier.as_deref(), Some("S"));
        assert_eq!(entries[1].tier.as_deref(), Some("B"));
    }

    #[test]
    fn test_assign_tiers_all_or_nothing() {
        let subjects = vec![subject("a", 95.0), subject("b", -3.0)];
        let mut entries = rank(&subjects, None);
        assert!(assign_tiers(&mut entries, &default_tiers()).is_err());
        assert!(entries.iter().all(|e| e.tier.is_none()));
    }

    proptest! {
        #[test]
        fn ranking_is_deterministic(scores in prop::collection::vec(0u8..10, 0..30)) {
            let subjects: Vec<SubjectScore> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| subject(&format!("s{}", i), *s as f64))
                .collect();
            let first = rank(&subjects, None);
            let second = rank(&subjects, None);
            prop_assert_eq!(&first, &second);

            for pair in first.windows(2) {
                prop_assert!(pair[0].composite >= pair[1].composite);
                prop_assert!(pair[0].rank <= pair[1].rank);
                if pair[0].composite == pair[1].composite {
                    prop_assert_eq!(pair[0].rank, pair[1].rank);
                }
            }
        }

        #[test]
        fn subject_id_tie_break_is_deterministic(scores in prop::collection::vec(0u8..5, 0..30)) {
            let subjects: Vec<SubjectScore> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| subject(&format!("s{:02}", i), *s as f64))
                .collect();
            let first = rank_with_rule(&subjects, TieBreakRule::SubjectId);
            prop_assert_eq!(&first, &rank_with_rule(&subjects, TieBreakRule::SubjectId));

            // Unique ids make the order independent of input order
            let reversed: Vec<SubjectScore> = subjects.iter().rev().cloned().collect();
            prop_assert_eq!(&first, &rank_with_rule(&reversed, TieBreakRule::SubjectId));

            for (i, entry) in first.iter().enumerate() {
                prop_assert_eq!(entry.rank, i + 1);
            }
            for pair in first.windows(2) {
                prop_assert!(pair[0].composite >= pair[1].composite);
                if pair[0].composite == pair[1].composite {
                    prop_assert!(pair[0].subject_id < pair[1].subject_id);
                }
            }
        }
    }
}
