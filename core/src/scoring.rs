//! Account scorer.
//!
//! RULES:
//!   - A score is a pure function of the account's set of pattern types:
//!     the sum of the configured weight of each distinct type, capped at
//!     max_score. No averages, no history, no randomness.
//!   - Every scored account carries the exact tag set that produced it.
//!   - Output order: score descending, then account id ascending.

use crate::{
    config::ScoringWeights,
    pattern::{Pattern, PatternKind},
    ring_merger::Ring,
    types::AccountId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredAccount {
    pub account_id:        AccountId,
    pub suspicion_score:   f64,
    pub detected_patterns: BTreeSet<PatternKind>,
    /// The structural ring this account belongs to, if any.
    pub ring_id:           Option<String>,
}

pub fn score_account(tags: &BTreeSet<PatternKind>, weights: &ScoringWeights) -> f64 {
    let raw: f64 = tags.iter().map(|&kind| weights.weight(kind)).sum();
    raw.min(weights.max_score)
}

/// Per-account tag sets across every pattern, keyed by account id.
pub fn collect_account_tags(patterns: &[Pattern]) -> BTreeMap<&str, BTreeSet<PatternKind>> {
    let mut tags: BTreeMap<&str, BTreeSet<PatternKind>> = BTreeMap::new();
    for pattern in patterns {
        for account in pattern.flagged_accounts() {
            tags.entry(account).or_default().insert(pattern.kind());
        }
    }
    tags
}

pub fn score_accounts(
    patterns: &[Pattern],
    rings: &[Ring],
    weights: &ScoringWeights,
) -> Vec<ScoredAccount> {
    let ring_of: BTreeMap<&str, &str> = rings
        .iter()
        .flat_map(|r| r.members.iter().map(move |m| (m.as_str(), r.ring_id.as_str())))
        .collect();

    let mut scored: Vec<ScoredAccount> = collect_account_tags(patterns)
        .into_iter()
        .map(|(account, tags)| ScoredAccount {
            account_id:        account.to_string(),
            suspicion_score:   score_account(&tags, weights),
            detected_patterns: tags,
            ring_id:           ring_of.get(account).map(|r| r.to_string()),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.suspicion_score
            .total_cmp(&a.suspicion_score)
            .then_with(|| a.account_id.cmp(&b.account_id))
    });
    scored
}

/// Set each ring's risk to the highest score among its members.
pub fn apply_ring_risk(rings: &mut [Ring], accounts: &[ScoredAccount]) {
    let score_of: BTreeMap<&str, f64> = accounts
        .iter()
        .map(|a| (a.account_id.as_str(), a.suspicion_score))
        .collect();
    for ring in rings.iter_mut() {
        ring.risk_score = ring
            .members
            .iter()
            .filter_map(|m| score_of.get(m.as_str()).copied())
            .fold(0.0, f64::max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{CyclePattern, SmurfingPattern};

    fn tags(kinds: &[PatternKind]) -> BTreeSet<PatternKind> {
        kinds.iter().copied().collect()
    }

    #[test]
    fn more_pattern_types_score_strictly_higher() {
        let w = ScoringWeights::default();
        let cycle = score_account(&tags(&[PatternKind::Cycle]), &w);
        let both = score_account(&tags(&[PatternKind::Cycle, PatternKind::Shell]), &w);
        let all = score_account(
            &tags(&[PatternKind::Cycle, PatternKind::Shell, PatternKind::Smurfing]),
            &w,
        );
        assert!(both > cycle);
        assert!(all > both);
        assert_eq!(all, 100.0);
    }

    #[test]
    fn tag_order_is_irrelevant() {
        let w = ScoringWeights::default();
        assert_eq!(
            score_account(&tags(&[PatternKind::Shell, PatternKind::Cycle]), &w),
            score_account(&tags(&[PatternKind::Cycle, PatternKind::Shell]), &w)
        );
    }

    #[test]
    fn cap_is_applied() {
        let w = ScoringWeights { cycle: 80.0, shell: 80.0, smurfing: 10.0, max_score: 100.0 };
        assert_eq!(score_account(&tags(&[PatternKind::Cycle, PatternKind::Shell]), &w), 100.0);
        assert_eq!(score_account(&BTreeSet::new(), &w), 0.0);
    }

    #[test]
    fn ranked_by_score_then_id() {
        let patterns = vec![
            Pattern::Smurfing(SmurfingPattern {
                receiver:       "E".into(),
                senders:        vec!["D".into()],
                transfer_count: 1,
                total_amount:   50.0,
            }),
            Pattern::Cycle(CyclePattern {
                accounts:     vec!["B".into(), "E".into(), "C".into()],
                hops:         Vec::new(),
                total_amount: 0.0,
            }),
        ];
        let scored = score_accounts(&patterns, &[], &ScoringWeights::default());
        let order: Vec<_> = scored.iter().map(|s| (s.account_id.as_str(), s.suspicion_score)).collect();
        assert_eq!(order, vec![("E", 70.0), ("B", 40.0), ("C", 40.0)]);
        assert!(scored.iter().all(|s| s.account_id != "D"));
        assert_eq!(scored[0].detected_patterns, tags(&[PatternKind::Cycle, PatternKind::Smurfing]));
    }
}
