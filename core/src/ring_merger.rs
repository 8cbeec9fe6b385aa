//! Ring merger: consolidates overlapping structural findings.
//!
//! RULES:
//!   - Only cycle and shell patterns form rings. Smurfing stays an
//!     account-level evidence class and is never merged here.
//!   - Patterns sharing any account, directly or through a chain of other
//!     patterns, end up in the same ring.
//!   - Rings reference patterns by their index in the analysis pattern
//!     list; they never own pattern data.
//!   - Ring order is the detection order of each ring's first pattern.
//!     Members are sorted by account id.

use crate::{
    pattern::{Pattern, PatternKind},
    types::AccountId,
    union_find::UnionFind,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    pub ring_id:         String,
    pub members:         Vec<AccountId>,
    /// Indices into the pattern list the ring was merged from, ascending.
    pub pattern_indices: Vec<usize>,
    pub pattern_types:   BTreeSet<PatternKind>,
    /// Highest suspicion score among members. Filled in by scoring.
    pub risk_score:      f64,
}

impl Ring {
    pub fn contains(&self, account_id: &str) -> bool {
        self.members
            .binary_search_by(|m| m.as_str().cmp(account_id))
            .is_ok()
    }

    /// The constituent patterns, resolved against the list they index.
    pub fn patterns<'a>(&'a self, all: &'a [Pattern]) -> impl Iterator<Item = &'a Pattern> + 'a {
        self.pattern_indices.iter().filter_map(move |&i| all.get(i))
    }
}

pub fn ring_id(position: usize) -> String {
    format!("RING_{:03}", position + 1)
}

/// Union-find over every account touched by a structural pattern.
pub fn merge_rings(patterns: &[Pattern]) -> Vec<Ring> {
    let structural: Vec<(usize, &Pattern)> = patterns
        .iter()
        .enumerate()
        .filter(|(_, p)| p.kind().is_structural())
        .collect();

    let ids: Vec<&str> = structural
        .iter()
        .flat_map(|(_, p)| p.membership())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let slot: BTreeMap<&str, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    let mut uf = UnionFind::new(ids.len());
    for (_, pattern) in &structural {
        let members: Vec<usize> = pattern.membership().iter().map(|id| slot[id]).collect();
        for pair in members.windows(2) {
            uf.union(pair[0], pair[1]);
        }
    }

    let groups = uf.groups();
    let mut group_of = vec![0usize; ids.len()];
    for (g, members) in groups.iter().enumerate() {
        for &m in members {
            group_of[m] = g;
        }
    }

    // (group, pattern indices) in first-detection order.
    let mut ring_of_group: Vec<Option<usize>> = vec![None; groups.len()];
    let mut assembled: Vec<(usize, Vec<usize>)> = Vec::new();
    for (pattern_idx, pattern) in &structural {
        let Some(first) = pattern.membership().into_iter().next() else {
            continue;
        };
        let g = group_of[slot[first]];
        let r = *ring_of_group[g].get_or_insert_with(|| {
            assembled.push((g, Vec::new()));
            assembled.len() - 1
        });
        assembled[r].1.push(*pattern_idx);
    }

    let rings: Vec<Ring> = assembled
        .into_iter()
        .enumerate()
        .map(|(position, (g, pattern_indices))| Ring {
            ring_id: ring_id(position),
            members: groups[g].iter().map(|&m| ids[m].to_string()).collect(),
            pattern_types: pattern_indices.iter().map(|&i| patterns[i].kind()).collect(),
            pattern_indices,
            risk_score: 0.0,
        })
        .collect();

    log::debug!(
        "Merged {} structural patterns into {} rings",
        structural.len(),
        rings.len()
    );
    rings
}
