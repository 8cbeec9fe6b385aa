//! Detected suspicious structures.
//!
//! Patterns are value objects: produced once by a detector, never mutated.
//! Every pattern keeps the evidence an analyst needs to see why it fired.

use crate::types::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Pattern-type tag. Ordering is cycle < shell < smurfing and is used
/// wherever tags are emitted, so it must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Cycle,
    Shell,
    Smurfing,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cycle    => "cycle",
            Self::Shell    => "shell",
            Self::Smurfing => "smurfing",
        }
    }

    /// Cycle and shell findings describe fund topology and form rings.
    /// Smurfing is receiver-centric evidence attached to one account.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::Smurfing)
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All transfers from one account to the next along a detected structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hop {
    pub from:           AccountId,
    pub to:             AccountId,
    pub transfer_count: usize,
    pub amount:         f64,
}

/// Closed loop A→B→…→A, stored from its canonical start
/// (the lexicographically smallest account id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CyclePattern {
    pub accounts:     Vec<AccountId>,
    pub hops:         Vec<Hop>,
    pub total_amount: f64,
}

/// Open path whose intermediate accounts are pass-through shells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellChainPattern {
    pub accounts:     Vec<AccountId>,
    pub hops:         Vec<Hop>,
    pub total_amount: f64,
}

/// Fan-in funnel: many senders into one receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmurfingPattern {
    pub receiver:       AccountId,
    /// Distinct senders, sorted by id.
    pub senders:        Vec<AccountId>,
    pub transfer_count: usize,
    pub total_amount:   f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern_type", rename_all = "snake_case")]
pub enum Pattern {
    Cycle(CyclePattern),
    #[serde(rename = "shell")]
    ShellChain(ShellChainPattern),
    Smurfing(SmurfingPattern),
}

impl Pattern {
    pub fn kind(&self) -> PatternKind {
        match self {
            Self::Cycle(_)      => PatternKind::Cycle,
            Self::ShellChain(_) => PatternKind::Shell,
            Self::Smurfing(_)   => PatternKind::Smurfing,
        }
    }

    /// Every account the pattern touches, unordered. Used for ring merging.
    pub fn membership(&self) -> BTreeSet<&str> {
        match self {
            Self::Cycle(c)      => c.accounts.iter().map(String::as_str).collect(),
            Self::ShellChain(s) => s.accounts.iter().map(String::as_str).collect(),
            Self::Smurfing(s)   => std::iter::once(s.receiver.as_str())
                .chain(s.senders.iter().map(String::as_str))
                .collect(),
        }
    }

    /// Accounts that receive this pattern's tag. A smurfing finding
    /// flags only its receiver; the senders are evidence, not suspects.
    pub fn flagged_accounts(&self) -> Vec<&str> {
        match self {
            Self::Cycle(c)      => c.accounts.iter().map(String::as_str).collect(),
            Self::ShellChain(s) => s.accounts.iter().map(String::as_str).collect(),
            Self::Smurfing(s)   => vec![s.receiver.as_str()],
        }
    }

    /// Ordered account path for structural patterns; empty for smurfing.
    pub fn path(&self) -> &[AccountId] {
        match self {
            Self::Cycle(c)      => &c.accounts,
            Self::ShellChain(s) => &s.accounts,
            Self::Smurfing(_)   => &[],
        }
    }

    pub fn total_amount(&self) -> f64 {
        match self {
            Self::Cycle(c)      => c.total_amount,
            Self::ShellChain(s) => s.total_amount,
            Self::Smurfing(s)   => s.total_amount,
        }
    }

    /// One-line human-readable account of the finding.
    pub fn describe(&self) -> String {
        match self {
            Self::Cycle(c) => {
                let first = c.accounts.first().map(String::as_str).unwrap_or_default();
                format!("cycle {} -> {first}", c.accounts.join(" -> "))
            }
            Self::ShellChain(s) => format!(
                "shell chain {} ({} pass-through accounts)",
                s.accounts.join(" -> "),
                s.accounts.len().saturating_sub(2)
            ),
            Self::Smurfing(s) => format!(
                "smurfing into {} from {} senders ({} transfers, total {:.2})",
                s.receiver,
                s.senders.len(),
                s.transfer_count,
                s.total_amount
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(ids: &[&str]) -> Pattern {
        Pattern::Cycle(CyclePattern {
            accounts:     ids.iter().map(|s| s.to_string()).collect(),
            hops:         Vec::new(),
            total_amount: 0.0,
        })
    }

    #[test]
    fn smurfing_flags_only_the_receiver() {
        let p = Pattern::Smurfing(SmurfingPattern {
            receiver:       "E".into(),
            senders:        vec!["D".into(), "F".into()],
            transfer_count: 2,
            total_amount:   100.0,
        });
        assert_eq!(p.flagged_accounts(), vec!["E"]);
        assert_eq!(p.membership().into_iter().collect::<Vec<_>>(), vec!["D", "E", "F"]);
        assert!(p.path().is_empty());
    }

    #[test]
    fn kind_tags_serialize_as_plain_strings() {
        let tags: BTreeSet<PatternKind> =
            [PatternKind::Smurfing, PatternKind::Cycle, PatternKind::Shell].into_iter().collect();
        assert_eq!(
            serde_json::to_string(&tags).unwrap(),
            r#"["cycle","shell","smurfing"]"#
        );
    }

    #[test]
    fn pattern_serializes_with_type_tag() {
        let json = serde_json::to_value(cycle(&["A", "B", "C"])).unwrap();
        assert_eq!(json["pattern_type"], "cycle");
        assert_eq!(json["accounts"][2], "C");
    }

    #[test]
    fn describe_closes_the_loop() {
        assert_eq!(cycle(&["A", "B", "C"]).describe(), "cycle A -> B -> C -> A");
    }
}
