//! Audit trail: the ordered record of one analysis.
//!
//! RULE: The engine is the only producer. Events carry no wall-clock data,
//! so the serialized trail is byte-identical across runs on identical input.

use crate::{
    pattern::PatternKind,
    types::AccountId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Every event recorded during an analysis.
/// Variants are only ever appended, never reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    GraphBuilt {
        accounts:       usize,
        transfers:      usize,
        self_transfers: usize,
    },
    DetectorCompleted {
        detector: String,
        patterns: usize,
    },
    SearchTruncated {
        detector: String,
        reason:   String,
    },
    PatternDetected {
        pattern_index: usize,
        pattern_type:  PatternKind,
        description:   String,
    },
    RingFormed {
        ring_id:  String,
        members:  Vec<AccountId>,
        patterns: Vec<usize>,
    },
    AccountScored {
        account_id: AccountId,
        score:      f64,
        patterns:   BTreeSet<PatternKind>,
    },
    AnalysisCompleted {
        suspicious_accounts: usize,
        rings:               usize,
    },
}

impl AnalysisEvent {
    /// Stable string name for each variant.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::GraphBuilt { .. }        => "graph_built",
            Self::DetectorCompleted { .. } => "detector_completed",
            Self::SearchTruncated { .. }   => "search_truncated",
            Self::PatternDetected { .. }   => "pattern_detected",
            Self::RingFormed { .. }        => "ring_formed",
            Self::AccountScored { .. }     => "account_scored",
            Self::AnalysisCompleted { .. } => "analysis_completed",
        }
    }
}
