//! The JSON report written by `analyze`.
//!
//! Field names follow the downstream investigation dashboard's contract.

use mulecatcher_core::{pattern::PatternKind, Analysis};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Serialize)]
pub struct Report {
    pub suspicious_accounts: Vec<AccountEntry>,
    pub fraud_rings:         Vec<RingEntry>,
    pub summary:             Summary,
    pub analysis_id:         String,
}

#[derive(Debug, Serialize)]
pub struct AccountEntry {
    pub account_id:        String,
    pub suspicion_score:   f64,
    pub detected_patterns: BTreeSet<PatternKind>,
    pub ring_id:           Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RingEntry {
    pub ring_id:         String,
    pub member_accounts: Vec<String>,
    pub pattern_types:   BTreeSet<PatternKind>,
    pub risk_score:      f64,
    pub patterns:        Vec<RingPattern>,
}

#[derive(Debug, Serialize)]
pub struct RingPattern {
    pub pattern_type: PatternKind,
    pub accounts:     Vec<String>,
    pub description:  String,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub total_accounts_analyzed:     usize,
    pub total_transactions:          usize,
    pub suspicious_accounts_flagged: usize,
    pub fraud_rings_detected:        usize,
    pub cycles_detected:             usize,
    pub shell_chains_detected:       usize,
    pub smurfing_funnels_detected:   usize,
    pub processing_time_seconds:     f64,
}

impl Report {
    pub fn from_analysis(analysis: &Analysis, processing_time_seconds: f64, analysis_id: String) -> Self {
        let suspicious_accounts = analysis
            .suspicious_accounts
            .iter()
            .map(|a| AccountEntry {
                account_id:        a.account_id.clone(),
                suspicion_score:   a.suspicion_score,
                detected_patterns: a.detected_patterns.clone(),
                ring_id:           a.ring_id.clone(),
            })
            .collect();

        let fraud_rings = analysis
            .rings
            .iter()
            .map(|ring| RingEntry {
                ring_id:         ring.ring_id.clone(),
                member_accounts: ring.members.clone(),
                pattern_types:   ring.pattern_types.clone(),
                risk_score:      ring.risk_score,
                patterns:        ring
                    .patterns(&analysis.patterns)
                    .map(|p| RingPattern {
                        pattern_type: p.kind(),
                        accounts:     p.path().to_vec(),
                        description:  p.describe(),
                    })
                    .collect(),
            })
            .collect();

        let s = &analysis.summary;
        Self {
            suspicious_accounts,
            fraud_rings,
            summary: Summary {
                total_accounts_analyzed:     s.total_accounts,
                total_transactions:          s.total_transactions,
                suspicious_accounts_flagged: s.suspicious_accounts,
                fraud_rings_detected:        s.rings,
                cycles_detected:             s.cycles,
                shell_chains_detected:       s.shell_chains,
                smurfing_funnels_detected:   s.smurfing_funnels,
                // Rounded so repeated runs diff cleanly.
                processing_time_seconds:     (processing_time_seconds * 1000.0).round() / 1000.0,
            },
            analysis_id,
        }
    }
}
