//! The analysis engine: one pure pass from rows to a ranked report.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Graph builder        (rows → TransactionGraph, invariants checked)
//!   2. Cycle detector       (graph)
//!   3. Shell chain detector (graph)
//!   4. Smurfing detector    (raw rows)
//!   5. Ring merger          (cycle + shell patterns)
//!   6. Account scorer       (all patterns, rings)
//!
//! RULES:
//!   - Steps 2–4 share nothing but the read-only input and may run in
//!     parallel; their output is always concatenated in registration order.
//!   - Steps 5–6 start only after every detector has finished.
//!   - Nothing outlives the call: no caches, no globals, no I/O.
//!   - "No findings" is an empty Analysis, never an error.

use crate::{
    config::DetectionConfig,
    cycle_detector::CycleDetector,
    detector::{Detection, DetectionInput, Detector},
    error::{AmlError, AmlResult},
    event::AnalysisEvent,
    graph::{GraphStats, TransactionGraph},
    pattern::{Pattern, PatternKind},
    ring_merger::{merge_rings, Ring},
    scoring::{apply_ring_risk, score_accounts, ScoredAccount},
    shell_detector::ShellChainDetector,
    smurfing_detector::SmurfingDetector,
    transaction::Transaction,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_accounts:      usize,
    pub total_transactions:  usize,
    pub cycles:              usize,
    pub shell_chains:        usize,
    pub smurfing_funnels:    usize,
    pub rings:               usize,
    pub suspicious_accounts: usize,
}

/// Everything one analysis produced. Owns its patterns; rings and audit
/// events refer to patterns by index into `patterns`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub graph:               GraphStats,
    pub patterns:            Vec<Pattern>,
    pub rings:               Vec<Ring>,
    pub suspicious_accounts: Vec<ScoredAccount>,
    pub summary:             AnalysisSummary,
    pub audit_trail:         Vec<AnalysisEvent>,
}

impl Analysis {
    pub fn patterns_of(&self, kind: PatternKind) -> impl Iterator<Item = &Pattern> + '_ {
        self.patterns.iter().filter(move |p| p.kind() == kind)
    }

    pub fn account(&self, account_id: &str) -> Option<&ScoredAccount> {
        self.suspicious_accounts.iter().find(|a| a.account_id == account_id)
    }

    pub fn ring(&self, ring_id: &str) -> Option<&Ring> {
        self.rings.iter().find(|r| r.ring_id == ring_id)
    }

    pub fn to_json(&self) -> AmlResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

pub struct AnalysisEngine {
    config:    DetectionConfig,
    detectors: Vec<Box<dyn Detector>>,
}

impl AnalysisEngine {
    /// An engine with no detectors. Validates the policy.
    pub fn new(config: DetectionConfig) -> AmlResult<Self> {
        config.validate()?;
        Ok(Self { config, detectors: Vec::new() })
    }

    /// Build a fully wired engine with all detectors registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(config: DetectionConfig) -> AmlResult<Self> {
        let mut engine = Self::new(config)?;
        // EXECUTION ORDER: fixed, documented, never reordered.
        engine.register(Box::new(CycleDetector::new(engine.config.cycle.clone())));
        engine.register(Box::new(ShellChainDetector::new(engine.config.shell.clone())));
        engine.register(Box::new(SmurfingDetector::new(engine.config.smurfing.clone())));
        Ok(engine)
    }

    /// Register a detector. Call in the documented execution order.
    pub fn register(&mut self, detector: Box<dyn Detector>) {
        self.detectors.push(detector);
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Run the whole pipeline over one dataset.
    pub fn analyze(&self, transactions: &[Transaction]) -> AmlResult<Analysis> {
        let mut audit = Vec::new();

        let graph = TransactionGraph::build(transactions);
        graph.check_invariants()?;
        let stats = graph.stats();
        audit.push(AnalysisEvent::GraphBuilt {
            accounts:       stats.accounts,
            transfers:      stats.transfers,
            self_transfers: stats.self_transfers,
        });

        let input = DetectionInput { graph: &graph, transactions };
        let detections = self.run_detectors(&input)?;

        let mut patterns: Vec<Pattern> = Vec::new();
        for (detector, detection) in self.detectors.iter().zip(detections) {
            if let Some(reason) = detection.truncated {
                audit.push(AnalysisEvent::SearchTruncated {
                    detector: detector.name().to_string(),
                    reason,
                });
            }
            audit.push(AnalysisEvent::DetectorCompleted {
                detector: detector.name().to_string(),
                patterns: detection.patterns.len(),
            });
            for pattern in detection.patterns {
                verify_pattern(&graph, detector.as_ref(), &pattern)?;
                audit.push(AnalysisEvent::PatternDetected {
                    pattern_index: patterns.len(),
                    pattern_type:  pattern.kind(),
                    description:   pattern.describe(),
                });
                patterns.push(pattern);
            }
        }

        let mut rings = merge_rings(&patterns);
        let suspicious_accounts = score_accounts(&patterns, &rings, &self.config.scoring);
        apply_ring_risk(&mut rings, &suspicious_accounts);

        for ring in &rings {
            audit.push(AnalysisEvent::RingFormed {
                ring_id:  ring.ring_id.clone(),
                members:  ring.members.clone(),
                patterns: ring.pattern_indices.clone(),
            });
        }
        for account in &suspicious_accounts {
            audit.push(AnalysisEvent::AccountScored {
                account_id: account.account_id.clone(),
                score:      account.suspicion_score,
                patterns:   account.detected_patterns.clone(),
            });
        }

        let count = |kind: PatternKind| patterns.iter().filter(|p| p.kind() == kind).count();
        let summary = AnalysisSummary {
            total_accounts:      stats.accounts,
            total_transactions:  stats.transfers,
            cycles:              count(PatternKind::Cycle),
            shell_chains:        count(PatternKind::Shell),
            smurfing_funnels:    count(PatternKind::Smurfing),
            rings:               rings.len(),
            suspicious_accounts: suspicious_accounts.len(),
        };
        audit.push(AnalysisEvent::AnalysisCompleted {
            suspicious_accounts: summary.suspicious_accounts,
            rings:               summary.rings,
        });

        log::info!(
            "Analysis complete: {} accounts, {} transactions, {} cycles, {} shell chains, {} funnels, {} rings, {} flagged",
            summary.total_accounts,
            summary.total_transactions,
            summary.cycles,
            summary.shell_chains,
            summary.smurfing_funnels,
            summary.rings,
            summary.suspicious_accounts
        );

        Ok(Analysis {
            graph: stats,
            patterns,
            rings,
            suspicious_accounts,
            summary,
            audit_trail: audit,
        })
    }

    fn run_detectors(&self, input: &DetectionInput<'_>) -> AmlResult<Vec<Detection>> {
        if !self.config.parallel_detectors {
            return self.detectors.iter().map(|d| d.detect(input)).collect();
        }

        std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .detectors
                .iter()
                .map(|detector| scope.spawn(move || detector.detect(input)))
                .collect();
            handles
                .into_iter()
                .zip(&self.detectors)
                .map(|(handle, detector)| {
                    handle.join().map_err(|_| {
                        AmlError::invariant(format!("detector '{}' panicked", detector.name()))
                    })?
                })
                .collect()
        })
    }
}

/// Convenience: build a fully wired engine and run it once.
pub fn analyze(transactions: &[Transaction], config: &DetectionConfig) -> AmlResult<Analysis> {
    AnalysisEngine::build(config.clone())?.analyze(transactions)
}

/// A detector may only emit its own pattern type, and a structural pattern
/// may only name accounts present in the graph.
fn verify_pattern(graph: &TransactionGraph, detector: &dyn Detector, pattern: &Pattern) -> AmlResult<()> {
    if pattern.kind() != detector.kind() {
        return Err(AmlError::invariant(format!(
            "detector '{}' emitted a {} pattern",
            detector.name(),
            pattern.kind()
        )));
    }
    for account in pattern.membership() {
        if !graph.contains(account) {
            return Err(AmlError::invariant(format!(
                "{} pattern references account '{account}' absent from the graph",
                pattern.kind()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::SmurfingPattern;
    use chrono::NaiveDate;

    /// Emits a fixed smurfing finding while claiming some other kind.
    struct Rogue {
        kind:     PatternKind,
        receiver: &'static str,
    }

    impl Detector for Rogue {
        fn name(&self) -> &'static str {
            "rogue"
        }

        fn kind(&self) -> PatternKind {
            self.kind
        }

        fn detect(&self, _input: &DetectionInput<'_>) -> AmlResult<Detection> {
            Ok(Detection::complete(vec![Pattern::Smurfing(SmurfingPattern {
                receiver:       self.receiver.to_string(),
                senders:        vec!["A".into()],
                transfer_count: 1,
                total_amount:   1.0,
            })]))
        }
    }

    fn rows() -> Vec<Transaction> {
        let ts = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        vec![Transaction::new("T1", "A", "B", 1.0, ts)]
    }

    #[test]
    fn build_registers_detectors_in_order() {
        let engine = AnalysisEngine::build(DetectionConfig::default()).unwrap();
        assert_eq!(engine.detector_names(), vec!["cycle", "shell_chain", "smurfing"]);
    }

    #[test]
    fn wrong_pattern_kind_is_an_internal_error() {
        let mut engine = AnalysisEngine::new(DetectionConfig::default()).unwrap();
        engine.register(Box::new(Rogue { kind: PatternKind::Cycle, receiver: "B" }));
        let err = engine.analyze(&rows()).unwrap_err();
        assert!(err.is_internal(), "{err}");
    }

    #[test]
    fn unknown_account_is_an_internal_error() {
        let mut engine = AnalysisEngine::new(DetectionConfig::default()).unwrap();
        engine.register(Box::new(Rogue { kind: PatternKind::Smurfing, receiver: "ZZZ" }));
        let err = engine.analyze(&rows()).unwrap_err();
        assert!(matches!(err, AmlError::InvariantViolation { .. }), "{err}");
    }

    #[test]
    fn engine_with_no_detectors_reports_nothing() {
        let engine = AnalysisEngine::new(DetectionConfig::default()).unwrap();
        let analysis = engine.analyze(&rows()).unwrap();
        assert_eq!(analysis.summary.total_accounts, 2);
        assert!(analysis.suspicious_accounts.is_empty());
        assert_eq!(analysis.audit_trail.len(), 2);
    }
}
