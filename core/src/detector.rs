//! Detector trait.
//!
//! RULE: Every pattern detector implements Detector.
//! Detectors read a shared, immutable DetectionInput and return their
//! own findings; no detector sees another detector's output.
//! Execution order is fixed and documented in engine.rs.

use crate::{
    error::AmlResult,
    graph::TransactionGraph,
    pattern::{Pattern, PatternKind},
    transaction::Transaction,
};

/// Read-only view handed to every detector in one analysis.
#[derive(Debug, Clone, Copy)]
pub struct DetectionInput<'a> {
    pub graph:        &'a TransactionGraph,
    pub transactions: &'a [Transaction],
}

/// Findings from one detector run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    pub patterns: Vec<Pattern>,
    /// Set when a search budget cut enumeration short. The patterns
    /// returned are still valid; recall is what suffered.
    pub truncated: Option<String>,
}

impl Detection {
    pub fn complete(patterns: Vec<Pattern>) -> Self {
        Self { patterns, truncated: None }
    }
}

/// The contract every detector must fulfill.
pub trait Detector: Send + Sync {
    /// Unique stable name for this detector.
    fn name(&self) -> &'static str;

    /// The single pattern type this detector emits.
    fn kind(&self) -> PatternKind;

    /// Run over one analysis input. Must be deterministic: identical
    /// input yields identical patterns in identical order.
    fn detect(&self, input: &DetectionInput<'_>) -> AmlResult<Detection>;
}
