//! Detection policy.
//!
//! RULE: Detectors never read module-level thresholds.
//! Every bound they honour arrives through a DetectionConfig section,
//! so two analyses with different policies can run side by side.

use crate::{
    error::{AmlError, AmlResult},
    pattern::PatternKind,
};
use serde::{Deserialize, Serialize};

// ── Cycle search ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Shortest loop reported, in accounts. A→B→A has length 2.
    /// A loop of two accounts is still a cycle; raising this above 2 is a
    /// recall policy that drops back-and-forth pairs from the report.
    pub min_length: usize,
    /// Longest loop searched. Deeper paths are abandoned unreported.
    pub max_length: usize,
    /// Enumeration budget. Search stops once this many cycles are found.
    pub max_cycles: usize,
    /// Work budget: path extensions tried across the whole search. Bounds
    /// dense components that hold few loops but very many paths.
    pub max_search_steps: usize,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            min_length: 3,
            max_length: 8,
            max_cycles: 10_000,
            max_search_steps: 2_000_000,
        }
    }
}

// ── Shell chains ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// An account is a shell when both its distinct in- and out-degree
    /// are in 1..=max_degree.
    pub max_degree: usize,
    /// Shortest chain reported, in accounts (head and tail included).
    pub min_chain_length: usize,
    /// Longest chain followed before the walk is cut.
    pub max_chain_length: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            max_degree: 1,
            min_chain_length: 3,
            max_chain_length: 12,
        }
    }
}

// ── Smurfing ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmurfingConfig {
    /// Distinct senders into one receiver that trigger a finding.
    pub threshold_count: usize,
    /// Aggregate inbound amount that triggers a finding. None disables it.
    pub threshold_amount: Option<f64>,
}

impl Default for SmurfingConfig {
    fn default() -> Self {
        Self {
            threshold_count: 10,
            threshold_amount: None,
        }
    }
}

impl SmurfingConfig {
    pub fn is_triggered(&self, distinct_senders: usize, total_amount: f64) -> bool {
        distinct_senders >= self.threshold_count
            || self.threshold_amount.is_some_and(|t| total_amount >= t)
    }
}

// ── Scoring ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub cycle: f64,
    pub shell: f64,
    pub smurfing: f64,
    pub max_score: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            cycle: 40.0,
            shell: 30.0,
            smurfing: 30.0,
            max_score: 100.0,
        }
    }
}

impl ScoringWeights {
    pub fn weight(&self, kind: PatternKind) -> f64 {
        match kind {
            PatternKind::Cycle    => self.cycle,
            PatternKind::Shell    => self.shell,
            PatternKind::Smurfing => self.smurfing,
        }
    }
}

// ── Top level ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub cycle: CycleConfig,
    pub shell: ShellConfig,
    pub smurfing: SmurfingConfig,
    pub scoring: ScoringWeights,
    /// Run the detectors on scoped threads. Output is identical either way.
    pub parallel_detectors: bool,
}

impl DetectionConfig {
    /// Load from a JSON policy file. Missing sections take their defaults.
    /// In tests, use DetectionConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config = Self::from_json(&content)?;
        log::debug!("Loaded detection config from {path}");
        Ok(config)
    }

    pub fn from_json(content: &str) -> AmlResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject policy values no detector can honour.
    pub fn validate(&self) -> AmlResult<()> {
        if self.cycle.min_length < 2 {
            return Err(invalid("cycle.min_length", "must be at least 2"));
        }
        if self.cycle.max_length < self.cycle.min_length {
            return Err(invalid("cycle.max_length", "must not be below cycle.min_length"));
        }
        if self.cycle.max_cycles == 0 {
            return Err(invalid("cycle.max_cycles", "must be positive"));
        }
        if self.cycle.max_search_steps == 0 {
            return Err(invalid("cycle.max_search_steps", "must be positive"));
        }
        if self.shell.max_degree == 0 {
            return Err(invalid("shell.max_degree", "must be positive"));
        }
        if self.shell.min_chain_length < 3 {
            return Err(invalid("shell.min_chain_length", "must be at least 3"));
        }
        if self.shell.max_chain_length < self.shell.min_chain_length {
            return Err(invalid(
                "shell.max_chain_length",
                "must not be below shell.min_chain_length",
            ));
        }
        if self.smurfing.threshold_count == 0 {
            return Err(invalid("smurfing.threshold_count", "must be positive"));
        }
        if let Some(amount) = self.smurfing.threshold_amount {
            if !amount.is_finite() || amount <= 0.0 {
                return Err(invalid("smurfing.threshold_amount", "must be a positive amount"));
            }
        }
        for (field, weight) in [
            ("scoring.cycle", self.scoring.cycle),
            ("scoring.shell", self.scoring.shell),
            ("scoring.smurfing", self.scoring.smurfing),
            ("scoring.max_score", self.scoring.max_score),
        ] {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(invalid(field, "must be a positive finite number"));
            }
        }
        Ok(())
    }

    /// Config with small thresholds for hand-built fixtures.
    pub fn default_test() -> Self {
        Self {
            smurfing: SmurfingConfig {
                threshold_count: 5,
                threshold_amount: None,
            },
            ..Self::default()
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> AmlError {
    AmlError::InvalidConfig { field, reason: reason.to_string() }
}
