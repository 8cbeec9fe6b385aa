//! MuleCatcher core: deterministic, explainable AML pattern detection.
//!
//! One call turns a batch of validated transactions into cycle, shell-chain
//! and smurfing findings, merges structural findings into rings, and scores
//! every flagged account from the pattern types it took part in.
//!
//! RULE: The core is a pure function of its input. No I/O, no globals,
//! no clocks, no randomness on the analysis path.

pub mod config;
pub mod cycle_detector;
pub mod detector;
pub mod engine;
pub mod error;
pub mod event;
pub mod graph;
pub mod pattern;
pub mod ring_merger;
pub mod scc;
pub mod scoring;
pub mod shell_detector;
pub mod smurfing_detector;
pub mod synthetic;
pub mod transaction;
pub mod types;
pub mod union_find;

pub use config::DetectionConfig;
pub use engine::{analyze, Analysis, AnalysisEngine};
pub use error::{AmlError, AmlResult};
pub use pattern::{Pattern, PatternKind};
pub use transaction::Transaction;
