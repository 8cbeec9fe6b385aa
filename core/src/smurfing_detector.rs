//! Smurfing detector: fan-in funnels.
//!
//! Row aggregation, not graph traversal: transactions are grouped by
//! receiver and each receiver's distinct senders, transfer count and total
//! inbound amount are compared against policy. The dataset's own time span
//! is the only window.
//!
//! Self-transfers are not fan-in and are skipped. A receiver may also sit
//! in cycles or shell chains; that overlap is resolved by scoring, not here.

use crate::{
    config::SmurfingConfig,
    detector::{Detection, DetectionInput, Detector},
    error::AmlResult,
    pattern::{Pattern, PatternKind, SmurfingPattern},
    transaction::Transaction,
};
use std::collections::{BTreeMap, BTreeSet};

pub struct SmurfingDetector {
    config: SmurfingConfig,
}

impl SmurfingDetector {
    pub fn new(config: SmurfingConfig) -> Self {
        Self { config }
    }
}

impl Detector for SmurfingDetector {
    fn name(&self) -> &'static str {
        "smurfing"
    }

    fn kind(&self) -> PatternKind {
        PatternKind::Smurfing
    }

    fn detect(&self, input: &DetectionInput<'_>) -> AmlResult<Detection> {
        Ok(Detection::complete(detect_smurfing(input.transactions, &self.config)))
    }
}

#[derive(Default)]
struct Inflow<'a> {
    senders:        BTreeSet<&'a str>,
    transfer_count: usize,
    total_amount:   f64,
}

/// One pattern per triggered receiver, ordered by receiver id.
pub fn detect_smurfing(transactions: &[Transaction], config: &SmurfingConfig) -> Vec<Pattern> {
    let mut inflows: BTreeMap<&str, Inflow<'_>> = BTreeMap::new();
    for txn in transactions.iter().filter(|t| !t.is_self_transfer()) {
        let inflow = inflows.entry(txn.receiver_id.as_str()).or_default();
        inflow.senders.insert(txn.sender_id.as_str());
        inflow.transfer_count += 1;
        inflow.total_amount += txn.amount;
    }

    let patterns: Vec<_> = inflows
        .into_iter()
        .filter(|(_, inflow)| config.is_triggered(inflow.senders.len(), inflow.total_amount))
        .map(|(receiver, inflow)| {
            log::debug!(
                "Smurfing: {} receives from {} senders ({} transfers, {:.2})",
                receiver,
                inflow.senders.len(),
                inflow.transfer_count,
                inflow.total_amount
            );
            Pattern::Smurfing(SmurfingPattern {
                receiver:       receiver.to_string(),
                senders:        inflow.senders.into_iter().map(str::to_string).collect(),
                transfer_count: inflow.transfer_count,
                total_amount:   inflow.total_amount,
            })
        })
        .collect();

    log::debug!("Smurfing detector found {} funnels", patterns.len());
    patterns
}
