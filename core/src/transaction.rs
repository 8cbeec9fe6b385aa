//! Validated transaction rows, the only input the engine consumes.
//!
//! RULE: The engine assumes the row contract already holds.
//! validate_transactions() exists for hosts that want to enforce it
//! explicitly; the graph builder never rejects a row.

use crate::{
    error::{AmlError, AmlResult},
    types::{AccountId, Timestamp},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub sender_id:      AccountId,
    pub receiver_id:    AccountId,
    pub amount:         f64,
    pub timestamp:      Timestamp,
}

impl Transaction {
    pub fn new(
        transaction_id: impl Into<String>,
        sender_id: impl Into<AccountId>,
        receiver_id: impl Into<AccountId>,
        amount: f64,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            sender_id:      sender_id.into(),
            receiver_id:    receiver_id.into(),
            amount,
            timestamp,
        }
    }

    /// Same-account transfers stay in the raw data but carry no structure.
    pub fn is_self_transfer(&self) -> bool {
        self.sender_id == self.receiver_id
    }
}

/// Check the input contract: non-empty ids and a finite, non-negative amount.
/// Reports the first offending row (0-based).
pub fn validate_transactions(transactions: &[Transaction]) -> AmlResult<()> {
    for (row, txn) in transactions.iter().enumerate() {
        let reason = if txn.sender_id.trim().is_empty() {
            Some("empty sender_id".to_string())
        } else if txn.receiver_id.trim().is_empty() {
            Some("empty receiver_id".to_string())
        } else if !txn.amount.is_finite() || txn.amount < 0.0 {
            Some(format!("amount {} is not a non-negative number", txn.amount))
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(AmlError::InvalidTransaction { row, reason });
        }
    }
    Ok(())
}
