//! Shared primitive types used across the entire engine.

/// An account identifier exactly as it appears in the input dataset.
pub type AccountId = String;

/// Position of an account in the graph arena.
/// Arena order is account id order, so index order is id order.
pub type AccountIdx = usize;

/// Position of a transfer in the graph's transfer list (input row order).
pub type TransferIdx = usize;

/// Transaction timestamp. The engine only relies on its total order.
pub type Timestamp = chrono::NaiveDateTime;
