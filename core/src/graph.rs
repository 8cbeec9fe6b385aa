//! Directed transfer multigraph over an account arena.
//!
//! RULES:
//!   - Accounts live in an arena sorted by id; edges hold arena indices,
//!     never references, so cyclic fund flows create no ownership cycles.
//!   - Every transfer is kept (self-transfers included) for audit.
//!   - Adjacency excludes self-transfers; structural detectors only
//!     ever see sender != receiver.
//!   - Adjacency lists are pre-sorted by (counterparty id, timestamp, row).
//!     Every traversal order in the engine derives from this.

use crate::{
    error::{AmlError, AmlResult},
    pattern::Hop,
    transaction::Transaction,
    types::{AccountId, AccountIdx, Timestamp, TransferIdx},
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One input row, as an edge between two arena slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub sender:    AccountIdx,
    pub receiver:  AccountIdx,
    pub amount:    f64,
    pub timestamp: Timestamp,
    /// Row position in the input, for tracing evidence back to the dataset.
    pub row:       usize,
}

impl Transfer {
    pub fn is_self_transfer(&self) -> bool {
        self.sender == self.receiver
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub accounts:       usize,
    pub transfers:      usize,
    pub self_transfers: usize,
    pub account_pairs:  usize,
}

#[derive(Debug, Clone)]
pub struct TransactionGraph {
    accounts:     Vec<AccountId>,
    index:        BTreeMap<AccountId, AccountIdx>,
    transfers:    Vec<Transfer>,
    outgoing:     Vec<Vec<TransferIdx>>,
    incoming:     Vec<Vec<TransferIdx>>,
    successors:   Vec<Vec<AccountIdx>>,
    predecessors: Vec<Vec<AccountIdx>>,
}

impl TransactionGraph {
    /// Build the graph from validated rows. Never fails; malformed rows
    /// are the caller's responsibility.
    pub fn build(transactions: &[Transaction]) -> Self {
        let ids: BTreeSet<&str> = transactions
            .iter()
            .flat_map(|t| [t.sender_id.as_str(), t.receiver_id.as_str()])
            .collect();
        let accounts: Vec<AccountId> = ids.into_iter().map(str::to_string).collect();
        let index: BTreeMap<AccountId, AccountIdx> = accounts
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let n = accounts.len();
        let mut transfers = Vec::with_capacity(transactions.len());
        let mut outgoing = vec![Vec::new(); n];
        let mut incoming = vec![Vec::new(); n];

        for (row, txn) in transactions.iter().enumerate() {
            // Both ids were inserted above.
            let sender = index[&txn.sender_id];
            let receiver = index[&txn.receiver_id];
            let idx = transfers.len();
            transfers.push(Transfer {
                sender,
                receiver,
                amount: txn.amount,
                timestamp: txn.timestamp,
                row,
            });
            if sender != receiver {
                outgoing[sender].push(idx);
                incoming[receiver].push(idx);
            }
        }

        for edges in &mut outgoing {
            edges.sort_by_key(|&e| (transfers[e].receiver, transfers[e].timestamp, transfers[e].row));
        }
        for edges in &mut incoming {
            edges.sort_by_key(|&e| (transfers[e].sender, transfers[e].timestamp, transfers[e].row));
        }

        let successors = outgoing
            .iter()
            .map(|edges| distinct(edges.iter().map(|&e| transfers[e].receiver)))
            .collect();
        let predecessors = incoming
            .iter()
            .map(|edges| distinct(edges.iter().map(|&e| transfers[e].sender)))
            .collect();

        let graph = Self { accounts, index, transfers, outgoing, incoming, successors, predecessors };
        log::debug!(
            "Graph built: {} accounts, {} transfers ({} self-transfers)",
            graph.account_count(),
            graph.transfer_count(),
            graph.self_transfer_count()
        );
        graph
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.len()
    }

    pub fn self_transfer_count(&self) -> usize {
        self.transfers.iter().filter(|t| t.is_self_transfer()).count()
    }

    pub fn accounts(&self) -> &[AccountId] {
        &self.accounts
    }

    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    /// Id of the account in arena slot `idx`.
    pub fn account_id(&self, idx: AccountIdx) -> &str {
        &self.accounts[idx]
    }

    pub fn account_idx(&self, account_id: &str) -> AmlResult<AccountIdx> {
        self.index
            .get(account_id)
            .copied()
            .ok_or_else(|| AmlError::UnknownAccount { account_id: account_id.to_string() })
    }

    pub fn contains(&self, account_id: &str) -> bool {
        self.index.contains_key(account_id)
    }

    /// Outgoing non-self transfers in traversal order.
    pub fn outgoing(&self, idx: AccountIdx) -> impl Iterator<Item = &Transfer> + '_ {
        self.outgoing[idx].iter().map(move |&e| &self.transfers[e])
    }

    /// Incoming non-self transfers, ordered by sender id then time.
    pub fn incoming(&self, idx: AccountIdx) -> impl Iterator<Item = &Transfer> + '_ {
        self.incoming[idx].iter().map(move |&e| &self.transfers[e])
    }

    /// Distinct receivers of `idx`, ascending by id.
    pub fn successors(&self, idx: AccountIdx) -> &[AccountIdx] {
        &self.successors[idx]
    }

    /// Distinct senders into `idx`, ascending by id.
    pub fn predecessors(&self, idx: AccountIdx) -> &[AccountIdx] {
        &self.predecessors[idx]
    }

    /// Number of distinct counterparties sending to `idx`.
    pub fn in_degree(&self, idx: AccountIdx) -> usize {
        self.predecessors[idx].len()
    }

    /// Number of distinct counterparties receiving from `idx`.
    pub fn out_degree(&self, idx: AccountIdx) -> usize {
        self.successors[idx].len()
    }

    /// Aggregate every transfer from `from` to `to` into one hop of evidence.
    pub fn hop(&self, from: AccountIdx, to: AccountIdx) -> Hop {
        let (transfer_count, amount) = self
            .outgoing(from)
            .filter(|t| t.receiver == to)
            .fold((0usize, 0.0f64), |(n, sum), t| (n + 1, sum + t.amount));
        Hop {
            from: self.accounts[from].clone(),
            to: self.accounts[to].clone(),
            transfer_count,
            amount,
        }
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            accounts:       self.account_count(),
            transfers:      self.transfer_count(),
            self_transfers: self.self_transfer_count(),
            account_pairs:  self.successors.iter().map(Vec::len).sum(),
        }
    }

    /// Verify the builder's contract: every edge endpoint is in the arena,
    /// the index mirrors the arena, and adjacency holds no self-transfers.
    pub fn check_invariants(&self) -> AmlResult<()> {
        let n = self.accounts.len();
        if self.index.len() != n {
            return Err(AmlError::invariant(format!(
                "account index holds {} ids but arena holds {n}",
                self.index.len()
            )));
        }
        for (slot, id) in self.accounts.iter().enumerate() {
            if self.index.get(id) != Some(&slot) {
                return Err(AmlError::invariant(format!("account '{id}' is not indexed at slot {slot}")));
            }
        }
        for (i, t) in self.transfers.iter().enumerate() {
            if t.sender >= n || t.receiver >= n {
                return Err(AmlError::invariant(format!(
                    "transfer {i} (row {}) references account slot outside arena of {n}",
                    t.row
                )));
            }
        }
        for edges in self.outgoing.iter().chain(self.incoming.iter()) {
            for &e in edges {
                match self.transfers.get(e) {
                    Some(t) if !t.is_self_transfer() => {}
                    Some(t) => {
                        return Err(AmlError::invariant(format!(
                            "self-transfer at row {} present in adjacency",
                            t.row
                        )))
                    }
                    None => return Err(AmlError::invariant(format!("adjacency references missing transfer {e}"))),
                }
            }
        }
        Ok(())
    }
}

/// Collapse an already-sorted sequence to its distinct values.
fn distinct(sorted: impl Iterator<Item = AccountIdx>) -> Vec<AccountIdx> {
    let mut out: Vec<AccountIdx> = Vec::new();
    for idx in sorted {
        if out.last() != Some(&idx) {
            out.push(idx);
        }
    }
    out
}
