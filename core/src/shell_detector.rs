//! Shell chain detector: layering through pass-through accounts.
//!
//! An account is a shell when its distinct in-degree and out-degree both lie
//! in 1..=max_degree. A chain starts at a non-shell head, runs through one or
//! more consecutive shells, and ends at the first non-shell account reached.
//!
//! Suppression rules:
//!   - Minimum length: chains shorter than `min_chain_length` accounts.
//!   - Maximality: a chain found as a contiguous run inside a longer
//!     reported chain is dropped (see `suppress_contained_chains`).
//!   - Length cap: walks stop at `max_chain_length` accounts and report
//!     what they have.
//! A walk whose shells only lead back onto its own path is a loop, not a
//! chain, and is dropped; loops belong to the cycle detector. Loops made
//! only of shells have no head at all.

use crate::{
    config::ShellConfig,
    detector::{Detection, DetectionInput, Detector},
    error::AmlResult,
    graph::TransactionGraph,
    pattern::{Pattern, PatternKind, ShellChainPattern},
    types::AccountIdx,
};

pub struct ShellChainDetector {
    config: ShellConfig,
}

impl ShellChainDetector {
    pub fn new(config: ShellConfig) -> Self {
        Self { config }
    }
}

impl Detector for ShellChainDetector {
    fn name(&self) -> &'static str {
        "shell_chain"
    }

    fn kind(&self) -> PatternKind {
        PatternKind::Shell
    }

    fn detect(&self, input: &DetectionInput<'_>) -> AmlResult<Detection> {
        Ok(detect_shell_chains(input.graph, &self.config))
    }
}

/// Low-activity pass-through test.
pub fn is_shell(graph: &TransactionGraph, idx: AccountIdx, max_degree: usize) -> bool {
    let (i, o) = (graph.in_degree(idx), graph.out_degree(idx));
    (1..=max_degree).contains(&i) && (1..=max_degree).contains(&o)
}

pub fn detect_shell_chains(graph: &TransactionGraph, config: &ShellConfig) -> Detection {
    let shells: Vec<bool> = (0..graph.account_count())
        .map(|idx| is_shell(graph, idx, config.max_degree))
        .collect();

    let mut walk = ChainWalk {
        graph,
        config,
        shells: &shells,
        path: Vec::new(),
        on_path: vec![false; graph.account_count()],
        chains: Vec::new(),
        capped: 0,
    };

    for head in 0..graph.account_count() {
        if shells[head] {
            continue;
        }
        for &next in graph.successors(head) {
            if !shells[next] {
                continue;
            }
            walk.push(head);
            walk.push(next);
            walk.extend(next);
            walk.pop();
            walk.pop();
        }
    }

    let truncated = (walk.capped > 0).then(|| {
        log::warn!(
            "{} shell walks cut at {} accounts; longer chains reported partially",
            walk.capped,
            config.max_chain_length
        );
        format!(
            "{} chain walks reached the length cap of {} accounts",
            walk.capped, config.max_chain_length
        )
    });

    let chains = suppress_contained_chains(walk.chains);
    let patterns: Vec<_> = chains.iter().map(|chain| to_pattern(graph, chain)).collect();
    log::debug!("Shell detector found {} chains", patterns.len());

    Detection { patterns, truncated }
}

/// Maximality rule: drop every chain that appears as a contiguous run of a
/// longer chain in the same result. Survivors keep their detection order.
pub fn suppress_contained_chains(chains: Vec<Vec<AccountIdx>>) -> Vec<Vec<AccountIdx>> {
    let mut by_length: Vec<usize> = (0..chains.len()).collect();
    // Stable: equal lengths keep detection order.
    by_length.sort_by(|&a, &b| chains[b].len().cmp(&chains[a].len()));

    let mut keep = vec![false; chains.len()];
    let mut kept: Vec<usize> = Vec::new();
    for idx in by_length {
        let chain = &chains[idx];
        let contained = kept.iter().any(|&k| is_contiguous_run(chain, &chains[k]));
        if !contained {
            keep[idx] = true;
            kept.push(idx);
        }
    }

    chains
        .into_iter()
        .zip(keep)
        .filter_map(|(chain, keep)| keep.then_some(chain))
        .collect()
}

fn is_contiguous_run(needle: &[AccountIdx], haystack: &[AccountIdx]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

struct ChainWalk<'g> {
    graph:   &'g TransactionGraph,
    config:  &'g ShellConfig,
    shells:  &'g [bool],
    path:    Vec<AccountIdx>,
    on_path: Vec<bool>,
    chains:  Vec<Vec<AccountIdx>>,
    capped:  usize,
}

impl ChainWalk<'_> {
    fn push(&mut self, idx: AccountIdx) {
        self.path.push(idx);
        self.on_path[idx] = true;
    }

    fn pop(&mut self) {
        if let Some(idx) = self.path.pop() {
            self.on_path[idx] = false;
        }
    }

    /// `current` is the last account on the path and is always a shell.
    fn extend(&mut self, current: AccountIdx) {
        if self.path.len() >= self.config.max_chain_length {
            self.capped += 1;
            self.emit();
            return;
        }

        let graph = self.graph;
        for &next in graph.successors(current) {
            if self.on_path[next] {
                continue;
            }
            self.push(next);
            if self.shells[next] {
                self.extend(next);
            } else {
                self.emit();
            }
            self.pop();
        }
    }

    fn emit(&mut self) {
        if self.path.len() >= self.config.min_chain_length {
            self.chains.push(self.path.clone());
        }
    }
}

fn to_pattern(graph: &TransactionGraph, chain: &[AccountIdx]) -> Pattern {
    let hops: Vec<_> = chain.windows(2).map(|w| graph.hop(w[0], w[1])).collect();
    let total_amount = hops.iter().map(|h| h.amount).sum();
    Pattern::ShellChain(ShellChainPattern {
        accounts: chain.iter().map(|&idx| graph.account_id(idx).to_string()).collect(),
        hops,
        total_amount,
    })
}
