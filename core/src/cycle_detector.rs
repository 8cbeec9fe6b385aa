//! Cycle detector: closed fund loops.
//!
//! Depth-first search with an explicit path stack. Each search is rooted at
//! one account and only walks accounts that sort after the root, so every
//! simple loop is reached exactly once, from its smallest account. Edges
//! are taken in adjacency order (receiver id, then time).
//!
//! Every loop lies inside one strongly connected component, so roots in
//! components smaller than `min_length` are skipped and walks never leave
//! the root's component. Acyclic traffic costs one linear SCC pass.
//!
//! Suppression rules (the only ways a loop goes unreported):
//!   - Length bound: loops longer than `max_length` are never completed.
//!   - Rotation dedup: loops are reduced to their canonical rotation and
//!     each canonical loop is emitted once.
//!   - Cycle budget: enumeration stops after `max_cycles` loops.
//!   - Step budget: enumeration stops after `max_search_steps` path
//!     extensions, however few loops were found.
//! The two budgets are recall limits, reported through `Detection.truncated`.

use crate::{
    config::CycleConfig,
    detector::{Detection, DetectionInput, Detector},
    error::AmlResult,
    graph::TransactionGraph,
    pattern::{CyclePattern, Pattern, PatternKind},
    scc::{strongly_connected_components, Components},
    types::AccountIdx,
};
use std::collections::HashSet;

pub struct CycleDetector {
    config: CycleConfig,
}

impl CycleDetector {
    pub fn new(config: CycleConfig) -> Self {
        Self { config }
    }
}

impl Detector for CycleDetector {
    fn name(&self) -> &'static str {
        "cycle"
    }

    fn kind(&self) -> PatternKind {
        PatternKind::Cycle
    }

    fn detect(&self, input: &DetectionInput<'_>) -> AmlResult<Detection> {
        Ok(detect_cycles(input.graph, &self.config))
    }
}

/// Enumerate bounded simple cycles in deterministic order.
pub fn detect_cycles(graph: &TransactionGraph, config: &CycleConfig) -> Detection {
    let components = strongly_connected_components(graph);
    let search = run_search(graph, config, &components);

    let truncated = search.truncation().map(|reason| {
        log::warn!("Cycle search stopped early ({reason}); remaining loops unreported");
        reason
    });

    let patterns = search
        .found
        .iter()
        .map(|cycle| to_pattern(graph, cycle))
        .collect::<Vec<_>>();
    log::debug!(
        "Cycle detector found {} cycles in {} search steps ({} components)",
        patterns.len(),
        search.steps,
        components.count()
    );

    Detection { patterns, truncated }
}

fn run_search<'g>(
    graph: &'g TransactionGraph,
    config: &'g CycleConfig,
    components: &'g Components,
) -> CycleSearch<'g> {
    let mut search = CycleSearch::new(graph, config, components);
    for root in 0..graph.account_count() {
        if search.budget_spent() {
            break;
        }
        if components.size_of(root) < config.min_length {
            continue;
        }
        search.from_root(root);
    }
    search
}

/// Rotate a loop so it starts at its smallest account. Arena order is id
/// order, so this is the lexicographically smallest id.
pub fn canonical_rotation(cycle: &[AccountIdx]) -> Vec<AccountIdx> {
    let start = cycle
        .iter()
        .enumerate()
        .min_by_key(|&(_, &idx)| idx)
        .map(|(pos, _)| pos)
        .unwrap_or(0);
    cycle[start..].iter().chain(&cycle[..start]).copied().collect()
}

struct CycleSearch<'g> {
    graph:      &'g TransactionGraph,
    config:     &'g CycleConfig,
    components: &'g Components,
    path:       Vec<AccountIdx>,
    on_path:    Vec<bool>,
    seen:       HashSet<Vec<AccountIdx>>,
    found:      Vec<Vec<AccountIdx>>,
    steps:      usize,
}

impl<'g> CycleSearch<'g> {
    fn new(graph: &'g TransactionGraph, config: &'g CycleConfig, components: &'g Components) -> Self {
        Self {
            graph,
            config,
            components,
            path:    Vec::with_capacity(config.max_length),
            on_path: vec![false; graph.account_count()],
            seen:    HashSet::new(),
            found:   Vec::new(),
            steps:   0,
        }
    }

    fn budget_spent(&self) -> bool {
        self.found.len() >= self.config.max_cycles || self.steps >= self.config.max_search_steps
    }

    fn truncation(&self) -> Option<String> {
        if self.found.len() >= self.config.max_cycles {
            Some(format!("cycle budget of {} reached", self.config.max_cycles))
        } else if self.steps >= self.config.max_search_steps {
            Some(format!("search step budget of {} reached", self.config.max_search_steps))
        } else {
            None
        }
    }

    fn from_root(&mut self, root: AccountIdx) {
        self.path.push(root);
        self.on_path[root] = true;
        self.extend(root, root);
        self.on_path[root] = false;
        self.path.pop();
    }

    fn extend(&mut self, root: AccountIdx, current: AccountIdx) {
        let graph = self.graph;
        let component = self.components.of(root);
        for &next in graph.successors(current) {
            if self.budget_spent() {
                return;
            }
            if next == root {
                if self.path.len() >= self.config.min_length {
                    let cycle = self.path.clone();
                    self.record(cycle);
                }
                continue;
            }
            // Loops through a smaller account belong to that account's search.
            if next < root || self.on_path[next] || self.components.of(next) != component {
                continue;
            }
            if self.path.len() >= self.config.max_length {
                continue;
            }
            self.steps += 1;
            self.path.push(next);
            self.on_path[next] = true;
            self.extend(root, next);
            self.on_path[next] = false;
            self.path.pop();
        }
    }

    fn record(&mut self, cycle: Vec<AccountIdx>) {
        let canonical = canonical_rotation(&cycle);
        if self.seen.insert(canonical.clone()) {
            self.found.push(canonical);
        }
    }
}

fn to_pattern(graph: &TransactionGraph, cycle: &[AccountIdx]) -> Pattern {
    let hops: Vec<_> = cycle
        .iter()
        .enumerate()
        .map(|(i, &from)| graph.hop(from, cycle[(i + 1) % cycle.len()]))
        .collect();
    let total_amount = hops.iter().map(|h| h.amount).sum();
    Pattern::Cycle(CyclePattern {
        accounts: cycle.iter().map(|&idx| graph.account_id(idx).to_string()).collect(),
        hops,
        total_amount,
    })
}
