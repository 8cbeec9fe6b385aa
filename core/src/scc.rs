//! Strongly connected components over the transfer graph.
//!
//! Tarjan's algorithm with an explicit DFS stack, so deep account chains
//! cannot overflow the thread stack. Every loop lies inside one component;
//! the cycle detector only searches components large enough to hold one.

use crate::{graph::TransactionGraph, types::AccountIdx};

const UNVISITED: usize = usize::MAX;

/// Component membership for every account in the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Components {
    /// Component id per account index.
    pub component: Vec<usize>,
    /// Account count per component id.
    pub sizes:     Vec<usize>,
}

impl Components {
    pub fn of(&self, idx: AccountIdx) -> usize {
        self.component[idx]
    }

    pub fn size_of(&self, idx: AccountIdx) -> usize {
        self.sizes[self.component[idx]]
    }

    pub fn count(&self) -> usize {
        self.sizes.len()
    }
}

pub fn strongly_connected_components(graph: &TransactionGraph) -> Components {
    let n = graph.account_count();
    let mut component = vec![UNVISITED; n];
    let mut sizes = Vec::new();
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![UNVISITED; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<AccountIdx> = Vec::new();
    let mut next_index = 0;

    for start in 0..n {
        if index[start] != UNVISITED {
            continue;
        }

        // (account, position of the next successor to look at)
        let mut dfs: Vec<(AccountIdx, usize)> = vec![(start, 0)];
        while let Some(&(v, pos)) = dfs.last() {
            if pos == 0 && index[v] == UNVISITED {
                index[v] = next_index;
                lowlink[v] = next_index;
                next_index += 1;
                stack.push(v);
                on_stack[v] = true;
            }

            let successors = graph.successors(v);
            if let Some(&w) = successors.get(pos) {
                if let Some(top) = dfs.last_mut() {
                    top.1 += 1;
                }
                if index[w] == UNVISITED {
                    dfs.push((w, 0));
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w]);
                }
                continue;
            }

            dfs.pop();
            if let Some(&(parent, _)) = dfs.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[v]);
            }

            if lowlink[v] == index[v] {
                let id = sizes.len();
                let mut size = 0;
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component[w] = id;
                    size += 1;
                    if w == v {
                        break;
                    }
                }
                sizes.push(size);
            }
        }
    }

    Components { component, sizes }
}
