//! Wait-For Graph over simulated processes
//!
//! A directed graph whose edge `A -> B` means process A waits for a resource
//! of which process B holds units. It is rebuilt from the registries for every
//! snapshot and serves as the reporting view of a deadlock: detection itself
//! is done by the work/finish pass, which stays exact for multi-instance
//! resources where a cycle here does not imply a deadlock.
//!
//! # How it works
//!
//! The graph maintains two internal mappings:
//! 1. *Forward Graph (`edges`)*: Maps `A -> {B}`. Used to find cycles (BFS).
//! 2. *Reverse Graph (`incoming_edges`)*: Maps `B -> {A}`. Used to drop a
//!    process and all edges pointing at it without scanning the whole graph.

use crate::core::types::ProcessId;
use fxhash::{FxHashMap, FxHashSet};
use std::collections::{BTreeSet, VecDeque};

/// Represents a directed graph of process wait relationships
pub struct WaitForGraph {
    /// Maps a process to all the processes it is waiting for (outgoing edges).
    pub(crate) edges: FxHashMap<ProcessId, FxHashSet<ProcessId>>,

    /// Maps a process to all processes that are waiting for it (incoming edges).
    pub(crate) incoming_edges: FxHashMap<ProcessId, FxHashSet<ProcessId>>,
}

impl Default for WaitForGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitForGraph {
    /// Create a new empty wait-for graph
    pub fn new() -> Self {
        Self {
            edges: FxHashMap::default(),
            incoming_edges: FxHashMap::default(),
        }
    }

    /// Add a directed edge: `from` process waits for `to` process
    ///
    /// Self-loops are ignored; a process never waits for itself.
    pub fn add_edge(&mut self, from: ProcessId, to: ProcessId) {
        if from == to {
            return;
        }
        self.edges.entry(from).or_default().insert(to);
        self.incoming_edges.entry(to).or_default().insert(from);
    }

    /// All edges as `(waiter, holder)` pairs in ascending order
    pub fn sorted_edges(&self) -> Vec<(ProcessId, ProcessId)> {
        let mut pairs: Vec<_> = self
            .edges
            .iter()
            .flat_map(|(&from, targets)| targets.iter().map(move |&to| (from, to)))
            .collect();
        pairs.sort_unstable();
        pairs
    }

    /// Clear the wait edges for a process (what it's waiting for)
    fn clear_wait_edges(&mut self, process_id: ProcessId) {
        if let Some(targets) = self.edges.remove(&process_id) {
            // Update the reverse mapping for every process we were waiting on
            for target in targets {
                if let Some(waiters) = self.incoming_edges.get_mut(&target) {
                    waiters.remove(&process_id);
                    if waiters.is_empty() {
                        self.incoming_edges.remove(&target);
                    }
                }
            }
        }
    }

    /// Remove all edges for the specified process (both incoming and outgoing)
    ///
    /// Proportional to the process's neighbours thanks to the reverse graph.
    pub fn remove_process(&mut self, process_id: ProcessId) {
        self.clear_wait_edges(process_id);

        if let Some(waiters) = self.incoming_edges.remove(&process_id) {
            for waiter in waiters {
                if let Some(forward_set) = self.edges.get_mut(&waiter) {
                    forward_set.remove(&process_id);
                    if forward_set.is_empty() {
                        self.edges.remove(&waiter);
                    }
                }
            }
        }
    }

    /// Drop every process that is not in `keep`, along with its edges
    pub fn retain(&mut self, keep: &BTreeSet<ProcessId>) {
        let nodes: BTreeSet<ProcessId> = self
            .edges
            .keys()
            .chain(self.incoming_edges.keys())
            .copied()
            .filter(|id| !keep.contains(id))
            .collect();
        for id in nodes {
            self.remove_process(id);
        }
    }

    /// Find one cycle, starting the search from the smallest process id
    ///
    /// # Returns
    /// * `Some(cycle)` - processes in wait order; the last one waits for the first
    /// * `None` - the graph is acyclic
    pub fn find_cycle(&self) -> Option<Vec<ProcessId>> {
        let mut starts: Vec<ProcessId> = self.edges.keys().copied().collect();
        starts.sort_unstable();

        for start in starts {
            for next in self.sorted_successors(start) {
                if let Some(path) = self.find_path(next, start) {
                    // path runs next -> ... -> start; rotate start to the front
                    let mut cycle = Vec::with_capacity(path.len());
                    cycle.push(start);
                    cycle.extend(&path[..path.len() - 1]);
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn sorted_successors(&self, id: ProcessId) -> Vec<ProcessId> {
        let mut next: Vec<ProcessId> = self
            .edges
            .get(&id)
            .map(|targets| targets.iter().copied().collect())
            .unwrap_or_default();
        next.sort_unstable();
        next
    }

    /// Find a path from start to target using BFS
    fn find_path(&self, start: ProcessId, target: ProcessId) -> Option<Vec<ProcessId>> {
        if start == target {
            return Some(vec![start]);
        }

        let mut queue = VecDeque::from([start]);
        let mut visited = FxHashSet::default();
        let mut parent: FxHashMap<ProcessId, ProcessId> = FxHashMap::default();
        visited.insert(start);

        while let Some(current) = queue.pop_front() {
            if current == target {
                let mut path = vec![target];
                let mut curr = target;
                while let Some(&p) = parent.get(&curr) {
                    path.push(p);
                    curr = p;
                }
                path.reverse();
                return Some(path);
            }

            for neighbor in self.sorted_successors(current) {
                if visited.insert(neighbor) {
                    parent.insert(neighbor, current);
                    queue.push_back(neighbor);
                }
            }
        }

        None
    }
}
