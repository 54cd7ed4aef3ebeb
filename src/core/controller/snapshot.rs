use crate::core::controller::Simulation;
use crate::core::detector::find_deadlocked;
use crate::core::detector::report::DeadlockReport;
use crate::core::graph::{AllocationEdge, AllocationGraph};
use crate::core::types::{Process, ProcessId, Resource};
use serde::Serialize;
use std::collections::BTreeSet;

/// Consistent view of the whole simulation
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Snapshot {
    pub version: u64,
    pub processes: Vec<Process>,
    pub resources: Vec<Resource>,
    /// Process holds resource
    pub holds: Vec<AllocationEdge>,
    /// Process waits for resource
    pub waits: Vec<AllocationEdge>,
    /// Process waits for process, as `(waiter, holder)`
    pub wait_for: Vec<(ProcessId, ProcessId)>,
    pub deadlocked: Vec<ProcessId>,
}

impl Simulation {
    /// Ids of every deadlocked process
    ///
    /// A pure read: it never changes process states, even with eager
    /// detection enabled.
    pub fn detect(&self) -> BTreeSet<ProcessId> {
        let state = self.state.read();
        find_deadlocked(&state.resources, &state.processes)
    }

    /// Detection result with names, pending requests and a wait-for cycle
    pub fn deadlock_report(&self) -> DeadlockReport {
        let state = self.state.read();
        DeadlockReport::build(&state.resources, &state.processes)
    }

    /// Everything at once, taken under a single read lock
    pub fn status(&self) -> Snapshot {
        let state = self.state.read();
        let graph = AllocationGraph::build(&state.resources, &state.processes);
        let deadlocked = find_deadlocked(&state.resources, &state.processes);

        Snapshot {
            version: state.version,
            processes: state.processes.list(),
            resources: state.resources.list(),
            wait_for: graph.wait_for.sorted_edges(),
            holds: graph.holds,
            waits: graph.waits,
            deadlocked: deadlocked.into_iter().collect(),
        }
    }
}
