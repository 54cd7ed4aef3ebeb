use crate::core::detector::work_finish;
use crate::core::graph::AllocationGraph;
use crate::core::registry::{ProcessRegistry, ResourceRegistry};
use crate::core::types::{DeadlockInfo, ProcessId, ResourceId};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeSet;

/// A deadlocked process, named for display
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeadlockedProcess {
    pub id: ProcessId,
    pub name: String,
}

/// Detector output enriched for presentation
///
/// Deterministic: two simulations in the same state produce equal reports.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeadlockReport {
    pub deadlock_detected: bool,
    /// Deadlocked processes in id order
    pub deadlocked_processes: Vec<DeadlockedProcess>,
    /// Pending request of each deadlocked process as (process, resource)
    pub process_waiting_for_resources: Vec<(ProcessId, ResourceId)>,
    /// One wait-for cycle among the deadlocked processes
    ///
    /// Always present for single-instance deadlocks. With multi-instance
    /// resources the deadlocked set is authoritative and this may be empty.
    pub process_cycle: Vec<ProcessId>,
    /// Order in which the work/finish pass marked processes finished
    pub finish_order: Vec<ProcessId>,
}

impl DeadlockReport {
    /// Run detection and build the report
    pub(crate) fn build(resources: &ResourceRegistry, processes: &ProcessRegistry) -> Self {
        let result = work_finish(resources, processes);
        let process_cycle = cycle_within(resources, processes, &result.deadlocked);

        let mut deadlocked_processes = Vec::with_capacity(result.deadlocked.len());
        let mut process_waiting_for_resources = Vec::new();
        for process in processes
            .iter()
            .filter(|p| result.deadlocked.contains(&p.id))
        {
            deadlocked_processes.push(DeadlockedProcess {
                id: process.id,
                name: process.name.clone(),
            });
            process_waiting_for_resources
                .extend(process.requested.keys().map(|&rid| (process.id, rid)));
        }

        DeadlockReport {
            deadlock_detected: !result.deadlocked.is_empty(),
            deadlocked_processes,
            process_waiting_for_resources,
            process_cycle,
            finish_order: result.finish_order,
        }
    }

    /// Ids of the deadlocked processes
    pub fn deadlocked_ids(&self) -> BTreeSet<ProcessId> {
        self.deadlocked_processes.iter().map(|p| p.id).collect()
    }

    /// Convert into the callback payload, stamping version and time
    pub(crate) fn into_info(self, newly_deadlocked: Vec<ProcessId>, version: u64) -> DeadlockInfo {
        DeadlockInfo {
            deadlocked: self.deadlocked_processes.iter().map(|p| p.id).collect(),
            newly_deadlocked,
            process_cycle: self.process_cycle,
            process_waiting_for_resources: self.process_waiting_for_resources,
            version,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Find a wait-for cycle among `members`, or an empty vector
fn cycle_within(
    resources: &ResourceRegistry,
    processes: &ProcessRegistry,
    members: &BTreeSet<ProcessId>,
) -> Vec<ProcessId> {
    if members.is_empty() {
        return Vec::new();
    }
    let mut graph = AllocationGraph::build(resources, processes).wait_for;
    graph.retain(members);
    graph.find_cycle().unwrap_or_default()
}
