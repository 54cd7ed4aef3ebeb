//! Resource-allocation graph derived from the registries
//!
//! Built on demand under the simulation lock and never stored, so it cannot
//! drift from the registries it was computed from.

use crate::core::graph::WaitForGraph;
use crate::core::registry::{ProcessRegistry, ResourceRegistry};
use crate::core::types::{ProcessId, ResourceId};
use serde::Serialize;

/// An edge between a process and a resource
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct AllocationEdge {
    pub process_id: ProcessId,
    pub resource_id: ResourceId,
    pub units: u32,
}

/// Snapshot of holds, waits and the reduced process-to-process graph
pub struct AllocationGraph {
    /// One edge per (process, resource) with held units
    pub holds: Vec<AllocationEdge>,
    /// One edge per pending request
    pub waits: Vec<AllocationEdge>,
    /// Process waits-for process view
    pub wait_for: WaitForGraph,
}

impl AllocationGraph {
    /// Derive the graph from the current registries
    ///
    /// `Pi -> Pj` is added when Pi's pending request on R exceeds R's current
    /// availability and Pj holds at least one unit of R.
    pub fn build(resources: &ResourceRegistry, processes: &ProcessRegistry) -> Self {
        let mut holds = Vec::new();
        let mut waits = Vec::new();

        for process in processes.iter() {
            for (&resource_id, &units) in &process.held {
                holds.push(AllocationEdge {
                    process_id: process.id,
                    resource_id,
                    units,
                });
            }
            for (&resource_id, &units) in &process.requested {
                waits.push(AllocationEdge {
                    process_id: process.id,
                    resource_id,
                    units,
                });
            }
        }

        let mut wait_for = WaitForGraph::new();
        for wait in &waits {
            let blocked = resources
                .get(wait.resource_id)
                .map(|r| r.available_instances < wait.units)
                .unwrap_or(false);
            if !blocked {
                continue;
            }
            for hold in holds.iter().filter(|h| h.resource_id == wait.resource_id) {
                wait_for.add_edge(wait.process_id, hold.process_id);
            }
        }

        AllocationGraph {
            holds,
            waits,
            wait_for,
        }
    }
}
