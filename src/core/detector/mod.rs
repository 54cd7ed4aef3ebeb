//! Multi-instance deadlock detection
//!
//! The detector runs the work/finish algorithm over the registries:
//!
//! 1. `Work` starts as the available units of every resource. A process with
//!    no pending request starts finished, and its held units join `Work`.
//! 2. Passes over the unfinished processes, in creation order, look for one
//!    whose pending request fits in `Work`. Such a process could be granted,
//!    run to completion and give back everything it holds, so its held units
//!    are added to `Work` and it is marked finished.
//! 3. A pass without progress ends the search. Whoever is still unfinished can
//!    never proceed under any release order: those processes are deadlocked.
//!
//! A plain cycle search over the wait-for graph is only exact for
//! single-instance resources; see [`report`] for the cycle view used when
//! presenting a deadlock.

pub mod report;

use crate::core::registry::{ProcessRegistry, ResourceRegistry};
use crate::core::types::{ProcessId, ProcessState, ResourceId};
use fxhash::FxHashMap;
use std::collections::BTreeSet;

/// Outcome of one work/finish pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkFinish {
    /// Processes in the order they were marked finished
    ///
    /// Processes without a pending request come first, then each process
    /// whose request fit in `Work` at that point.
    pub finish_order: Vec<ProcessId>,
    /// Processes that could never be marked finished
    pub deadlocked: BTreeSet<ProcessId>,
}

/// Run the work/finish algorithm over the current registries
///
/// Pure: it reads the registries and allocates its own work vector.
pub fn work_finish(resources: &ResourceRegistry, processes: &ProcessRegistry) -> WorkFinish {
    let mut work: FxHashMap<ResourceId, u32> = resources
        .iter()
        .map(|r| (r.id, r.available_instances))
        .collect();

    let mut finish_order = Vec::new();
    let mut unfinished = Vec::new();
    for process in processes.iter() {
        if process.state == ProcessState::Terminated {
            continue;
        }
        if process.requested.is_empty() {
            // Nothing pending: it can run to completion and return what it holds
            for (&rid, &units) in &process.held {
                *work.entry(rid).or_insert(0) += units;
            }
            finish_order.push(process.id);
        } else {
            unfinished.push(process);
        }
    }

    loop {
        let before = unfinished.len();
        let mut still_unfinished = Vec::with_capacity(before);

        for process in unfinished {
            let fits = process
                .requested
                .iter()
                .all(|(rid, &units)| work.get(rid).copied().unwrap_or(0) >= units);

            if fits {
                for (&rid, &units) in &process.held {
                    *work.entry(rid).or_insert(0) += units;
                }
                finish_order.push(process.id);
            } else {
                still_unfinished.push(process);
            }
        }

        unfinished = still_unfinished;
        if unfinished.is_empty() || unfinished.len() == before {
            break;
        }
    }

    WorkFinish {
        finish_order,
        deadlocked: unfinished.into_iter().map(|p| p.id).collect(),
    }
}

/// Set of deadlocked processes for the current registries
pub fn find_deadlocked(
    resources: &ResourceRegistry,
    processes: &ProcessRegistry,
) -> BTreeSet<ProcessId> {
    work_finish(resources, processes).deadlocked
}
