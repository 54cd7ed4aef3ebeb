//! Graph views derived from the registries
//!
//! - Allocation graph: process-holds-resource and process-waits-for-resource edges
//! - Wait-for graph: which processes are waiting for which other processes

pub(crate) mod allocation_graph;
pub(crate) mod wait_for_graph;

pub use allocation_graph::{AllocationEdge, AllocationGraph};
pub use wait_for_graph::WaitForGraph;
