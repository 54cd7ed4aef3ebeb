//! Error taxonomy of the simulation engine
//!
//! Only genuine failures live here. A request that has to wait, or a process
//! that ends up deadlocked, is a successful outcome and is reported through
//! the operation's result instead.

use crate::core::types::{ProcessId, ResourceId};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Which registry an unknown id was looked up in
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Process,
    Resource,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Process => f.write_str("process"),
            EntityKind::Resource => f.write_str("resource"),
        }
    }
}

/// Coarse failure category, for transports mapping errors to status codes
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    ResourceBusy,
}

/// Error returned by simulation operations
///
/// Every mutating operation validates its input before writing anything, so
/// receiving one of these means the simulation state is unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SimError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("resource {id} is busy: {allocated} unit(s) allocated, {pending} pending request(s)")]
    ResourceBusy {
        id: ResourceId,
        allocated: u32,
        pending: usize,
    },
}

impl SimError {
    pub(crate) fn process_not_found(id: ProcessId) -> Self {
        SimError::NotFound {
            kind: EntityKind::Process,
            id,
        }
    }

    pub(crate) fn resource_not_found(id: ResourceId) -> Self {
        SimError::NotFound {
            kind: EntityKind::Resource,
            id,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SimError::InvalidArgument(message.into())
    }

    /// Failure category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimError::NotFound { .. } => ErrorKind::NotFound,
            SimError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            SimError::ResourceBusy { .. } => ErrorKind::ResourceBusy,
        }
    }
}

/// Result alias used throughout the engine
pub type SimResult<T> = std::result::Result<T, SimError>;
