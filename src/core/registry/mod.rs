//! Registries owning the simulated processes and resources
//!
//! - Resource registry: resource types with total and available instance counts
//! - Process registry: process identities, states, held and pending units
//!
//! Both are plain owned containers. Only the controller mutates them, while
//! holding the simulation write lock.

pub(crate) mod process;
pub(crate) mod resource;

pub(crate) use process::ProcessRegistry;
pub(crate) use resource::ResourceRegistry;

/// Reject empty or whitespace-only names
pub(crate) fn validate_name(name: &str, what: &str) -> crate::core::error::SimResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(crate::core::error::SimError::invalid(format!(
            "{what} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}
