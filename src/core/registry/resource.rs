use crate::core::error::{SimError, SimResult};
use crate::core::registry::validate_name;
use crate::core::types::{Resource, ResourceId};
use std::collections::BTreeMap;

/// Owns every resource of a simulation
///
/// Resources are kept in a `BTreeMap` keyed by their sequential id, so
/// iteration order is creation order.
pub struct ResourceRegistry {
    resources: BTreeMap<ResourceId, Resource>,
    next_id: ResourceId,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRegistry {
    pub fn new() -> Self {
        ResourceRegistry {
            resources: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Create a resource with `total_instances` units, all available
    ///
    /// Duplicate names are allowed; ids are always unique.
    pub fn create(&mut self, name: &str, total_instances: u32) -> SimResult<Resource> {
        let name = validate_name(name, "resource")?;
        if total_instances == 0 {
            return Err(SimError::invalid(
                "total_instances must be a positive integer",
            ));
        }

        let id = self.next_id;
        self.next_id += 1;
        let resource = Resource {
            id,
            name,
            total_instances,
            available_instances: total_instances,
        };
        self.resources.insert(id, resource.clone());
        Ok(resource)
    }

    pub fn get(&self, id: ResourceId) -> SimResult<&Resource> {
        self.resources
            .get(&id)
            .ok_or_else(|| SimError::resource_not_found(id))
    }

    /// All resources in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn list(&self) -> Vec<Resource> {
        self.resources.values().cloned().collect()
    }

    /// Whether `units` can be allocated right now without waiting
    ///
    /// An unknown resource satisfies nothing.
    pub fn can_satisfy(&self, id: ResourceId, units: u32) -> bool {
        self.resources
            .get(&id)
            .is_some_and(|r| r.available_instances >= units)
    }

    /// Overwrite `record` with the stored version of the same resource
    pub(crate) fn refresh(&self, record: &mut Resource) {
        if let Some(current) = self.resources.get(&record.id) {
            record.clone_from(current);
        }
    }

    // The mutators below run after the controller has validated the whole
    // operation, so they cannot fail. Bounds are asserted in debug builds.

    /// Remove `units` from the available pool
    pub(crate) fn take(&mut self, id: ResourceId, units: u32) {
        if let Some(resource) = self.resources.get_mut(&id) {
            debug_assert!(resource.available_instances >= units);
            resource.available_instances = resource.available_instances.saturating_sub(units);
        }
    }

    /// Return `units` to the available pool
    pub(crate) fn give_back(&mut self, id: ResourceId, units: u32) {
        if let Some(resource) = self.resources.get_mut(&id) {
            debug_assert!(resource.available_instances + units <= resource.total_instances);
            resource.available_instances =
                (resource.available_instances + units).min(resource.total_instances);
        }
    }

    /// Remove a resource; the controller checks it is unused first
    pub(crate) fn remove(&mut self, id: ResourceId) -> SimResult<Resource> {
        self.resources
            .remove(&id)
            .ok_or_else(|| SimError::resource_not_found(id))
    }

    /// Drop every resource and restart the id sequence
    pub(crate) fn clear(&mut self) {
        self.resources.clear();
        self.next_id = 1;
    }
}
