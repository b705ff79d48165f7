//! Cluster resource pool state.

use indexmap::IndexMap;
use serde::Serialize;

use crate::core::common::{AllocationVerdict, Resource, ResourceVector, VmSpec, UTILIZATION_EPS};

/// Read-only copy of cluster utilization at a point in time, keyed by cluster name.
pub type UtilizationSnapshot = IndexMap<String, ResourceVector>;

/// Stores cluster properties (resource capacity) and state (current utilization).
///
/// Capacity is immutable for the lifetime of a run; utilization is mutated
/// only through [`ResourcePoolState::apply`].
#[derive(Debug, Clone, Serialize)]
pub struct ClusterState {
    capacity: ResourceVector,
    utilization: ResourceVector,
}

impl ClusterState {
    pub fn new(capacity: ResourceVector, utilization: ResourceVector) -> Self {
        Self {
            capacity,
            utilization,
        }
    }

    pub fn capacity(&self) -> ResourceVector {
        self.capacity
    }

    pub fn utilization(&self) -> ResourceVector {
        self.utilization
    }
}

/// Holds capacities and fractional utilization of all clusters along with the
/// committed VM-to-cluster placements.
///
/// Strategies receive the pool state by reference and never mutate it; the
/// simulation driver is the sole writer. The placement map is append-only:
/// once placed, a VM is never reassigned.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourcePoolState {
    clusters: IndexMap<String, ClusterState>,
    placements: IndexMap<String, String>,
}

impl ResourcePoolState {
    /// Creates empty resource pool state.
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds cluster to resource pool with given capacity and initial utilization.
    pub fn add_cluster(&mut self, name: &str, capacity: ResourceVector, utilization: ResourceVector) {
        self.clusters
            .insert(name.to_string(), ClusterState::new(capacity, utilization));
    }

    /// Returns names of all clusters in configured order.
    pub fn cluster_names(&self) -> Vec<String> {
        self.clusters.keys().cloned().collect()
    }

    /// Returns the number of clusters.
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Returns the total capacity of the specified cluster and resource.
    pub fn capacity(&self, cluster: &str, resource: Resource) -> f64 {
        self.clusters[cluster].capacity.get(resource)
    }

    /// Returns the current fractional utilization of the specified cluster and resource.
    pub fn utilization(&self, cluster: &str, resource: Resource) -> f64 {
        self.clusters[cluster].utilization.get(resource)
    }

    /// Returns the spare capacity of the specified cluster and resource in
    /// absolute units: `capacity * (1 - utilization)`.
    pub fn available(&self, cluster: &str, resource: Resource) -> f64 {
        let state = &self.clusters[cluster];
        state.capacity.get(resource) * (1.0 - state.utilization.get(resource))
    }

    /// Checks whether the demand fits on the specified cluster without pushing
    /// any resource utilization above 1.0.
    pub fn can_fit(&self, demand: &ResourceVector, cluster: &str) -> AllocationVerdict {
        let state = match self.clusters.get(cluster) {
            Some(state) => state,
            None => return AllocationVerdict::ClusterNotFound,
        };
        for resource in Resource::ALL {
            let next = state.utilization.get(resource) + demand.get(resource) / state.capacity.get(resource);
            if next > 1.0 + UTILIZATION_EPS {
                return match resource {
                    Resource::Cpu => AllocationVerdict::NotEnoughCpu,
                    Resource::Mem => AllocationVerdict::NotEnoughMemory,
                    Resource::Disk => AllocationVerdict::NotEnoughDisk,
                };
            }
        }
        AllocationVerdict::Success
    }

    /// Commits the VM to the specified cluster, adding `demand / capacity` to
    /// the cluster utilization for every resource.
    ///
    /// The caller must have already validated feasibility; no bounds checking
    /// is performed here. Re-applying an already placed VM is a no-op.
    pub fn apply(&mut self, vm: &VmSpec, cluster: &str) {
        if self.placements.contains_key(&vm.name) {
            return;
        }
        if let Some(state) = self.clusters.get_mut(cluster) {
            for resource in Resource::ALL {
                *state.utilization.get_mut(resource) +=
                    vm.demand.get(resource) / state.capacity.get(resource);
            }
            self.placements.insert(vm.name.clone(), cluster.to_string());
        }
    }

    /// Returns the committed VM-to-cluster placements.
    pub fn placements(&self) -> &IndexMap<String, String> {
        &self.placements
    }

    /// Returns the cluster hosting the specified VM, if it was placed.
    pub fn placement_of(&self, vm: &str) -> Option<&str> {
        self.placements.get(vm).map(|s| s.as_str())
    }

    /// Returns the number of VMs placed on the specified cluster.
    pub fn vm_count(&self, cluster: &str) -> usize {
        self.placements.values().filter(|c| c.as_str() == cluster).count()
    }

    /// Returns VM names grouped by cluster. Every cluster is present, empty or not.
    pub fn vm_distribution(&self) -> IndexMap<String, Vec<String>> {
        let mut distribution: IndexMap<String, Vec<String>> = self
            .clusters
            .keys()
            .map(|name| (name.clone(), Vec::new()))
            .collect();
        for (vm, cluster) in &self.placements {
            if let Some(vms) = distribution.get_mut(cluster) {
                vms.push(vm.clone());
            }
        }
        distribution
    }

    /// Captures a read-only utilization snapshot of all clusters.
    pub fn utilization_snapshot(&self) -> UtilizationSnapshot {
        self.clusters
            .iter()
            .map(|(name, state)| (name.clone(), state.utilization))
            .collect()
    }
}
