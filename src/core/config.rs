//! Scenario configuration.

use serde::{Deserialize, Serialize};

use crate::core::common::{PlacementError, Resource, ResourceVector};
use crate::core::metrics::DEFAULT_RESOURCE_WEIGHTS;
use crate::core::placement_strategy::placement_strategy_resolver;

/// Holds raw scenario config parsed from YAML file
/// (all parameters optional, defaults are filled in later).
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawScenarioConfig {
    pub name: Option<String>,
    pub num_vms: Option<u32>,
    pub strategy: Option<String>,
    pub seed: Option<u64>,
    pub resource_weights: Option<ResourceVector>,
    pub vm_demand_ranges: Option<DemandRanges>,
    pub clusters: Option<Vec<ClusterConfig>>,
}

/// Per-resource `(low, high)` ranges for uniform sampling of VM demand.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct DemandRanges {
    pub cpu: (f64, f64),
    pub mem: (f64, f64),
    pub disk: (f64, f64),
}

impl DemandRanges {
    pub fn get(&self, resource: Resource) -> (f64, f64) {
        match resource {
            Resource::Cpu => self.cpu,
            Resource::Mem => self.mem,
            Resource::Disk => self.disk,
        }
    }
}

impl Default for DemandRanges {
    fn default() -> Self {
        Self {
            cpu: (5.0, 15.0),
            mem: (10.0, 25.0),
            disk: (8.0, 20.0),
        }
    }
}

/// Holds configuration of a single cluster or a set of identical clusters.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ClusterConfig {
    /// Cluster name.
    /// Should be set if count = 1.
    pub name: Option<String>,
    /// Cluster name prefix.
    /// Full name is produced by appending cluster instance number to the prefix.
    /// Should be set if count > 1.
    pub name_prefix: Option<String>,
    /// Per-resource capacity in absolute units.
    pub capacity: ResourceVector,
    /// Initial per-resource fractional utilization.
    /// Defaults to zero for all resources.
    pub initial_utilization: Option<ResourceVector>,
    /// Number of such clusters.
    pub count: Option<u32>,
}

/// Represents scenario configuration consumed by the simulation driver.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ScenarioConfig {
    /// Scenario name, used for reporting only.
    pub name: String,
    /// Number of VMs to place before the run is considered exhausted.
    pub num_vms: u32,
    /// Placement strategy name resolved via
    /// [`placement_strategy_resolver`](crate::core::placement_strategy::placement_strategy_resolver).
    pub strategy: String,
    /// Seed for demand sampling and heuristic tie-breaking.
    /// Unseeded runs are non-deterministic by design.
    pub seed: Option<u64>,
    /// Resource weights for the imbalance score.
    pub resource_weights: ResourceVector,
    /// Uniform sampling ranges for VM demand.
    pub vm_demand_ranges: DemandRanges,
    /// Configurations of clusters.
    pub clusters: Vec<ClusterConfig>,
}

impl ScenarioConfig {
    /// Creates scenario config by reading parameter values from a YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Result<Self, PlacementError> {
        let content = std::fs::read_to_string(file_name).map_err(|e| {
            PlacementError::InvalidConfiguration(format!("can't read file {}: {}", file_name, e))
        })?;
        Self::from_yaml(&content)
    }

    /// Parses scenario config from a YAML string and validates it.
    pub fn from_yaml(yaml: &str) -> Result<Self, PlacementError> {
        let raw: RawScenarioConfig = serde_yaml::from_str(yaml)
            .map_err(|e| PlacementError::InvalidConfiguration(format!("can't parse YAML: {}", e)))?;
        let config = Self {
            name: raw.name.unwrap_or_else(|| "scenario".to_string()),
            num_vms: raw.num_vms.unwrap_or(100),
            strategy: raw.strategy.unwrap_or_else(|| "GlobalBalance".to_string()),
            seed: raw.seed,
            resource_weights: raw.resource_weights.unwrap_or(DEFAULT_RESOURCE_WEIGHTS),
            vm_demand_ranges: raw.vm_demand_ranges.unwrap_or_default(),
            clusters: raw.clusters.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Expands cluster configs into `(name, capacity, initial utilization)`
    /// instances, producing full names from prefix and instance number where
    /// count > 1.
    pub fn cluster_instances(
        &self,
    ) -> Result<Vec<(String, ResourceVector, ResourceVector)>, PlacementError> {
        let mut instances = Vec::new();
        for cluster in &self.clusters {
            let count = cluster.count.unwrap_or(1);
            let utilization = cluster.initial_utilization.unwrap_or_default();
            if count == 1 {
                let name = cluster
                    .name
                    .clone()
                    .or_else(|| cluster.name_prefix.as_ref().map(|p| format!("{}1", p)))
                    .ok_or_else(|| {
                        PlacementError::InvalidConfiguration(
                            "cluster config without name or name_prefix".to_string(),
                        )
                    })?;
                instances.push((name, cluster.capacity, utilization));
            } else {
                let prefix = cluster.name_prefix.clone().ok_or_else(|| {
                    PlacementError::InvalidConfiguration(format!(
                        "cluster config with count = {} requires name_prefix",
                        count
                    ))
                })?;
                for i in 0..count {
                    instances.push((format!("{}{}", prefix, i + 1), cluster.capacity, utilization));
                }
            }
        }
        Ok(instances)
    }

    /// Checks the whole configuration before a run starts.
    /// Any violation is fatal and reported as `InvalidConfiguration`.
    pub fn validate(&self) -> Result<(), PlacementError> {
        if self.num_vms == 0 {
            return Err(PlacementError::InvalidConfiguration(
                "num_vms must be at least 1".to_string(),
            ));
        }
        if self.clusters.is_empty() {
            return Err(PlacementError::InvalidConfiguration(
                "at least one cluster is required".to_string(),
            ));
        }
        let instances = self.cluster_instances()?;
        let mut seen = std::collections::HashSet::new();
        for (name, capacity, utilization) in &instances {
            if !seen.insert(name.clone()) {
                return Err(PlacementError::InvalidConfiguration(format!(
                    "duplicate cluster name: {}",
                    name
                )));
            }
            for resource in Resource::ALL {
                if capacity.get(resource) <= 0.0 {
                    return Err(PlacementError::InvalidConfiguration(format!(
                        "cluster {} has non-positive {} capacity",
                        name, resource
                    )));
                }
                let u = utilization.get(resource);
                if !(0.0..=1.0).contains(&u) {
                    return Err(PlacementError::InvalidConfiguration(format!(
                        "cluster {} has initial {} utilization {} outside [0, 1]",
                        name, resource, u
                    )));
                }
            }
        }
        for resource in Resource::ALL {
            let (low, high) = self.vm_demand_ranges.get(resource);
            if low < 0.0 || low > high {
                return Err(PlacementError::InvalidConfiguration(format!(
                    "malformed {} demand range ({}, {})",
                    resource, low, high
                )));
            }
            if self.resource_weights.get(resource) < 0.0 {
                return Err(PlacementError::InvalidConfiguration(format!(
                    "negative {} weight",
                    resource
                )));
            }
        }
        if self.resource_weights.sum() <= 0.0 {
            return Err(PlacementError::InvalidConfiguration(
                "resource weights must sum to a positive value".to_string(),
            ));
        }
        // fail fast on unknown strategy names
        placement_strategy_resolver(&self.strategy, self.seed)?;
        Ok(())
    }
}
