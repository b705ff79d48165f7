//! Common data types shared by placement strategies and the simulation driver.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Floating-point tolerance applied to the utilization upper bound.
pub const UTILIZATION_EPS: f64 = 1e-9;

/// Fixed set of resource dimensions tracked independently for every cluster and VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Cpu,
    Mem,
    Disk,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Cpu, Resource::Mem, Resource::Disk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Cpu => "cpu",
            Resource::Mem => "mem",
            Resource::Disk => "disk",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Resource {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(Resource::Cpu),
            "mem" => Ok(Resource::Mem),
            "disk" => Ok(Resource::Disk),
            other => Err(PlacementError::InvalidResource(other.to_string())),
        }
    }
}

/// Per-resource vector of values.
///
/// Used for capacities and demands (absolute units) as well as utilizations
/// and imbalance weights (fractions).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceVector {
    pub cpu: f64,
    pub mem: f64,
    pub disk: f64,
}

impl ResourceVector {
    pub fn new(cpu: f64, mem: f64, disk: f64) -> Self {
        Self { cpu, mem, disk }
    }

    /// Creates a vector with the same value for every resource.
    pub fn splat(value: f64) -> Self {
        Self::new(value, value, value)
    }

    pub fn get(&self, resource: Resource) -> f64 {
        match resource {
            Resource::Cpu => self.cpu,
            Resource::Mem => self.mem,
            Resource::Disk => self.disk,
        }
    }

    pub fn get_mut(&mut self, resource: Resource) -> &mut f64 {
        match resource {
            Resource::Cpu => &mut self.cpu,
            Resource::Mem => &mut self.mem,
            Resource::Disk => &mut self.disk,
        }
    }

    /// Returns the largest value across resources.
    pub fn max_value(&self) -> f64 {
        self.cpu.max(self.mem).max(self.disk)
    }

    pub fn sum(&self) -> f64 {
        self.cpu + self.mem + self.disk
    }
}

/// A VM to be placed: unique name plus absolute per-resource demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmSpec {
    pub name: String,
    pub demand: ResourceVector,
}

impl VmSpec {
    pub fn new(name: &str, demand: ResourceVector) -> Self {
        Self {
            name: name.to_string(),
            demand,
        }
    }
}

/// Feasibility verdict for placing a demand on a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationVerdict {
    Success,
    NotEnoughCpu,
    NotEnoughMemory,
    NotEnoughDisk,
    ClusterNotFound,
}

/// Errors produced by the placement engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlacementError {
    /// No assignment satisfies the capacity constraints. This is an expected
    /// outcome which the simulation driver handles as a clean stop.
    #[error("no feasible placement: {0}")]
    Infeasible(String),
    /// Malformed configuration, detected before a run starts.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Reference to a resource outside the fixed set.
    #[error("unknown resource: {0}")]
    InvalidResource(String),
    /// The exact solver could not return a definitive feasible/infeasible
    /// answer. Must not be conflated with [`PlacementError::Infeasible`].
    #[error("solver failure: {0}")]
    SolverFailure(String),
}
