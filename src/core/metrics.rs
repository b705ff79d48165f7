//! Balance metrics computed from utilization snapshots.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::core::common::{Resource, ResourceVector};
use crate::core::resource_pool::UtilizationSnapshot;

/// Default resource weights for the imbalance score.
pub const DEFAULT_RESOURCE_WEIGHTS: ResourceVector = ResourceVector {
    cpu: 0.4,
    mem: 0.4,
    disk: 0.2,
};

/// Utilization statistics for a single resource across all clusters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceMetrics {
    pub max_utilization: f64,
    pub avg_utilization: f64,
    /// Population standard deviation of utilization across clusters.
    pub std_dev: f64,
    /// Per-cluster utilization values the statistics were computed from.
    pub cluster_distribution: IndexMap<String, f64>,
}

impl ResourceMetrics {
    fn compute(snapshot: &UtilizationSnapshot, resource: Resource) -> Self {
        let values: Vec<f64> = snapshot.values().map(|u| u.get(resource)).collect();
        let max_utilization = values.iter().fold(0.0_f64, |acc, v| acc.max(*v));
        let avg_utilization = values.iter().sum::<f64>() / values.len() as f64;
        let variance = values
            .iter()
            .map(|v| (v - avg_utilization).powi(2))
            .sum::<f64>()
            / values.len() as f64;
        Self {
            max_utilization,
            avg_utilization,
            std_dev: variance.sqrt(),
            cluster_distribution: snapshot
                .iter()
                .map(|(cluster, u)| (cluster.clone(), u.get(resource)))
                .collect(),
        }
    }
}

impl fmt::Display for ResourceMetrics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "max: {:.2}%, avg: {:.2}%, std: {:.2}%",
            self.max_utilization * 100.,
            self.avg_utilization * 100.,
            self.std_dev * 100.
        )
    }
}

/// Per-resource and overall balance statistics derived from one utilization
/// snapshot. Stateless per call: computing metrics twice on the same snapshot
/// yields identical results.
#[derive(Debug, Clone, Serialize)]
pub struct PlacementMetrics {
    pub cpu: ResourceMetrics,
    pub mem: ResourceMetrics,
    pub disk: ResourceMetrics,
    /// Weighted combination of utilization spread and peak-vs-mean gap across
    /// clusters. Lower is more balanced.
    pub overall_imbalance: f64,
    /// False for the empty-snapshot marker produced when a placement round
    /// yielded no clusters.
    pub successful: bool,
}

impl PlacementMetrics {
    /// Computes metrics from the snapshot.
    ///
    /// An empty snapshot produces the failed marker with zeroed statistics
    /// rather than an error, so downstream reporting can still render the round.
    pub fn compute(snapshot: &UtilizationSnapshot, weights: &ResourceVector) -> Self {
        if snapshot.is_empty() {
            return Self::failed();
        }
        let cpu = ResourceMetrics::compute(snapshot, Resource::Cpu);
        let mem = ResourceMetrics::compute(snapshot, Resource::Mem);
        let disk = ResourceMetrics::compute(snapshot, Resource::Disk);
        let mut overall_imbalance = 0.0;
        for (resource, metrics) in [
            (Resource::Cpu, &cpu),
            (Resource::Mem, &mem),
            (Resource::Disk, &disk),
        ] {
            let spread = metrics.std_dev + (metrics.max_utilization - metrics.avg_utilization);
            overall_imbalance += weights.get(resource) * spread;
        }
        Self {
            cpu,
            mem,
            disk,
            overall_imbalance,
            successful: true,
        }
    }

    /// Well-defined result for a round that produced no clusters.
    pub fn failed() -> Self {
        Self {
            cpu: Default::default(),
            mem: Default::default(),
            disk: Default::default(),
            overall_imbalance: 0.0,
            successful: false,
        }
    }

    pub fn resource(&self, resource: Resource) -> &ResourceMetrics {
        match resource {
            Resource::Cpu => &self.cpu,
            Resource::Mem => &self.mem,
            Resource::Disk => &self.disk,
        }
    }
}

impl fmt::Display for PlacementMetrics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.successful {
            return write!(f, "placement failed");
        }
        writeln!(f, "overall imbalance score: {:.4}", self.overall_imbalance)?;
        for resource in Resource::ALL {
            writeln!(f, "{}: {}", resource.as_str().to_uppercase(), self.resource(resource))?;
        }
        Ok(())
    }
}
