//! Strategy contract for VM placement decisions.

use indexmap::IndexMap;
use serde::Serialize;

use crate::core::common::{PlacementError, VmSpec};
use crate::core::placement_strategies::global_balance::GlobalBalance;
use crate::core::placement_strategies::greedy_availability::GreedyAvailability;
use crate::core::placement_strategies::greedy_availability_ordered::GreedyAvailabilityOrdered;
use crate::core::placement_strategies::greedy_utilization::GreedyUtilization;
use crate::core::placement_strategies::max_min_utilization::MaxMinUtilization;
use crate::core::placement_strategies::per_cluster_balance::PerClusterBalance;
use crate::core::resource_pool::{ResourcePoolState, UtilizationSnapshot};

/// Successful outcome of a [`PlacementStrategy::propose`] call.
///
/// A proposal is a candidate: the driver either commits it wholesale to the
/// shared pool state or discards it entirely.
#[derive(Debug, Clone, Serialize)]
pub struct PlacementProposal {
    /// Mapping from pending VM name to selected cluster.
    pub plan: IndexMap<String, String>,
    /// Cluster utilization after the proposed placements are applied.
    pub utilization: UtilizationSnapshot,
    /// Worst-case post-placement utilization across all cluster/resource
    /// pairs (for the exact global strategy this is the solver objective).
    pub objective: f64,
    /// All VM names per cluster, existing placements included.
    pub by_cluster: IndexMap<String, Vec<String>>,
}

/// Trait for implementation of VM placement strategies.
///
/// A strategy is a pure function of the current resource pool state and a set
/// of pending VMs. It returns either a complete placement proposal or
/// [`PlacementError::Infeasible`]; partial placements of a batch are never
/// returned. Strategies must not mutate the pool state — the driver applies
/// commits after inspecting the result, so a failed proposal can never corrupt
/// shared state.
pub trait PlacementStrategy {
    fn name(&self) -> &'static str;

    fn propose(
        &self,
        pool_state: &ResourcePoolState,
        pending_vms: &[VmSpec],
    ) -> Result<PlacementProposal, PlacementError>;
}

/// Builds the proposal payload by applying the plan to a working copy of the
/// pool. `objective` overrides the computed worst-case utilization when the
/// strategy already knows its objective value.
pub(crate) fn build_proposal(
    pool_state: &ResourcePoolState,
    pending_vms: &[VmSpec],
    plan: IndexMap<String, String>,
    objective: Option<f64>,
) -> PlacementProposal {
    let mut pool = pool_state.clone();
    for vm in pending_vms {
        pool.apply(vm, &plan[&vm.name]);
    }
    let utilization = pool.utilization_snapshot();
    let objective = objective.unwrap_or_else(|| {
        utilization
            .values()
            .map(|u| u.max_value())
            .fold(0.0_f64, f64::max)
    });
    PlacementProposal {
        plan,
        utilization,
        objective,
        by_cluster: pool.vm_distribution(),
    }
}

/// Constructs the placement strategy with the given name.
///
/// The seed, when present, makes heuristic tie-breaking reproducible; exact
/// strategies ignore it.
pub fn placement_strategy_resolver(
    name: &str,
    seed: Option<u64>,
) -> Result<Box<dyn PlacementStrategy>, PlacementError> {
    match name {
        "GlobalBalance" => Ok(Box::new(GlobalBalance::new())),
        "MaxMinUtilization" => Ok(Box::new(MaxMinUtilization::new())),
        "PerClusterBalance" => Ok(Box::new(PerClusterBalance::new())),
        "GreedyUtilization" => Ok(Box::new(match seed {
            Some(seed) => GreedyUtilization::with_seed(seed),
            None => GreedyUtilization::new(),
        })),
        "GreedyAvailability" => Ok(Box::new(match seed {
            Some(seed) => GreedyAvailability::with_seed(seed),
            None => GreedyAvailability::new(),
        })),
        "GreedyAvailabilityOrdered" => Ok(Box::new(GreedyAvailabilityOrdered::new())),
        other => Err(PlacementError::InvalidConfiguration(format!(
            "unknown placement strategy: {}",
            other
        ))),
    }
}
