//! Deterministic variant of the spare-capacity heuristic.

use indexmap::IndexMap;

use crate::core::common::{AllocationVerdict, PlacementError, VmSpec};
use crate::core::placement_strategies::greedy_availability::{lex_greater, spare_capacity};
use crate::core::placement_strategy::{build_proposal, PlacementProposal, PlacementStrategy};
use crate::core::resource_pool::ResourcePoolState;

/// Same `(cpu, mem, disk)` lexicographic ranking as
/// [`GreedyAvailability`](crate::core::placement_strategies::greedy_availability::GreedyAvailability),
/// but without randomness: when clusters tie on all three values, the first
/// one in configured order wins.
#[derive(Default)]
pub struct GreedyAvailabilityOrdered;

impl GreedyAvailabilityOrdered {
    pub fn new() -> Self {
        Default::default()
    }
}

impl PlacementStrategy for GreedyAvailabilityOrdered {
    fn name(&self) -> &'static str {
        "GreedyAvailabilityOrdered"
    }

    fn propose(
        &self,
        pool_state: &ResourcePoolState,
        pending_vms: &[VmSpec],
    ) -> Result<PlacementProposal, PlacementError> {
        if pending_vms.is_empty() {
            return Err(PlacementError::Infeasible("empty VM batch".to_string()));
        }
        let mut pool = pool_state.clone();
        let mut plan = IndexMap::new();
        for vm in pending_vms {
            let mut selected: Option<String> = None;
            let mut best = [0.0; 3];
            for cluster in pool.cluster_names() {
                if pool.can_fit(&vm.demand, &cluster) != AllocationVerdict::Success {
                    continue;
                }
                let spare = spare_capacity(&pool, &cluster);
                if selected.is_none() || lex_greater(&spare, &best) {
                    best = spare;
                    selected = Some(cluster);
                }
            }
            let selected = selected.ok_or_else(|| {
                PlacementError::Infeasible(format!("no cluster can host VM {}", vm.name))
            })?;
            pool.apply(vm, &selected);
            plan.insert(vm.name.clone(), selected);
        }
        Ok(build_proposal(pool_state, pending_vms, plan, None))
    }
}
