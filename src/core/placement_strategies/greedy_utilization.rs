//! Greedy heuristic ranking clusters by current CPU utilization.

use std::cell::RefCell;

use indexmap::IndexMap;
use log::debug;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_pcg::Pcg64;

use crate::core::common::{AllocationVerdict, PlacementError, Resource, VmSpec};
use crate::core::placement_strategy::{build_proposal, PlacementProposal, PlacementStrategy};
use crate::core::resource_pool::ResourcePoolState;

/// Places each VM on the feasible cluster with the lowest current CPU
/// utilization. Memory and disk participate in the feasibility test only,
/// never in the ranking. Exact ties are broken uniformly at random.
pub struct GreedyUtilization {
    rng: RefCell<Pcg64>,
}

impl GreedyUtilization {
    /// Creates the heuristic with an entropy-derived seed; such runs are
    /// non-deterministic by design.
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Creates the heuristic with a fixed seed for reproducible tie-breaking.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: RefCell::new(Pcg64::seed_from_u64(seed)),
        }
    }
}

impl Default for GreedyUtilization {
    fn default() -> Self {
        Self::new()
    }
}

impl PlacementStrategy for GreedyUtilization {
    fn name(&self) -> &'static str {
        "GreedyUtilization"
    }

    fn propose(
        &self,
        pool_state: &ResourcePoolState,
        pending_vms: &[VmSpec],
    ) -> Result<PlacementProposal, PlacementError> {
        if pending_vms.is_empty() {
            return Err(PlacementError::Infeasible("empty VM batch".to_string()));
        }
        // work on a copy so a multi-VM batch sees cumulative effects
        let mut pool = pool_state.clone();
        let mut plan = IndexMap::new();
        for vm in pending_vms {
            let feasible: Vec<String> = pool
                .cluster_names()
                .into_iter()
                .filter(|c| pool.can_fit(&vm.demand, c) == AllocationVerdict::Success)
                .collect();
            if feasible.is_empty() {
                return Err(PlacementError::Infeasible(format!(
                    "no cluster can host VM {}",
                    vm.name
                )));
            }
            let best = feasible
                .iter()
                .map(|c| pool.utilization(c, Resource::Cpu))
                .fold(f64::INFINITY, f64::min);
            let tied: Vec<&String> = feasible
                .iter()
                .filter(|c| pool.utilization(c, Resource::Cpu) == best)
                .collect();
            let selected = if tied.len() > 1 {
                let choice = *tied.choose(&mut *self.rng.borrow_mut()).unwrap();
                debug!(
                    "{} clusters tied on CPU utilization {:.4}, randomly selected {}",
                    tied.len(),
                    best,
                    choice
                );
                choice.clone()
            } else {
                tied[0].clone()
            };
            pool.apply(vm, &selected);
            plan.insert(vm.name.clone(), selected);
        }
        Ok(build_proposal(pool_state, pending_vms, plan, None))
    }
}
