//! Greedy heuristic ranking clusters by spare capacity.

use std::cell::RefCell;

use indexmap::IndexMap;
use log::debug;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_pcg::Pcg64;

use crate::core::common::{AllocationVerdict, PlacementError, Resource, VmSpec};
use crate::core::placement_strategy::{build_proposal, PlacementProposal, PlacementStrategy};
use crate::core::resource_pool::ResourcePoolState;

/// Spare capacity of the cluster in absolute units, ordered for the
/// lexicographic ranking: CPU first, then memory, then disk.
pub(crate) fn spare_capacity(pool: &ResourcePoolState, cluster: &str) -> [f64; 3] {
    [
        pool.available(cluster, Resource::Cpu),
        pool.available(cluster, Resource::Mem),
        pool.available(cluster, Resource::Disk),
    ]
}

pub(crate) fn lex_greater(a: &[f64; 3], b: &[f64; 3]) -> bool {
    for i in 0..3 {
        if a[i] != b[i] {
            return a[i] > b[i];
        }
    }
    false
}

/// Places each VM on the feasible cluster with the most spare capacity,
/// compared lexicographically on `(cpu, mem, disk)`: CPU ties are broken by
/// spare memory, then spare disk. Only when all three values are exactly
/// equal is the winner chosen uniformly at random.
pub struct GreedyAvailability {
    rng: RefCell<Pcg64>,
}

impl GreedyAvailability {
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

impl Default for GreedyAvailability {
    fn default() -> Self {
        Self::new()
    }
}

impl PlacementStrategy for GreedyAvailability {
    fn name(&self) -> &'static str {
        "GreedyAvailability"
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
            let mut best = spare_capacity(&pool, &feasible[0]);
            for cluster in feasible.iter().skip(1) {
                let spare = spare_capacity(&pool, cluster);
                if lex_greater(&spare, &best) {
                    best = spare;
                }
            }
            let tied: Vec<&String> = feasible
                .iter()
                .filter(|c| spare_capacity(&pool, c) == best)
                .collect();
            let selected = if tied.len() > 1 {
                let choice = *tied.choose(&mut *self.rng.borrow_mut()).unwrap();
                debug!(
                    "{} clusters tied on spare capacity, randomly selected {}",
                    tied.len(),
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
