//! Exact strategy minimizing the sum of per-cluster/resource utilizations.

use good_lp::{
    constraint, default_solver, variable, variables, Expression, Solution, SolverModel, Variable,
};
use indexmap::IndexMap;

use crate::core::common::{PlacementError, Resource, VmSpec};
use crate::core::placement_strategies::global_balance::solver_error;
use crate::core::placement_strategy::{build_proposal, PlacementProposal, PlacementStrategy};
use crate::core::resource_pool::ResourcePoolState;

/// Same assignment and capacity constraints as
/// [`GlobalBalance`](crate::core::placement_strategies::global_balance::GlobalBalance),
/// but instead of one shared bound it introduces a continuous variable
/// `z[c,r]` pinned by equality to the post-placement utilization of every
/// cluster/resource pair and minimizes their sum. The objective discourages
/// high total utilization summed over all pairs rather than the single worst
/// case, which is a materially different policy.
#[derive(Default)]
pub struct PerClusterBalance;

impl PerClusterBalance {
    pub fn new() -> Self {
        Default::default()
    }
}

impl PlacementStrategy for PerClusterBalance {
    fn name(&self) -> &'static str {
        "PerClusterBalance"
    }

    fn propose(
        &self,
        pool_state: &ResourcePoolState,
        pending_vms: &[VmSpec],
    ) -> Result<PlacementProposal, PlacementError> {
        if pending_vms.is_empty() {
            return Err(PlacementError::Infeasible("empty VM batch".to_string()));
        }
        let clusters = pool_state.cluster_names();

        let mut vars = variables!();
        let mut x = IndexMap::<(usize, usize), Variable>::new();
        for vi in 0..pending_vms.len() {
            for ci in 0..clusters.len() {
                x.insert((vi, ci), vars.add(variable().binary()));
            }
        }
        let mut z = IndexMap::<(usize, Resource), Variable>::new();
        for ci in 0..clusters.len() {
            for resource in Resource::ALL {
                z.insert((ci, resource), vars.add(variable()));
            }
        }

        let objective: Expression = z.values().map(|v| Expression::from(*v)).sum();
        let mut model = vars.minimise(objective).using(default_solver);

        // each pending VM is placed exactly once
        for vi in 0..pending_vms.len() {
            let assigned: Expression = (0..clusters.len())
                .map(|ci| Expression::from(x[&(vi, ci)]))
                .sum();
            model = model.with(constraint!(assigned == 1));
        }

        // capacity constraint plus utilization equality per cluster/resource pair
        for (ci, cluster) in clusters.iter().enumerate() {
            for resource in Resource::ALL {
                let capacity = pool_state.capacity(cluster, resource);
                let used = pool_state.utilization(cluster, resource) * capacity;
                let added: Expression = pending_vms
                    .iter()
                    .enumerate()
                    .map(|(vi, vm)| vm.demand.get(resource) * x[&(vi, ci)])
                    .sum();
                let added_util: Expression = pending_vms
                    .iter()
                    .enumerate()
                    .map(|(vi, vm)| (vm.demand.get(resource) / capacity) * x[&(vi, ci)])
                    .sum();
                model = model.with(constraint!(added + used <= capacity));
                model = model.with(constraint!(added_util + used / capacity == z[&(ci, resource)]));
            }
        }

        let solution = model.solve().map_err(solver_error)?;

        let mut plan = IndexMap::new();
        for (vi, vm) in pending_vms.iter().enumerate() {
            for (ci, cluster) in clusters.iter().enumerate() {
                if solution.value(x[&(vi, ci)]) > 0.5 {
                    plan.insert(vm.name.clone(), cluster.clone());
                }
            }
        }
        Ok(build_proposal(pool_state, pending_vms, plan, None))
    }
}
