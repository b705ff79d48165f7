//! Exact strategy maximizing the fleet-wide minimum utilization.

use good_lp::{
    constraint, default_solver, variable, variables, Expression, Solution, SolverModel, Variable,
};
use indexmap::IndexMap;

use crate::core::common::{PlacementError, Resource, VmSpec};
use crate::core::placement_strategies::global_balance::solver_error;
use crate::core::placement_strategy::{build_proposal, PlacementProposal, PlacementStrategy};
use crate::core::resource_pool::ResourcePoolState;

/// Mirror image of
/// [`GlobalBalance`](crate::core::placement_strategies::global_balance::GlobalBalance):
/// the same binary assignment and capacity constraints, but the continuous
/// variable `z` bounds every post-placement cluster/resource utilization from
/// below and is maximized. Raising the least utilized pair pushes load toward
/// idle clusters, which is a materially different policy from capping the
/// single worst one. Ties among equally optimal assignments are
/// solver-dependent.
#[derive(Default)]
pub struct MaxMinUtilization;

impl MaxMinUtilization {
    pub fn new() -> Self {
        Default::default()
    }
}

impl PlacementStrategy for MaxMinUtilization {
    fn name(&self) -> &'static str {
        "MaxMinUtilization"
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
        let z = vars.add(variable());

        let mut model = vars.maximise(z).using(default_solver);

        // each pending VM is placed exactly once
        for vi in 0..pending_vms.len() {
            let assigned: Expression = (0..clusters.len())
                .map(|ci| Expression::from(x[&(vi, ci)]))
                .sum();
            model = model.with(constraint!(assigned == 1));
        }

        // capacity constraints plus the lower bound per cluster/resource pair
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
                model = model.with(constraint!(added_util + used / capacity >= z));
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
        // the solver objective is the minimum utilization, not the worst case
        // reported in the proposal, so let the builder compute the latter
        Ok(build_proposal(pool_state, pending_vms, plan, None))
    }
}
