//! Exact strategy minimizing the fleet-wide worst-case utilization.

use good_lp::{
    constraint, default_solver, variable, variables, Expression, ResolutionError, Solution,
    SolverModel, Variable,
};
use indexmap::IndexMap;

use crate::core::common::{PlacementError, Resource, VmSpec};
use crate::core::placement_strategy::{build_proposal, PlacementProposal, PlacementStrategy};
use crate::core::resource_pool::ResourcePoolState;

/// Maps solver outcomes onto the engine error taxonomy: a proof of
/// infeasibility is expected, anything else means the solver gave up.
pub(crate) fn solver_error(err: ResolutionError) -> PlacementError {
    match err {
        ResolutionError::Infeasible => {
            PlacementError::Infeasible("no assignment satisfies capacity constraints".to_string())
        }
        other => PlacementError::SolverFailure(other.to_string()),
    }
}

/// Formulates placement as a mixed-integer program with binary assignment
/// variables `x[v,c]` and a single continuous variable `z` bounding the
/// post-placement utilization of every cluster/resource pair, then minimizes
/// `z`. The optimal assignment minimizes the single worst utilization value
/// across the entire fleet. Ties among equally optimal assignments are
/// solver-dependent.
#[derive(Default)]
pub struct GlobalBalance;

impl GlobalBalance {
    pub fn new() -> Self {
        Default::default()
    }
}

impl PlacementStrategy for GlobalBalance {
    fn name(&self) -> &'static str {
        "GlobalBalance"
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

        let mut model = vars.minimise(z).using(default_solver);

        // each pending VM is placed exactly once
        for vi in 0..pending_vms.len() {
            let assigned: Expression = (0..clusters.len())
                .map(|ci| Expression::from(x[&(vi, ci)]))
                .sum();
            model = model.with(constraint!(assigned == 1));
        }

        // capacity and balance constraints per cluster/resource pair
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
                model = model.with(constraint!(added_util + used / capacity <= z));
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
        let objective = solution.value(z);
        Ok(build_proposal(pool_state, pending_vms, plan, Some(objective)))
    }
}
