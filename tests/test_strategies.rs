use vmplace::core::common::{PlacementError, Resource, ResourceVector, VmSpec};
use vmplace::core::placement_strategies::greedy_availability::GreedyAvailability;
use vmplace::core::placement_strategies::greedy_utilization::GreedyUtilization;
use vmplace::core::placement_strategy::{placement_strategy_resolver, PlacementStrategy};
use vmplace::core::resource_pool::ResourcePoolState;

const ALL_STRATEGIES: [&str; 6] = [
    "GlobalBalance",
    "MaxMinUtilization",
    "PerClusterBalance",
    "GreedyUtilization",
    "GreedyAvailability",
    "GreedyAvailabilityOrdered",
];

fn strategy(name: &str) -> Box<dyn PlacementStrategy> {
    placement_strategy_resolver(name, Some(123)).unwrap()
}

// Pool with `count` identical clusters c1..cN of the given capacity and
// initial utilization on every resource.
fn uniform_pool(count: usize, capacity: f64, utilization: f64) -> ResourcePoolState {
    let mut pool = ResourcePoolState::new();
    for i in 0..count {
        pool.add_cluster(
            &format!("c{}", i + 1),
            ResourceVector::splat(capacity),
            ResourceVector::splat(utilization),
        );
    }
    pool
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

#[test]
// Every strategy must place a single VM on an empty pool, and the resulting
// utilization of the chosen cluster must equal demand / capacity exactly.
fn test_all_strategies_place_vm_on_empty_pool() {
    for name in ALL_STRATEGIES {
        let pool = uniform_pool(2, 100., 0.);
        let vm = VmSpec::new("vm1", ResourceVector::new(10., 20., 15.));
        let proposal = strategy(name).propose(&pool, &[vm]).unwrap();

        let cluster = proposal.plan["vm1"].clone();
        let utilization = proposal.utilization[&cluster];
        assert_close(utilization.cpu, 0.10);
        assert_close(utilization.mem, 0.20);
        assert_close(utilization.disk, 0.15);
        // the other cluster is untouched
        for (other, u) in &proposal.utilization {
            if *other != cluster {
                assert_close(u.cpu, 0.);
                assert_close(u.mem, 0.);
                assert_close(u.disk, 0.);
            }
        }
        assert_eq!(proposal.by_cluster[&cluster], vec!["vm1".to_string()]);
    }
}

#[test]
// With every cluster at 95% utilization a VM demanding 10% more does not fit
// anywhere, and every strategy must report infeasibility rather than clamp.
fn test_all_strategies_infeasible_at_high_utilization() {
    for name in ALL_STRATEGIES {
        let pool = uniform_pool(3, 100., 0.95);
        let vm = VmSpec::new("vm1", ResourceVector::splat(10.));
        let result = strategy(name).propose(&pool, &[vm]);
        assert!(
            matches!(result, Err(PlacementError::Infeasible(_))),
            "strategy {} did not report infeasibility",
            name
        );
    }
}

#[test]
// GlobalBalance minimizes the single worst post-placement utilization, so the
// VM must land on the less loaded cluster.
fn test_global_balance_prefers_less_loaded_cluster() {
    let mut pool = ResourcePoolState::new();
    pool.add_cluster(
        "a",
        ResourceVector::splat(100.),
        ResourceVector::new(0.8, 0., 0.),
    );
    pool.add_cluster(
        "b",
        ResourceVector::splat(100.),
        ResourceVector::new(0.2, 0., 0.),
    );
    let vm = VmSpec::new("vm1", ResourceVector::splat(10.));
    let proposal = strategy("GlobalBalance").propose(&pool, &[vm]).unwrap();

    assert_eq!(proposal.plan["vm1"], "b");
    // the worst case stays cluster a's CPU utilization
    assert!((proposal.objective - 0.8).abs() < 1e-6);
}

#[test]
// MaxMinUtilization raises the least utilized cluster/resource pair, so the
// VM must also land on the less loaded cluster here.
fn test_max_min_utilization_raises_least_loaded_cluster() {
    let mut pool = ResourcePoolState::new();
    pool.add_cluster("a", ResourceVector::splat(100.), ResourceVector::splat(0.6));
    pool.add_cluster("b", ResourceVector::splat(100.), ResourceVector::splat(0.2));
    let vm = VmSpec::new("vm1", ResourceVector::splat(10.));
    let proposal = strategy("MaxMinUtilization").propose(&pool, &[vm]).unwrap();

    // placing on b lifts the minimum to 0.3; placing on a leaves it at 0.2
    assert_eq!(proposal.plan["vm1"], "b");
    assert_close(proposal.utilization["b"].cpu, 0.3);
}

#[test]
// PerClusterBalance minimizes the sum of utilizations over all
// cluster/resource pairs, so a cluster with larger capacity (smaller
// fractional delta for the same demand) wins.
fn test_per_cluster_balance_prefers_larger_cluster() {
    let mut pool = ResourcePoolState::new();
    pool.add_cluster("big", ResourceVector::splat(200.), ResourceVector::splat(0.));
    pool.add_cluster("small", ResourceVector::splat(100.), ResourceVector::splat(0.));
    let vm = VmSpec::new("vm1", ResourceVector::splat(10.));
    let proposal = strategy("PerClusterBalance").propose(&pool, &[vm]).unwrap();

    assert_eq!(proposal.plan["vm1"], "big");
}

#[test]
// GreedyUtilization ranks by CPU utilization only; memory and disk matter for
// feasibility but never for the ranking.
fn test_greedy_utilization_ranks_by_cpu_only() {
    let mut pool = ResourcePoolState::new();
    pool.add_cluster(
        "a",
        ResourceVector::splat(100.),
        ResourceVector::new(0.3, 0.9, 0.),
    );
    pool.add_cluster(
        "b",
        ResourceVector::splat(100.),
        ResourceVector::new(0.5, 0., 0.),
    );
    let vm = VmSpec::new("vm1", ResourceVector::splat(5.));
    let proposal = strategy("GreedyUtilization").propose(&pool, &[vm]).unwrap();

    // a wins on CPU despite its nearly full memory
    assert_eq!(proposal.plan["vm1"], "a");
}

#[test]
// GreedyAvailability breaks spare CPU ties by spare memory.
fn test_greedy_availability_lexicographic_ranking() {
    let mut pool = ResourcePoolState::new();
    pool.add_cluster(
        "a",
        ResourceVector::splat(100.),
        ResourceVector::new(0.5, 0.9, 0.),
    );
    pool.add_cluster(
        "b",
        ResourceVector::splat(100.),
        ResourceVector::new(0.5, 0.7, 0.),
    );
    let vm = VmSpec::new("vm1", ResourceVector::splat(1.));
    for name in ["GreedyAvailability", "GreedyAvailabilityOrdered"] {
        let proposal = strategy(name).propose(&pool, &[vm.clone()]).unwrap();
        assert_eq!(proposal.plan["vm1"], "b", "strategy {}", name);
    }
}

#[test]
// The ordered variant resolves full ties by configured cluster order.
fn test_greedy_availability_ordered_takes_first_on_full_tie() {
    let pool = uniform_pool(3, 100., 0.2);
    let vm = VmSpec::new("vm1", ResourceVector::splat(5.));
    let proposal = strategy("GreedyAvailabilityOrdered")
        .propose(&pool, &[vm])
        .unwrap();
    assert_eq!(proposal.plan["vm1"], "c1");
}

#[test]
// Random tie-breaking is reproducible when the same seed is injected.
fn test_greedy_tie_break_is_seeded() {
    let pool = uniform_pool(4, 100., 0.);
    let vms: Vec<VmSpec> = (0..6)
        .map(|i| VmSpec::new(&format!("vm{}", i + 1), ResourceVector::splat(1.)))
        .collect();

    let first = GreedyUtilization::with_seed(7).propose(&pool, &vms).unwrap();
    let second = GreedyUtilization::with_seed(7).propose(&pool, &vms).unwrap();
    assert_eq!(first.plan, second.plan);

    let first = GreedyAvailability::with_seed(7).propose(&pool, &vms).unwrap();
    let second = GreedyAvailability::with_seed(7).propose(&pool, &vms).unwrap();
    assert_eq!(first.plan, second.plan);
}

#[test]
// A multi-VM batch sees cumulative effects: once the first VM raises one
// cluster's CPU utilization, the second VM must go to the other cluster.
fn test_greedy_batch_sees_cumulative_state() {
    let pool = uniform_pool(2, 100., 0.);
    let vms = vec![
        VmSpec::new("vm1", ResourceVector::splat(10.)),
        VmSpec::new("vm2", ResourceVector::splat(10.)),
    ];
    let proposal = strategy("GreedyUtilization").propose(&pool, &vms).unwrap();
    assert_ne!(proposal.plan["vm1"], proposal.plan["vm2"]);
}

#[test]
// If any VM of a batch cannot be placed the whole call fails and the input
// pool state is left untouched, for heuristics and exact strategies alike.
fn test_batch_failure_is_all_or_nothing() {
    for name in ALL_STRATEGIES {
        let pool = uniform_pool(1, 100., 0.5);
        let vms = vec![
            VmSpec::new("vm1", ResourceVector::splat(30.)),
            VmSpec::new("vm2", ResourceVector::splat(30.)),
        ];
        let result = strategy(name).propose(&pool, &vms);
        assert!(
            matches!(result, Err(PlacementError::Infeasible(_))),
            "strategy {} accepted an infeasible batch",
            name
        );
        // strategies never mutate the shared state
        for resource in Resource::ALL {
            assert_close(pool.utilization("c1", resource), 0.5);
        }
        assert!(pool.placements().is_empty());
    }
}

#[test]
// Exact strategies must respect capacity even when the balance objective
// would prefer the loaded cluster.
fn test_exact_strategies_skip_full_cluster() {
    for name in ["GlobalBalance", "MaxMinUtilization", "PerClusterBalance"] {
        let mut pool = ResourcePoolState::new();
        pool.add_cluster(
            "full",
            ResourceVector::splat(100.),
            ResourceVector::new(0.95, 0., 0.),
        );
        pool.add_cluster("free", ResourceVector::splat(100.), ResourceVector::splat(0.));
        let vm = VmSpec::new("vm1", ResourceVector::new(10., 1., 1.));
        let proposal = strategy(name).propose(&pool, &[vm]).unwrap();
        assert_eq!(proposal.plan["vm1"], "free", "strategy {}", name);
    }
}

#[test]
// Proposals carry the full per-cluster VM distribution, existing placements
// included.
fn test_proposal_reports_existing_placements() {
    let mut pool = uniform_pool(2, 100., 0.);
    pool.apply(&VmSpec::new("old", ResourceVector::splat(5.)), "c2");

    let vm = VmSpec::new("new", ResourceVector::splat(5.));
    let proposal = strategy("GreedyUtilization").propose(&pool, &[vm]).unwrap();

    let mut all: Vec<String> = proposal.by_cluster.values().flatten().cloned().collect();
    all.sort();
    assert_eq!(all, vec!["new".to_string(), "old".to_string()]);
}

#[test]
fn test_resolver_rejects_unknown_strategy() {
    let result = placement_strategy_resolver("FirstFit", None);
    assert!(matches!(
        result,
        Err(PlacementError::InvalidConfiguration(_))
    ));
}
