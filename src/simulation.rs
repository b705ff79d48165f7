//! Sequential placement simulation driver.

use std::time::Instant;

use indexmap::IndexMap;
use log::{info, warn};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::Serialize;

use crate::core::common::{PlacementError, Resource, ResourceVector, VmSpec};
use crate::core::config::ScenarioConfig;
use crate::core::metrics::PlacementMetrics;
use crate::core::placement_strategy::{placement_strategy_resolver, PlacementStrategy};
use crate::core::resource_pool::{ResourcePoolState, UtilizationSnapshot};

/// Driver states. A run stops on the first infeasible placement or once the
/// VM quota is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SimulationState {
    Running,
    Exhausted,
    Failed,
}

/// Outcome of a single driver step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StepOutcome {
    /// The VM was placed and its usage delta committed.
    Placed { vm: String, cluster: String },
    /// The strategy reported infeasibility; the run is stopped with partial
    /// history retained.
    Failed { vm: String },
    /// The driver is in a terminal state, nothing was attempted.
    Stopped,
}

/// History record for one committed placement.
#[derive(Debug, Clone, Serialize)]
pub struct PlacementRecord {
    pub vm: String,
    pub cluster: String,
    pub demand: ResourceVector,
    pub utilization: UtilizationSnapshot,
    /// Strategy call duration in seconds.
    pub step_duration: f64,
}

/// Aggregated results of a finished or stopped run, consumable by any
/// reporting, plotting or persistence layer.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub scenario: String,
    pub strategy: String,
    pub state: SimulationState,
    pub success: bool,
    pub error: Option<String>,
    /// Total wall time spent in steps, in seconds.
    pub total_time: f64,
    pub vms_placed: usize,
    pub min_placement_time: f64,
    pub avg_placement_time: f64,
    pub max_placement_time: f64,
    pub final_utilization: UtilizationSnapshot,
    pub final_metrics: Option<PlacementMetrics>,
    pub metrics_history: Vec<PlacementMetrics>,
    pub cluster_distribution: IndexMap<String, Vec<String>>,
}

/// Drives a sequence of placements against a single resource pool.
///
/// On each step the driver synthesizes one VM demand by uniform sampling,
/// invokes the configured strategy, commits the successful proposal to the
/// pool state and records history. The driver is the sole writer of the pool
/// state; strategies only read it and return proposed plans.
pub struct SequentialSimulation {
    config: ScenarioConfig,
    pool_state: ResourcePoolState,
    strategy: Box<dyn PlacementStrategy>,
    rng: Pcg64,
    state: SimulationState,
    next_vm: u32,
    placement_history: Vec<PlacementRecord>,
    metrics_history: Vec<PlacementMetrics>,
    step_times: Vec<f64>,
    total_time: f64,
    failure: Option<String>,
}

impl SequentialSimulation {
    /// Validates the configuration and sets up pool state, strategy and RNG.
    pub fn new(config: ScenarioConfig) -> Result<Self, PlacementError> {
        config.validate()?;
        let mut pool_state = ResourcePoolState::new();
        for (name, capacity, utilization) in config.cluster_instances()? {
            pool_state.add_cluster(&name, capacity, utilization);
        }
        let strategy = placement_strategy_resolver(&config.strategy, config.seed)?;
        let rng = match config.seed {
            Some(seed) => Pcg64::seed_from_u64(seed),
            None => Pcg64::from_entropy(),
        };
        Ok(Self {
            config,
            pool_state,
            strategy,
            rng,
            state: SimulationState::Running,
            next_vm: 0,
            placement_history: Vec::new(),
            metrics_history: Vec::new(),
            step_times: Vec::new(),
            total_time: 0.,
            failure: None,
        })
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn pool_state(&self) -> &ResourcePoolState {
        &self.pool_state
    }

    pub fn placement_history(&self) -> &[PlacementRecord] {
        &self.placement_history
    }

    pub fn metrics_history(&self) -> &[PlacementMetrics] {
        &self.metrics_history
    }

    fn generate_vm(&mut self) -> VmSpec {
        let name = format!("vm{}", self.next_vm + 1);
        let mut demand = ResourceVector::default();
        for resource in Resource::ALL {
            let (low, high) = self.config.vm_demand_ranges.get(resource);
            *demand.get_mut(resource) = self.rng.gen_range(low..=high);
        }
        VmSpec { name, demand }
    }

    /// Performs one placement step.
    ///
    /// Infeasibility is an expected outcome handled locally by stopping the
    /// run; solver failures propagate to the caller.
    pub fn run_step(&mut self) -> Result<StepOutcome, PlacementError> {
        if self.state != SimulationState::Running {
            return Ok(StepOutcome::Stopped);
        }
        if self.next_vm >= self.config.num_vms {
            self.state = SimulationState::Exhausted;
            return Ok(StepOutcome::Stopped);
        }

        let step_start = Instant::now();
        let vm = self.generate_vm();
        self.next_vm += 1;
        info!(
            "placing {} ({}/{}) with strategy {}",
            vm.name,
            self.next_vm,
            self.config.num_vms,
            self.strategy.name()
        );

        let propose_start = Instant::now();
        let result = self.strategy.propose(&self.pool_state, std::slice::from_ref(&vm));
        let step_duration = propose_start.elapsed().as_secs_f64();
        self.step_times.push(step_duration);

        let outcome = match result {
            Ok(proposal) => {
                let cluster = proposal.plan[&vm.name].clone();
                self.pool_state.apply(&vm, &cluster);
                self.metrics_history.push(PlacementMetrics::compute(
                    &proposal.utilization,
                    &self.config.resource_weights,
                ));
                self.placement_history.push(PlacementRecord {
                    vm: vm.name.clone(),
                    cluster: cluster.clone(),
                    demand: vm.demand,
                    utilization: proposal.utilization,
                    step_duration,
                });
                if self.next_vm >= self.config.num_vms {
                    self.state = SimulationState::Exhausted;
                }
                Ok(StepOutcome::Placed { vm: vm.name, cluster })
            }
            Err(PlacementError::Infeasible(reason)) => {
                warn!("failed to place {}: {}", vm.name, reason);
                self.state = SimulationState::Failed;
                self.failure = Some(format!("failed to place {}: {}", vm.name, reason));
                Ok(StepOutcome::Failed { vm: vm.name })
            }
            Err(other) => Err(other),
        };
        self.total_time += step_start.elapsed().as_secs_f64();
        outcome
    }

    /// Runs steps until a terminal state is reached and returns the summary.
    pub fn run(&mut self) -> Result<RunSummary, PlacementError> {
        while self.state == SimulationState::Running {
            self.run_step()?;
        }
        Ok(self.summarize())
    }

    /// Summarizes results collected so far, including partial history from a
    /// failed run.
    pub fn summarize(&self) -> RunSummary {
        let vms_placed = self.placement_history.len();
        let (min, max, sum) = self.step_times.iter().fold(
            (f64::INFINITY, 0.0_f64, 0.0_f64),
            |(min, max, sum), t| (min.min(*t), max.max(*t), sum + t),
        );
        let error = if vms_placed == 0 {
            Some(
                self.failure
                    .clone()
                    .unwrap_or_else(|| "no VMs were successfully placed".to_string()),
            )
        } else {
            self.failure.clone()
        };
        RunSummary {
            scenario: self.config.name.clone(),
            strategy: self.config.strategy.clone(),
            state: self.state,
            success: vms_placed > 0,
            error,
            total_time: self.total_time,
            vms_placed,
            min_placement_time: if self.step_times.is_empty() { 0. } else { min },
            avg_placement_time: if self.step_times.is_empty() {
                0.
            } else {
                sum / self.step_times.len() as f64
            },
            max_placement_time: max,
            final_utilization: self.pool_state.utilization_snapshot(),
            final_metrics: self.metrics_history.last().cloned(),
            metrics_history: self.metrics_history.clone(),
            cluster_distribution: self.pool_state.vm_distribution(),
        }
    }
}
