//! Tools for evaluating multiple scenarios, each with fully isolated state.

use std::sync::mpsc;

use threadpool::ThreadPool;

use crate::core::common::PlacementError;
use crate::core::config::ScenarioConfig;
use crate::simulation::{RunSummary, SequentialSimulation};

/// Runs a set of scenarios on a thread pool.
///
/// Every scenario owns an entirely separate simulation, so no state is shared
/// between workers and no locking discipline is required.
pub struct Experiment {
    configs: Vec<ScenarioConfig>,
    threads: usize,
}

impl Experiment {
    pub fn new(configs: Vec<ScenarioConfig>, threads: usize) -> Self {
        Self {
            configs,
            threads: threads.max(1),
        }
    }

    /// Runs all scenarios and returns their results in submission order.
    pub fn run(self) -> Vec<Result<RunSummary, PlacementError>> {
        let pool = ThreadPool::new(self.threads);
        let (tx, rx) = mpsc::channel();
        let count = self.configs.len();
        for (idx, config) in self.configs.into_iter().enumerate() {
            let tx = tx.clone();
            pool.execute(move || {
                let result = SequentialSimulation::new(config).and_then(|mut sim| sim.run());
                let _ = tx.send((idx, result));
            });
        }
        drop(tx);

        let mut results: Vec<Result<RunSummary, PlacementError>> = (0..count)
            .map(|_| {
                Err(PlacementError::SolverFailure(
                    "scenario worker terminated without result".to_string(),
                ))
            })
            .collect();
        for (idx, result) in rx {
            results[idx] = result;
        }
        results
    }
}
