pub mod common;
pub mod config;
pub mod metrics;
pub mod placement_strategies;
pub mod placement_strategy;
pub mod resource_pool;
