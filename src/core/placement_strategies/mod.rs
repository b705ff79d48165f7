//! Implementations of the placement strategies.

pub mod global_balance;
pub mod greedy_availability;
pub mod greedy_availability_ordered;
pub mod greedy_utilization;
pub mod max_min_utilization;
pub mod per_cluster_balance;
