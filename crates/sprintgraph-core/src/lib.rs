//! Plan normalization, task graph construction, and graph metrics.

pub mod allocation;
pub mod plan;
pub mod schedule;
