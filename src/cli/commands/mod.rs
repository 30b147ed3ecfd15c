//! CLI command implementations.

pub mod batch;
pub mod execute;
pub mod plan;
pub mod scan;
