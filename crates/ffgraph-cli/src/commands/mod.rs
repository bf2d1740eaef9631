//! CLI command implementations.

pub mod compile;
pub mod filters;
