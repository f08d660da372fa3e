//! Findings aggregation.
//!
//! Collection of findings per STIG filter, tool tallies, and the builder
//! that runs both across the three severity tiers.

pub mod aggregator;
pub mod builder;
pub mod collector;

pub use aggregator::*;
pub use builder::{AggregationBuilder, BuildOptions, VersionOrdering};
pub use collector::CollectorOptions;
