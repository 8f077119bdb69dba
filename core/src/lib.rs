//! Territory planning engine: capacity, equity, projection and
//! what-if analytics over a team's book of business.
//!
//! Start with [`planner::TerritoryPlanner`]; the other modules are the
//! pure calculations it runs after every scenario change.

pub mod benchmark;
pub mod config;
pub mod equity;
pub mod error;
pub mod export;
pub mod health;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod planner;
pub mod projection;
pub mod recommendation;
pub mod rng;
pub mod types;
