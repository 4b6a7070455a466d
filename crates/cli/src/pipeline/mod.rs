//! Bridge orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{Bridge, BridgeRunConfig};
pub use stats::BridgeStats;
