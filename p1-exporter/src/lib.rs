pub mod collector;
pub mod config;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod sources;
pub mod telegram;

#[cfg(test)]
mod testing;

pub use collector::{Collector, MeterCollector};
pub use pipeline::{LineSource, Pipeline};
