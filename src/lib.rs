//! Browse Environment Agency flood-monitoring stations, pick a measure, and
//! view its last 24 hours of readings.

pub mod app;
pub mod catalog;
pub mod cli;
pub mod directory;
pub mod display;
pub mod ea;
pub mod error;
pub mod flow;
pub mod load;
pub mod logging;
pub mod series;
pub mod worker;

#[cfg(test)]
mod testing;
