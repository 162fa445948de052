#![deny(warnings)]
#![deny(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod deep;
pub mod error;
pub mod estimator;
pub mod graph;
pub mod rl;
pub mod sim;
pub mod telemetry;

pub use config::TrainerConfig;
pub use error::{DqnError, Result};
