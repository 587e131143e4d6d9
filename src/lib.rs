//! Four-valued gate-level logic simulation.
//!
//! [`simulation`] holds the circuit graph and settles it to a fixed point, [`truth_table`] enumerates a single gate's behaviour, and
//! [`timing`] turns the changes from a settle into delayed events for playback.

pub mod config;
pub mod error;
pub mod import;
pub mod simulation;
pub mod timing;
pub mod truth_table;
pub(crate) mod utils;

pub use config::Config;
pub use error::{CircuitError, ConfigError, ImportError, InvalidSpec};
