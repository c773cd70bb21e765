//! Command implementations for the tune CLI.

pub mod cache;
pub mod fields;
pub mod megatron;
pub mod runs;
pub mod train;
pub mod types;

pub use types::{CacheCommand, MegatronCommand, TrainCommand};
