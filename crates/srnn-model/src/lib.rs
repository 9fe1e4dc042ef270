//! Network description model for the sparse recurrent network runtime
//!
//! This crate holds the data every other layer of the runtime agrees on:
//! the run-length encoded synapse intervals and their iterator, the
//! transfer and spike function families, the network description itself
//! (plus a builder for dense layered networks), and the compiled plan
//! schemas (`Solution` / `PartialSolution`) produced by the compiler and
//! consumed by the runtime engine.

#![deny(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod error;
pub mod iterator;
pub mod network;
pub mod neuron;
pub mod solution;
pub mod spike;
pub mod synapse;
pub mod transfer;
pub mod weight_init;

// Re-export essential types
pub use config::CoreConfig;
pub use error::{ModelError, Result};
pub use iterator::SynapseIterator;
pub use network::{Network, NetworkBuilder, Recurrence, WeightInit};
pub use neuron::Neuron;
pub use solution::{PartialSolution, Solution};
pub use spike::SpikeFunction;
pub use synapse::{
    encode_input_index, input_index_from_synapse_index, is_input_index, IndexSynapseInterval,
    InputSynapseInterval, SynapseInterval,
};
pub use transfer::TransferFunction;
pub use weight_init::{DenseWeightInitializer, WeightInitializer};

/// Schema version for compatibility checking of persisted networks and solutions
pub const SCHEMA_VERSION: u32 = 1;
