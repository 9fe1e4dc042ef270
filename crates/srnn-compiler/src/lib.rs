//! Compiler turning network descriptions into tiled execution plans
//!
//! The compiler walks a [`Network`] in dependency order and packs its
//! neurons into a matrix of self-contained compute tiles:
//!
//! - [`NeuronRouter`] picks, row by row, the neurons whose inputs are
//!   already available at the current time step;
//! - [`PartialSolutionBuilder`] packs picked neurons into one tile with a
//!   private weight table and tile-local input references;
//! - [`SolutionBuilder`] drives both, closing tiles on budget or
//!   output-range boundaries, and assembles the final [`Solution`].
//!
//! All compile-time failures surface to the caller; no partial plan is
//! ever returned.

#![deny(missing_docs)]
#![warn(clippy::all)]

use srnn_model::{
    input_index_from_synapse_index, is_input_index, ModelError, Network, SynapseInterval,
};

// Core modules
pub mod partial_builder;
pub mod router;
pub mod solution_builder;

// Re-export essential types
pub use partial_builder::PartialSolutionBuilder;
pub use router::NeuronRouter;
pub use solution_builder::SolutionBuilder;

/// Result alias for compiler operations
pub type Result<T> = std::result::Result<T, CompileError>;

/// Errors that can occur while compiling a network
#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    /// A neuron of the described network violates the model invariants
    #[error("Malformed network: {reason}")]
    MalformedNetwork {
        /// Reason the description was rejected
        reason: String,
    },

    /// The router cannot make progress; no remaining neuron is schedulable
    #[error("Cyclic dependency: {unvisited} neurons cannot be scheduled")]
    CyclicDependency {
        /// Number of neurons left unscheduled
        unvisited: usize,
    },

    /// A single neuron does not fit the device byte budget
    #[error(
        "Budget exceeded: neuron {neuron_index} needs an estimated {estimated_bytes} bytes \
         of a {budget_bytes} byte budget"
    )]
    BudgetExceeded {
        /// The neuron that could not be placed
        neuron_index: u32,
        /// Estimated tile footprint including the neuron
        estimated_bytes: usize,
        /// Configured device byte budget
        budget_bytes: usize,
    },

    /// Invalid configuration supplied to the compiler
    #[error("Configuration error: {0}")]
    Config(#[from] ModelError),
}

impl CompileError {
    /// Create a malformed-network error
    pub fn malformed_network(reason: impl Into<String>) -> Self {
        Self::MalformedNetwork {
            reason: reason.into(),
        }
    }
}

/// Validate a network description against the model invariants.
///
/// Checks every neuron's synapse shape, every index reference against the
/// weight table, neuron array, and input vector bounds, and every past
/// reach against the declared memory size.
pub fn validate_network(network: &Network) -> Result<()> {
    if network.neuron_array.is_empty() {
        return Err(CompileError::malformed_network("network has no neurons"));
    }
    if network.output_neuron_number == 0 {
        return Err(CompileError::malformed_network(
            "network has no output neurons",
        ));
    }
    if network.output_neuron_number as usize > network.neuron_count() {
        return Err(CompileError::malformed_network(format!(
            "output neuron number {} exceeds neuron count {}",
            network.output_neuron_number,
            network.neuron_count()
        )));
    }

    let neuron_count = network.neuron_count() as i32;
    let weight_count = network.weight_table.len() as u32;
    for (neuron_index, neuron) in network.neuron_array.iter().enumerate() {
        if !neuron.is_valid() {
            return Err(CompileError::malformed_network(format!(
                "neuron {} declares fewer weights than inputs or a zero-sized synapse",
                neuron_index
            )));
        }
        if neuron.spike_parameter_weight_index >= weight_count {
            return Err(CompileError::malformed_network(format!(
                "neuron {} spike parameter index {} is outside the weight table",
                neuron_index, neuron.spike_parameter_weight_index
            )));
        }
        for synapse in &neuron.input_weights {
            if synapse.starts < 0
                || (synapse.starts as u32 + synapse.interval_size) > weight_count
            {
                return Err(CompileError::malformed_network(format!(
                    "neuron {} weight synapse [{}; {}] is outside the weight table",
                    neuron_index, synapse.starts, synapse.interval_size
                )));
            }
        }
        for synapse in &neuron.input_indices {
            if synapse.reach_past_loops >= network.memory_size.max(1) {
                return Err(CompileError::malformed_network(format!(
                    "neuron {} reaches {} loops into the past with a memory size of {}",
                    neuron_index, synapse.reach_past_loops, network.memory_size
                )));
            }
            if is_input_index(synapse.starts) {
                if synapse.reach_past_loops != 0 {
                    return Err(CompileError::malformed_network(format!(
                        "neuron {} reads network inputs from the past",
                        neuron_index
                    )));
                }
                let deepest = synapse
                    .last_index()
                    .map(input_index_from_synapse_index)
                    .unwrap_or(0);
                if deepest >= network.input_data_size {
                    return Err(CompileError::malformed_network(format!(
                        "neuron {} references input {} of an input vector of size {}",
                        neuron_index, deepest, network.input_data_size
                    )));
                }
            } else if synapse.starts + synapse.interval_size as i32 > neuron_count {
                return Err(CompileError::malformed_network(format!(
                    "neuron {} input synapse [{}; {}] is outside the neuron array",
                    neuron_index, synapse.starts, synapse.interval_size
                )));
            }
        }
    }
    Ok(())
}

/// Compile a network into a tiled execution plan.
///
/// `optimise_for_throughput` enables strict routing from the first row,
/// trading more tiles for greater independence between them.
pub fn compile(
    network: &Network,
    device_max_bytes: usize,
    max_workers_per_row: usize,
    optimise_for_throughput: bool,
) -> Result<srnn_model::Solution> {
    let config = srnn_model::CoreConfig::new()
        .with_device_max_bytes(device_max_bytes)
        .with_max_solve_threads(max_workers_per_row);
    SolutionBuilder::new(&config).build(network, optimise_for_throughput)
}
