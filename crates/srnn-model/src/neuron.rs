//! Network-level neuron description

use crate::iterator::SynapseIterator;
use crate::spike::SpikeFunction;
use crate::synapse::{IndexSynapseInterval, InputSynapseInterval};
use crate::transfer::TransferFunction;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One neuron of the described network.
///
/// `input_indices` lists the inputs consumed in order; `input_weights`
/// lists weight-table ranges applied in the same order. Weights beyond the
/// number of inputs act as additive biases, so the total weight element
/// count must be at least the total input element count.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Neuron {
    /// Transfer function applied to the combined input
    pub transfer_function: TransferFunction,
    /// Spike function filtering the activation over time
    pub spike_function: SpikeFunction,
    /// Weight-table index of the spike function parameter
    pub spike_parameter_weight_index: u32,
    /// Ordered input references
    pub input_indices: Vec<InputSynapseInterval>,
    /// Ordered weight-table ranges
    pub input_weights: Vec<IndexSynapseInterval>,
}

impl Neuron {
    /// Total number of input elements across all input synapses
    pub fn input_element_count(&self) -> u32 {
        SynapseIterator::new(&self.input_indices).size()
    }

    /// Total number of weight elements across all weight synapses
    pub fn weight_element_count(&self) -> u32 {
        SynapseIterator::new(&self.input_weights).size()
    }

    /// Deepest past reach among the neuron's input synapses
    pub fn max_reach_past(&self) -> u32 {
        self.input_indices
            .iter()
            .map(|s| s.reach_past_loops)
            .max()
            .unwrap_or(0)
    }

    /// Structural validity: no zero-sized synapses, and at least as many
    /// weights as inputs. Network-level index validity is checked by the
    /// compiler.
    pub fn is_valid(&self) -> bool {
        self.input_indices.iter().all(|s| s.interval_size > 0)
            && self.input_weights.iter().all(|s| s.interval_size > 0)
            && self.weight_element_count() >= self.input_element_count()
    }

    /// Estimated bytes this neuron contributes to a compute tile: its copied
    /// weight scalars, its spike parameter, its interval encodings, and the
    /// per-neuron bookkeeping entries.
    pub fn estimated_size_bytes(&self) -> usize {
        use std::mem::size_of;
        (1 + self.weight_element_count() as usize) * size_of::<f64>()
            + self.input_weights.len() * size_of::<IndexSynapseInterval>()
            + self.input_indices.len() * size_of::<InputSynapseInterval>()
            + 4 * size_of::<u32>()
    }
}
