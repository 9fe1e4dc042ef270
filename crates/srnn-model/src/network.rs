//! Network description and a builder for dense layered networks

use crate::error::{ModelError, Result};
use crate::neuron::Neuron;
use crate::spike::SpikeFunction;
use crate::synapse::{encode_input_index, IndexSynapseInterval, InputSynapseInterval};
use crate::transfer::TransferFunction;
use crate::weight_init::{DenseWeightInitializer, WeightInitializer};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Complete description of a sparse recurrent network.
///
/// The description is immutable once compiled; all weight references are
/// indices into `weight_table`. The last `output_neuron_number` neurons are
/// the network's outputs.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Network {
    /// Length of the external input vector consumed per time step
    pub input_data_size: u32,
    /// Number of trailing neurons whose activations form the output
    pub output_neuron_number: u32,
    /// Number of past time steps any synapse of this network may reach into
    pub memory_size: u32,
    /// Process-global ordered weight storage
    pub weight_table: Vec<f64>,
    /// The neurons, in evaluation-reference order
    pub neuron_array: Vec<Neuron>,
}

impl Network {
    /// Start describing a network
    pub fn builder() -> NetworkBuilder {
        NetworkBuilder::new()
    }

    /// Number of neurons in the network
    pub fn neuron_count(&self) -> usize {
        self.neuron_array.len()
    }

    /// Deepest past reach among every synapse of the network
    pub fn max_reach_past(&self) -> u32 {
        self.neuron_array
            .iter()
            .map(|n| n.max_reach_past())
            .max()
            .unwrap_or(0)
    }
}

/// Recurrence wiring added by [`NetworkBuilder::dense_layers`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Recurrence {
    /// Pure feed-forward network
    #[default]
    None,
    /// Every neuron also reads its own activation from one step back
    ToSelf,
    /// Every neuron also reads its whole layer from one step back
    ToLayer,
}

/// Weight initialisation strategy of [`NetworkBuilder`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightInit {
    /// Every synapse weight set to `weight`, every bias to `bias`
    Constant {
        /// Synapse weight value
        weight: f64,
        /// Bias value
        bias: f64,
    },
    /// Seeded initialisation through [`DenseWeightInitializer`]; biases
    /// start at zero
    Random {
        /// RNG seed, for reproducible networks
        seed: u64,
    },
}

impl Default for WeightInit {
    fn default() -> Self {
        WeightInit::Constant {
            weight: 1.0,
            bias: 0.0,
        }
    }
}

/// Builder producing dense layered [`Network`] values.
///
/// Per neuron the weight table receives `[spike parameter, weights…, bias]`
/// so a neuron always carries one surplus weight acting as its bias.
#[derive(Debug, Clone)]
pub struct NetworkBuilder {
    input_size: u32,
    output_neuron_number: Option<u32>,
    memory_size: u32,
    expected_input_range: f64,
    transfer_function: TransferFunction,
    spike_function: SpikeFunction,
    spike_parameter: f64,
    spike_ratio_range: Option<(f64, f64)>,
    recurrence: Recurrence,
    weight_init: WeightInit,
}

impl NetworkBuilder {
    /// Create a builder with identity transfer, no spike filtering, and
    /// constant unit weights
    pub fn new() -> Self {
        Self {
            input_size: 0,
            output_neuron_number: None,
            memory_size: 1,
            expected_input_range: 1.0,
            transfer_function: TransferFunction::Identity,
            spike_function: SpikeFunction::None,
            spike_parameter: 0.0,
            spike_ratio_range: None,
            recurrence: Recurrence::None,
            weight_init: WeightInit::default(),
        }
    }

    /// Set the external input vector length
    pub fn input_size(mut self, size: u32) -> Self {
        self.input_size = size;
        self
    }

    /// Override the number of output neurons; defaults to the last layer
    pub fn output_neuron_number(mut self, count: u32) -> Self {
        self.output_neuron_number = Some(count);
        self
    }

    /// Set a minimum memory depth; recurrence raises it as needed
    pub fn memory_size(mut self, size: u32) -> Self {
        self.memory_size = size.max(1);
        self
    }

    /// Expected magnitude of the external inputs; scales random starting
    /// weights of the first layer
    pub fn expected_input_range(mut self, range: f64) -> Self {
        self.expected_input_range = range;
        self
    }

    /// Set the transfer function used by every neuron
    pub fn transfer_function(mut self, function: TransferFunction) -> Self {
        self.transfer_function = function;
        self
    }

    /// Set the spike function and its parameter used by every neuron
    pub fn spike_function(mut self, function: SpikeFunction, parameter: f64) -> Self {
        self.spike_function = function;
        self.spike_parameter = parameter;
        self
    }

    /// Draw random-mode spike parameters from `[min, max]` instead of the
    /// fixed parameter given to [`spike_function`](Self::spike_function)
    pub fn spike_ratio_range(mut self, min: f64, max: f64) -> Self {
        self.spike_ratio_range = Some((min, max));
        self
    }

    /// Add recurrent wiring to the built layers
    pub fn recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = recurrence;
        self
    }

    /// Choose the weight initialisation strategy
    pub fn weight_init(mut self, init: WeightInit) -> Self {
        self.weight_init = init;
        self
    }

    /// Build a fully connected network with the given layer sizes
    pub fn dense_layers(self, layers: &[u32]) -> Result<Network> {
        if self.input_size == 0 {
            return Err(ModelError::invalid_parameter(
                "input_size",
                "0",
                "> 0",
            ));
        }
        if layers.is_empty() || layers.iter().any(|&size| size == 0) {
            return Err(ModelError::invalid_config(
                "dense_layers requires at least one layer and no empty layers",
            ));
        }

        let neuron_count: u32 = layers.iter().sum();
        let output_neuron_number = self
            .output_neuron_number
            .unwrap_or(layers[layers.len() - 1]);
        if output_neuron_number == 0 || output_neuron_number > neuron_count {
            return Err(ModelError::invalid_parameter(
                "output_neuron_number",
                output_neuron_number.to_string(),
                "within 1..=neuron count",
            ));
        }

        let (spike_ratio_min, spike_ratio_max) = self
            .spike_ratio_range
            .unwrap_or((self.spike_parameter, self.spike_parameter));
        let mut initializer = DenseWeightInitializer::new(match self.weight_init {
            WeightInit::Random { seed } => seed,
            WeightInit::Constant { .. } => 0,
        })
        .with_spike_ratio_range(spike_ratio_min, spike_ratio_max);

        let mut network = Network {
            input_data_size: self.input_size,
            output_neuron_number,
            memory_size: self.memory_size,
            weight_table: Vec::new(),
            neuron_array: Vec::with_capacity(neuron_count as usize),
        };

        let mut layer_start: u32 = 0;
        for (layer_index, &layer_size) in layers.iter().enumerate() {
            let previous_size = if layer_index == 0 {
                self.input_size
            } else {
                layers[layer_index - 1]
            };
            let previous_start = if layer_index == 0 {
                0
            } else {
                layer_start - previous_size
            };
            initializer.set_expectations(
                previous_size,
                if layer_index == 0 {
                    self.expected_input_range
                } else {
                    self.transfer_function.average_output_range()
                },
            );

            for neuron_in_layer in 0..layer_size {
                let neuron_index = layer_start + neuron_in_layer;
                let mut input_indices = vec![if layer_index == 0 {
                    InputSynapseInterval::new(encode_input_index(0), previous_size)
                } else {
                    InputSynapseInterval::new(previous_start as i32, previous_size)
                }];
                match self.recurrence {
                    Recurrence::None => {}
                    Recurrence::ToSelf => {
                        input_indices.push(InputSynapseInterval::reaching_back(
                            neuron_index as i32,
                            1,
                            1,
                        ));
                    }
                    Recurrence::ToLayer => {
                        input_indices.push(InputSynapseInterval::reaching_back(
                            layer_start as i32,
                            layer_size,
                            1,
                        ));
                    }
                }

                let input_count: u32 = input_indices.iter().map(|s| s.interval_size).sum();
                let spike_parameter_weight_index = network.weight_table.len() as u32;
                // The raw parameter; compilation normalises it per variant
                network.weight_table.push(match self.weight_init {
                    WeightInit::Constant { .. } => self.spike_parameter,
                    WeightInit::Random { .. } => initializer.next_spike_parameter(),
                });

                let weights_start = network.weight_table.len() as i32;
                for _ in 0..input_count {
                    network.weight_table.push(match self.weight_init {
                        WeightInit::Constant { weight, .. } => weight,
                        WeightInit::Random { .. } => {
                            initializer.next_weight_for(self.transfer_function)
                        }
                    });
                }
                network.weight_table.push(match self.weight_init {
                    WeightInit::Constant { bias, .. } => bias,
                    WeightInit::Random { .. } => initializer.next_bias(),
                });

                network.neuron_array.push(Neuron {
                    transfer_function: self.transfer_function,
                    spike_function: self.spike_function,
                    spike_parameter_weight_index,
                    input_indices,
                    // weights plus the trailing bias in one contiguous run
                    input_weights: vec![IndexSynapseInterval::new(weights_start, input_count + 1)],
                });
            }
            layer_start += layer_size;
        }

        network.memory_size = network.memory_size.max(1 + network.max_reach_past());
        Ok(network)
    }
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iterator::SynapseIterator;

    #[test]
    fn test_dense_layers_shape() {
        let network = Network::builder()
            .input_size(5)
            .dense_layers(&[2, 3, 4])
            .unwrap();

        assert_eq!(network.neuron_count(), 9);
        assert_eq!(network.output_neuron_number, 4);
        assert_eq!(network.memory_size, 1);
        // 5,2,3 fan-ins plus spike parameter and bias per neuron
        let expected_weights: usize =
            (2 * (5 + 2)) + (3 * (2 + 2)) + (4 * (3 + 2));
        assert_eq!(network.weight_table.len(), expected_weights);
        for neuron in &network.neuron_array {
            assert!(neuron.is_valid());
            assert_eq!(
                neuron.weight_element_count(),
                neuron.input_element_count() + 1
            );
        }
    }

    #[test]
    fn test_first_layer_reads_external_inputs() {
        let network = Network::builder()
            .input_size(3)
            .dense_layers(&[2, 1])
            .unwrap();
        let mut inputs = Vec::new();
        SynapseIterator::new(&network.neuron_array[0].input_indices)
            .iterate_indices(|_, index| inputs.push(index));
        assert_eq!(inputs, vec![-1, -2, -3]);

        // Second layer references the first layer's neuron indices
        let mut hidden = Vec::new();
        SynapseIterator::new(&network.neuron_array[2].input_indices)
            .iterate_indices(|_, index| hidden.push(index));
        assert_eq!(hidden, vec![0, 1]);
    }

    #[test]
    fn test_self_recurrence_deepens_memory() {
        let network = Network::builder()
            .input_size(2)
            .recurrence(Recurrence::ToSelf)
            .dense_layers(&[2, 1])
            .unwrap();
        assert_eq!(network.memory_size, 2);
        let recurrent = network.neuron_array[2].input_indices.last().unwrap();
        assert_eq!(recurrent.starts, 2);
        assert_eq!(recurrent.reach_past_loops, 1);
    }

    #[test]
    fn test_random_spike_parameters_draw_from_ratio_range() {
        let network = Network::builder()
            .input_size(2)
            .spike_function(SpikeFunction::Memory, 0.5)
            .spike_ratio_range(0.2, 0.8)
            .weight_init(WeightInit::Random { seed: 5 })
            .dense_layers(&[4, 2])
            .unwrap();
        for neuron in &network.neuron_array {
            let parameter =
                network.weight_table[neuron.spike_parameter_weight_index as usize];
            assert!((0.2..=0.8).contains(&parameter));
        }

        // Without a range, random mode keeps the configured parameter
        let fixed = Network::builder()
            .input_size(2)
            .spike_function(SpikeFunction::Memory, 0.5)
            .weight_init(WeightInit::Random { seed: 5 })
            .dense_layers(&[2])
            .unwrap();
        for neuron in &fixed.neuron_array {
            assert_eq!(
                fixed.weight_table[neuron.spike_parameter_weight_index as usize],
                0.5
            );
        }
    }

    #[test]
    fn test_random_init_is_reproducible() {
        let build = || {
            Network::builder()
                .input_size(4)
                .weight_init(WeightInit::Random { seed: 99 })
                .dense_layers(&[3, 2])
                .unwrap()
        };
        assert_eq!(build().weight_table, build().weight_table);
    }

    #[test]
    fn test_rejects_empty_layers() {
        assert!(Network::builder().input_size(2).dense_layers(&[]).is_err());
        assert!(Network::builder()
            .input_size(2)
            .dense_layers(&[3, 0, 2])
            .is_err());
        assert!(Network::builder().dense_layers(&[3]).is_err());
    }
}
