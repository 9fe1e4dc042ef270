//! Starting-value generation for network weight tables

use crate::transfer::TransferFunction;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Weight amplitudes never shrink below this, however large the fan-in
const MIN_AMPLITUDE: f64 = 1e-15;

/// Source of starting values for a network's weight table.
///
/// Implementations are consulted per value while a builder lays out the
/// table, after being told what inputs the consuming neurons expect.
pub trait WeightInitializer {
    /// Configure the expectations the upcoming values are scaled by: how
    /// many inputs a neuron combines and their expected magnitude
    fn set_expectations(&mut self, expected_input_number: u32, expected_input_maximum: f64);

    /// Next synapse weight for a neuron using the given transfer function
    fn next_weight_for(&mut self, transfer_function: TransferFunction) -> f64;

    /// Next spike function parameter
    fn next_spike_parameter(&mut self) -> f64;

    /// Next bias value
    fn next_bias(&mut self) -> f64;
}

/// Seeded initializer for fully connected feed-forward layers.
///
/// Rectifier-family transfer functions get Kaiming-scaled amplitudes;
/// bounded ones are additionally scaled down by the expected input
/// magnitude. Spike parameters are drawn from a configurable ratio range
/// and biases start at zero.
#[derive(Debug, Clone)]
pub struct DenseWeightInitializer {
    rng: StdRng,
    expected_input_number: u32,
    expected_input_maximum: f64,
    spike_ratio_min: f64,
    spike_ratio_max: f64,
}

impl DenseWeightInitializer {
    /// Create a reproducible initializer from a seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            expected_input_number: 1,
            expected_input_maximum: 1.0,
            spike_ratio_min: 0.0,
            spike_ratio_max: 0.0,
        }
    }

    /// Draw spike parameters from `[min, max]`, both clamped into `[0, 1]`
    pub fn with_spike_ratio_range(mut self, min: f64, max: f64) -> Self {
        self.spike_ratio_min = min.clamp(0.0, 1.0);
        self.spike_ratio_max = max.clamp(self.spike_ratio_min, 1.0);
        self
    }

    fn weight_amplitude(&self, transfer_function: TransferFunction) -> f64 {
        let amplitude = match transfer_function {
            TransferFunction::Elu | TransferFunction::Relu | TransferFunction::Selu => {
                (2.0 / self.expected_input_number as f64).sqrt()
            }
            _ => {
                (2.0 / (self.expected_input_number as f64 * self.expected_input_maximum)).sqrt()
            }
        };
        amplitude.max(MIN_AMPLITUDE)
    }
}

impl WeightInitializer for DenseWeightInitializer {
    fn set_expectations(&mut self, expected_input_number: u32, expected_input_maximum: f64) {
        self.expected_input_number = expected_input_number.max(1);
        self.expected_input_maximum = expected_input_maximum.abs().max(MIN_AMPLITUDE);
    }

    fn next_weight_for(&mut self, transfer_function: TransferFunction) -> f64 {
        let sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        sign * self.rng.gen_range(0.0..self.weight_amplitude(transfer_function))
    }

    fn next_spike_parameter(&mut self) -> f64 {
        if self.spike_ratio_min < self.spike_ratio_max {
            self.rng
                .gen_range(self.spike_ratio_min..self.spike_ratio_max)
        } else {
            self.spike_ratio_min
        }
    }

    fn next_bias(&mut self) -> f64 {
        0.0
    }
}
