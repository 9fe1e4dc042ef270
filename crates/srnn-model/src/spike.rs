//! Spike function family filtering a neuron's activation over time

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Time filter between a neuron's new activation and its previous one.
///
/// Every variant is expressible as the memory form
/// `previous·p + new·(1−p)` for a suitable parameter; compiled tiles store
/// only that normalised parameter (see [`SpikeFunction::normalized_parameter`])
/// so the solver applies a single formula.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SpikeFunction {
    /// The new activation replaces the previous one unfiltered
    #[default]
    None,
    /// previous·p + new·(1−p)
    Memory,
    /// previous + p·(new − previous)
    Proportional,
}

impl SpikeFunction {
    /// Apply the memory-form filter with an already-normalised parameter
    pub fn filter(parameter: f64, new_data: f64, previous_data: f64) -> f64 {
        previous_data * parameter + new_data * (1.0 - parameter)
    }

    /// Derivative of the memory-form filter with respect to the new data
    pub fn filter_derivative(_parameter: f64, new_data: f64, previous_data: f64) -> f64 {
        previous_data - new_data
    }

    /// Apply this variant with its own raw parameter
    pub fn value(&self, parameter: f64, new_data: f64, previous_data: f64) -> f64 {
        Self::filter(self.normalized_parameter(parameter), new_data, previous_data)
    }

    /// Parameter to store in a compiled tile so the memory form reproduces
    /// this variant
    pub fn normalized_parameter(&self, parameter: f64) -> f64 {
        match self {
            SpikeFunction::None => 0.0,
            SpikeFunction::Memory => parameter,
            SpikeFunction::Proportional => 1.0 - parameter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_passes_through() {
        assert_eq!(SpikeFunction::None.value(0.7, 3.0, 100.0), 3.0);
    }

    #[test]
    fn test_memory_filters_towards_previous() {
        let out = SpikeFunction::Memory.value(0.5, 1.0, 0.0);
        assert!((out - 0.5).abs() < 1e-12);
        let out = SpikeFunction::Memory.value(0.5, 1.5, 0.5);
        assert!((out - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_proportional_mirrors_memory() {
        // previous + p(new - previous) == memory form with parameter 1-p
        let proportional = SpikeFunction::Proportional.value(0.3, 2.0, 1.0);
        let memory = SpikeFunction::Memory.value(0.7, 2.0, 1.0);
        assert!((proportional - memory).abs() < 1e-12);
    }
}
