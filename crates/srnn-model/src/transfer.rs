//! Transfer function family applied to a neuron's combined input

use crate::config::CoreConfig;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Scalar transfer functions selectable per neuron.
///
/// `Elu` and `Selu` read their `alpha`/`lambda` parameters from the
/// process-wide [`CoreConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TransferFunction {
    /// f(x) = x
    #[default]
    Identity,
    /// f(x) = 1 / (1 + e^-x)
    Sigmoid,
    /// f(x) = tanh(x)
    Tanh,
    /// f(x) = x for x ≥ 0, α(e^x − 1) otherwise
    Elu,
    /// Scaled ELU: λ·f_elu(x)
    Selu,
    /// f(x) = max(0, x)
    Relu,
}

impl TransferFunction {
    /// Every selectable transfer function, in enumeration order
    pub const ALL: [TransferFunction; 6] = [
        TransferFunction::Identity,
        TransferFunction::Sigmoid,
        TransferFunction::Tanh,
        TransferFunction::Elu,
        TransferFunction::Selu,
        TransferFunction::Relu,
    ];

    /// Apply the function to the given data
    pub fn value(&self, config: &CoreConfig, data: f64) -> f64 {
        match self {
            TransferFunction::Identity => data,
            TransferFunction::Sigmoid => 1.0 / (1.0 + (-data).exp()),
            TransferFunction::Tanh => data.tanh(),
            TransferFunction::Elu => {
                if data < 0.0 {
                    config.alpha * (data.exp() - 1.0)
                } else {
                    data
                }
            }
            TransferFunction::Selu => {
                if data < 0.0 {
                    config.alpha * (data.exp() - 1.0) * config.lambda
                } else {
                    data
                }
            }
            TransferFunction::Relu => data.max(0.0),
        }
    }

    /// Derivative of the function at the given data point
    pub fn derivative(&self, config: &CoreConfig, data: f64) -> f64 {
        match self {
            TransferFunction::Identity => 1.0,
            TransferFunction::Sigmoid => data.exp() / (data.exp() + 1.0).powi(2),
            TransferFunction::Tanh => 1.0 / data.cosh(),
            TransferFunction::Elu => {
                if data <= 0.0 {
                    config.alpha * data.exp()
                } else {
                    1.0
                }
            }
            TransferFunction::Selu => {
                if data <= 0.0 {
                    config.lambda * config.alpha * data.exp()
                } else {
                    config.lambda
                }
            }
            TransferFunction::Relu => {
                if data <= 0.0 {
                    0.0
                } else {
                    1.0
                }
            }
        }
    }

    /// Average magnitude of the function's output, used by weight
    /// initialisers to scale starting values
    pub fn average_output_range(&self) -> f64 {
        match self {
            TransferFunction::Sigmoid | TransferFunction::Tanh => 1.0,
            _ => 50.0,
        }
    }
}
