use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;

/// Selects which scalar loss the network reports while training.
///
/// - `SquaredError` — 0.5·Σ(t − p)² / input_size plus the L2 penalty; pair
///   with Linear, Sigmoid or LeakyReLU output.
/// - `CrossEntropy` — −Σ t·ln(p); pair with Softmax output. Its gradient is
///   the combined Softmax+CE shortcut (prediction − target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    SquaredError,
    CrossEntropy,
}

impl LossType {
    /// The loss a network reports when none is configured.
    pub fn default_for(output: ActivationFunction) -> LossType {
        match output {
            ActivationFunction::Softmax => LossType::CrossEntropy,
            _ => LossType::SquaredError,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LossType::SquaredError => "squared_error",
            LossType::CrossEntropy => "cross_entropy",
        }
    }
}
