use crate::error::{Error, Result};

/// Categorical cross-entropy, paired with a Softmax output layer.
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// L = −Σ expected[i]·ln(predicted[i])
    ///
    /// Undefined unless every prediction is strictly positive; a zero or
    /// negative component yields `Error::UndefinedLoss` instead of an
    /// infinity or NaN.
    pub fn loss(predicted: &[f64], expected: &[f64]) -> Result<f64> {
        if let Some((index, &value)) = predicted.iter().enumerate().find(|(_, p)| !(**p > 0.0)) {
            return Err(Error::UndefinedLoss { index, value });
        }
        Ok(predicted.iter().zip(expected.iter())
            .map(|(p, e)| -e * p.ln())
            .sum())
    }

    /// Gradient of Softmax + cross-entropy w.r.t. the logits:
    ///   ∂L/∂z_i = predicted[i] − expected[i]
    ///
    /// This seeds the backward pass directly; the Softmax layer contributes
    /// no further derivative factor.
    pub fn derivative(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        predicted.iter().zip(expected.iter())
            .map(|(p, e)| p - e)
            .collect()
    }
}
