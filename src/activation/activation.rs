use serde::{Serialize, Deserialize};
use std::f64::consts::E;

use crate::math::matrix::Matrix;

/// Slope used by `LeakyReLU` for non-positive inputs.
pub const LEAKY_SLOPE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    Linear,
    Sigmoid,
    #[serde(rename = "leaky_relu")]
    LeakyReLU,
    /// Vector-valued: normalizes across the whole layer output, so it goes
    /// through `activate_vector` rather than element-wise `activate`. Only
    /// valid on the output layer.
    Softmax,
}

impl ActivationFunction {
    /// Element-wise activation. For `Softmax` this is the unnormalized
    /// exponential; use `activate_vector` for the real output.
    pub fn activate(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Linear => x,
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::LeakyReLU => if x > 0.0 { x } else { LEAKY_SLOPE * x },
            ActivationFunction::Softmax => x.exp(),
        }
    }

    /// Element-wise derivative, evaluated at the pre-activation `x`.
    ///
    /// `Softmax` returns `1.0`: the network pairs it with cross-entropy and
    /// seeds the backward pass with `prediction - target`, which already is
    /// the gradient w.r.t. the logits.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Linear => 1.0,
            ActivationFunction::Sigmoid => {
                let fx = self.activate(x);
                fx * (1.0 - fx)
            }
            ActivationFunction::LeakyReLU => if x > 0.0 { 1.0 } else { LEAKY_SLOPE },
            ActivationFunction::Softmax => 1.0,
        }
    }

    /// Applies the activation to a whole pre-activation vector.
    pub fn activate_vector(&self, z: &Matrix) -> Matrix {
        match self {
            ActivationFunction::Softmax => softmax(z),
            _ => z.map(|x| self.activate(x)),
        }
    }

    /// Element-wise derivative over a pre-activation vector.
    pub fn derivative_vector(&self, z: &Matrix) -> Matrix {
        z.map(|x| self.derivative(x))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActivationFunction::Linear => "linear",
            ActivationFunction::Sigmoid => "sigmoid",
            ActivationFunction::LeakyReLU => "leaky_relu",
            ActivationFunction::Softmax => "softmax",
        }
    }

    pub fn from_name(name: &str) -> Option<ActivationFunction> {
        match name {
            "linear" => Some(ActivationFunction::Linear),
            "sigmoid" => Some(ActivationFunction::Sigmoid),
            "leaky_relu" => Some(ActivationFunction::LeakyReLU),
            "softmax" => Some(ActivationFunction::Softmax),
            _ => None,
        }
    }
}

/// Numerically stable softmax: shifting by the max keeps every exponent
/// at most zero, so finite inputs of any magnitude cannot overflow. The
/// largest term is exp(0) = 1, so the sum is never below 1.
fn softmax(z: &Matrix) -> Matrix {
    let max = z.as_slice().iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps = z.map(|x| (x - max).exp());
    exps.scalar_multiply(1.0 / exps.sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn linear_is_identity() {
        let f = ActivationFunction::Linear;
        assert_eq!(f.activate(-3.5), -3.5);
        assert_eq!(f.derivative(42.0), 1.0);
    }

    #[test]
    fn sigmoid_values() {
        let f = ActivationFunction::Sigmoid;
        assert!((f.activate(0.0) - 0.5).abs() < TOL);
        assert!((f.derivative(0.0) - 0.25).abs() < TOL);
        assert!(f.activate(40.0) <= 1.0);
    }

    #[test]
    fn leaky_relu_values() {
        let f = ActivationFunction::LeakyReLU;
        assert_eq!(f.activate(2.0), 2.0);
        assert!((f.activate(-2.0) + 0.02).abs() < TOL);
        assert_eq!(f.derivative(2.0), 1.0);
        assert_eq!(f.derivative(-2.0), 0.01);
        assert_eq!(f.derivative(0.0), 0.01);
    }

    #[test]
    fn softmax_normalizes_whole_vector() {
        let z = Matrix::column(vec![1.0, 2.0, 3.0]);
        let a = ActivationFunction::Softmax.activate_vector(&z);
        assert!((a.sum() - 1.0).abs() < TOL);
        let s = a.as_slice();
        assert!(s[0] < s[1] && s[1] < s[2]);
        let denom = 1f64.exp() + 2f64.exp() + 3f64.exp();
        assert!((s[2] - 3f64.exp() / denom).abs() < TOL);
    }

    #[test]
    fn softmax_survives_huge_logits() {
        let z = Matrix::column(vec![1000.0, 1000.0, -1000.0]);
        let a = ActivationFunction::Softmax.activate_vector(&z);
        assert!(a.as_slice().iter().all(|x| x.is_finite()));
        assert!((a.as_slice()[0] - 0.5).abs() < TOL);
    }

    #[test]
    fn names_round_trip() {
        for f in [
            ActivationFunction::Linear,
            ActivationFunction::Sigmoid,
            ActivationFunction::LeakyReLU,
            ActivationFunction::Softmax,
        ] {
            assert_eq!(ActivationFunction::from_name(f.name()), Some(f));
        }
        assert_eq!(ActivationFunction::from_name("tanh"), None);
    }

    proptest! {
        #[test]
        fn softmax_sums_to_one(values in prop::collection::vec(-1.0e300f64..1.0e300, 1..12)) {
            let a = ActivationFunction::Softmax.activate_vector(&Matrix::column(values));
            prop_assert!((a.sum() - 1.0).abs() < 1e-9);
            prop_assert!(a.as_slice().iter().all(|&x| (0.0..=1.0).contains(&x)));
        }
    }
}
