use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{
    activation::activation::ActivationFunction,
    error::{Error, Result},
    math::matrix::Matrix,
    network::config::WeightInit,
};

/// Initial value of every bias.
pub const INITIAL_BIAS: f64 = 0.1;

/// (input_size, output_size) of a dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSize {
    input: usize,
    output: usize,
}

impl LayerSize {
    pub fn new(input: usize, output: usize) -> LayerSize {
        LayerSize { input, output }
    }

    pub fn input_size(&self) -> usize {
        self.input
    }

    pub fn output_size(&self) -> usize {
        self.output
    }
}

/// A dense layer: `a = f(W·x + b)`.
///
/// Holds no per-sample state. The caller keeps the input and
/// pre-activation of each forward step and hands them back for the
/// backward step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    size: LayerSize,
    /// Shape (output_size, input_size).
    weights: Matrix,
    /// Shape (output_size, 1).
    biases: Matrix,
    activator: ActivationFunction,
}

impl Layer {
    pub fn new<R: Rng + ?Sized>(
        size: LayerSize,
        activation: ActivationFunction,
        init: WeightInit,
        rng: &mut R,
    ) -> Layer {
        let (rows, cols) = (size.output_size(), size.input_size());
        let weights = match init {
            WeightInit::Uniform => Matrix::uniform(rows, cols, rng),
            WeightInit::Xavier => Matrix::xavier(rows, cols, rng),
            WeightInit::He => Matrix::he(rows, cols, rng),
        };

        Layer {
            size,
            weights,
            biases: Matrix::filled(rows, 1, INITIAL_BIAS),
            activator: activation,
        }
    }

    pub fn size(&self) -> LayerSize {
        self.size
    }

    pub fn activation(&self) -> ActivationFunction {
        self.activator
    }

    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    pub fn biases(&self) -> &Matrix {
        &self.biases
    }

    /// Replaces the weights; the new matrix must have the layer's shape.
    pub fn set_weights(&mut self, weights: Matrix) -> Result<()> {
        check_shape(&self.weights, &weights, "set_weights")?;
        self.weights = weights;
        Ok(())
    }

    /// Replaces the biases; the new matrix must be (output_size, 1).
    pub fn set_biases(&mut self, biases: Matrix) -> Result<()> {
        check_shape(&self.biases, &biases, "set_biases")?;
        self.biases = biases;
        Ok(())
    }

    /// Confirms the stored matrices agree with `size`. Needed after
    /// deserialization, where the parts arrive independently.
    pub fn validate(&self) -> Result<()> {
        let (rows, cols) = (self.size.output_size(), self.size.input_size());
        check_shape(&Matrix::zeros(rows, cols), &self.weights, "layer weights")?;
        check_shape(&Matrix::zeros(rows, 1), &self.biases, "layer biases")
    }

    /// Forward step on a column vector. Returns `(z, a)`: the pre-activation
    /// `W·x + b` and the activated output.
    pub fn feed_from(&self, input: &Matrix) -> Result<(Matrix, Matrix)> {
        let z = self.weights.multiply(input)?.add(&self.biases)?;
        let a = self.activator.activate_vector(&z);
        Ok((z, a))
    }

    /// `f'(z)` for this layer's activation.
    pub fn activation_derivative(&self, pre_activation: &Matrix) -> Matrix {
        self.activator.derivative_vector(pre_activation)
    }

    /// Computes gradient adjustments. Returns (weights_grad, biases_grad).
    ///
    /// `delta` is ∂L/∂z for this layer and already includes the activation
    /// derivative. `input` is the column vector this layer consumed in the
    /// matching forward step.
    ///   weights_grad = δ·xᵀ + λ·W
    ///   biases_grad  = δ
    pub fn compute_gradients(
        &self,
        delta: &Matrix,
        input: &Matrix,
        lambda: f64,
    ) -> Result<(Matrix, Matrix)> {
        let weights_grad = delta
            .multiply(&input.transpose())?
            .add(&self.weights.scalar_multiply(lambda))?;
        Ok((weights_grad, delta.clone()))
    }

    /// Propagates δ through this layer's weights: Wᵀ·δ, i.e. ∂L/∂a of the
    /// layer below. The caller still has to multiply by that layer's
    /// activation derivative.
    pub fn propagate(&self, delta: &Matrix) -> Result<Matrix> {
        self.weights.transpose().multiply(delta)
    }

    /// Applies pre-computed gradients scaled by lr.
    pub fn apply_gradients(&mut self, weights_grad: &Matrix, biases_grad: &Matrix, lr: f64) -> Result<()> {
        self.weights = self.weights.subtract(&weights_grad.scalar_multiply(lr))?;
        self.biases = self.biases.subtract(&biases_grad.scalar_multiply(lr))?;
        Ok(())
    }

    /// Σ W² for the L2 penalty.
    pub fn sum_squared_weights(&self) -> f64 {
        self.weights.power(2.0).sum()
    }
}

fn check_shape(expected: &Matrix, found: &Matrix, op: &'static str) -> Result<()> {
    if expected.shape() != found.shape() {
        return Err(Error::DimensionMismatch { op, left: expected.shape(), right: found.shape() });
    }
    Ok(())
}
