use std::path::Path;

use serde::{Serialize, Deserialize};
use tracing::{debug, info, trace, warn};

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::layers::dense::Layer;
use crate::loss::{cross_entropy::CrossEntropyLoss, loss_type::LossType, squared_error::SquaredErrorLoss};
use crate::math::matrix::Matrix;
use crate::network::config::{check_lambda, check_layer_size, check_learning_rate};
use crate::network::forward::{ForwardPass, LayerTrace};
use crate::optim::sgd::Sgd;

/// A feedforward network with frozen topology.
///
/// Built through `NetworkConfig::build`, which guarantees that adjacent layer
/// sizes agree and that Softmax appears only on the output layer. Weights
/// change in place on every training step; the topology never does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    layers: Vec<Layer>,
    learning_rate: f64,
    lambda: f64,
    loss: LossType,
}

impl Network {
    pub(crate) fn from_parts(layers: Vec<Layer>, learning_rate: f64, lambda: f64, loss: LossType) -> Result<Network> {
        let network = Network { layers, learning_rate, lambda, loss };
        network.validate()?;
        Ok(network)
    }

    /// Re-checks the invariants `build` establishes, hyperparameters
    /// included. Needed for networks that arrive through deserialization.
    fn validate(&self) -> Result<()> {
        let last = self.layers.last().ok_or(Error::EmptyNetwork)?;
        for (index, layer) in self.layers.iter().enumerate() {
            check_layer_size(index, layer.size().input_size(), layer.size().output_size())?;
            layer.validate()?;
            if index > 0 {
                let found = self.layers[index - 1].size().output_size();
                let expected = layer.size().input_size();
                if found != expected {
                    return Err(Error::LayerSizeMismatch { index, expected, found });
                }
            }
            if layer.activation() == ActivationFunction::Softmax && index + 1 != self.layers.len() {
                return Err(Error::MisplacedSoftmax { index });
            }
        }
        if last.activation() == ActivationFunction::Softmax && self.loss == LossType::SquaredError {
            return Err(Error::IncompatibleLoss {
                loss: self.loss.name(),
                activation: last.activation().name(),
            });
        }
        check_learning_rate(self.learning_rate)?;
        check_lambda(self.lambda)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.size().input_size())
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.size().output_size())
    }

    pub fn loss_type(&self) -> LossType {
        self.loss
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) -> Result<()> {
        check_learning_rate(learning_rate)?;
        self.learning_rate = learning_rate;
        Ok(())
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    fn check_input(&self, input: &[f64]) -> Result<()> {
        let expected = self.input_size();
        if input.len() != expected {
            return Err(Error::InvalidInputSize { expected, actual: input.len() });
        }
        Ok(())
    }

    fn check_target(&self, target: &[f64]) -> Result<()> {
        let expected = self.output_size();
        if target.len() != expected {
            return Err(Error::DimensionMismatch {
                op: "target",
                left: (expected, 1),
                right: (target.len(), 1),
            });
        }
        Ok(())
    }

    /// Forward pass that keeps every layer's input, pre-activation and output.
    pub fn forward(&self, input: &[f64]) -> Result<ForwardPass> {
        self.check_input(input)?;

        let mut pass = ForwardPass::with_capacity(self.layers.len());
        let mut current = Matrix::column(input.to_vec());
        for layer in &self.layers {
            let (pre_activation, output) = layer.feed_from(&current)?;
            let next = output.clone();
            pass.push(LayerTrace { input: current, pre_activation, output });
            current = next;
        }
        Ok(pass)
    }

    /// Runs `input` through every layer and returns the output vector.
    pub fn predict(&self, input: &[f64]) -> Result<Vec<f64>> {
        Ok(self.forward(input)?.into_output())
    }

    fn sum_squared_weights(&self) -> f64 {
        self.layers.iter().map(Layer::sum_squared_weights).sum()
    }

    fn squared_error_of(&self, prediction: &[f64], target: &[f64]) -> f64 {
        SquaredErrorLoss::loss(prediction, target, self.input_size())
            + SquaredErrorLoss::penalty(self.lambda, self.sum_squared_weights())
    }

    fn loss_of(&self, prediction: &[f64], target: &[f64]) -> Result<f64> {
        match self.loss {
            LossType::SquaredError => Ok(self.squared_error_of(prediction, target)),
            LossType::CrossEntropy => CrossEntropyLoss::loss(prediction, target),
        }
    }

    /// 0.5·Σ(t − p)² / input_size + (λ/2)·Σ W² for one sample.
    pub fn squared_error(&self, input: &[f64], target: &[f64]) -> Result<f64> {
        self.check_target(target)?;
        let prediction = self.predict(input)?;
        Ok(self.squared_error_of(&prediction, target))
    }

    /// −Σ t·ln(p) for one sample; fails if any prediction is not positive.
    pub fn cross_entropy_error(&self, input: &[f64], target: &[f64]) -> Result<f64> {
        self.check_target(target)?;
        let prediction = self.predict(input)?;
        CrossEntropyLoss::loss(&prediction, target)
    }

    /// The configured loss for one sample, without touching the weights.
    pub fn loss(&self, input: &[f64], target: &[f64]) -> Result<f64> {
        match self.loss {
            LossType::SquaredError => self.squared_error(input, target),
            LossType::CrossEntropy => self.cross_entropy_error(input, target),
        }
    }

    fn check_batch(&self, inputs: &[Vec<f64>], targets: &[Vec<f64>]) -> Result<()> {
        if inputs.len() != targets.len() {
            return Err(Error::BatchSizeMismatch { inputs: inputs.len(), targets: targets.len() });
        }
        for (input, target) in inputs.iter().zip(targets) {
            self.check_input(input)?;
            self.check_target(target)?;
        }
        Ok(())
    }

    /// One pass of per-sample SGD over the batch. Returns the mean loss,
    /// each sample's loss taken from its forward pass before the update.
    ///
    /// The learning rate and every sample's shape are checked before the
    /// first update, so a rejected call leaves the weights untouched. A
    /// sample whose cross-entropy is undefined (a prediction saturated to 0)
    /// is still trained and contributes an infinite loss.
    pub fn train(&mut self, inputs: &[Vec<f64>], targets: &[Vec<f64>], learning_rate: f64) -> Result<f64> {
        check_learning_rate(learning_rate)?;
        self.check_batch(inputs, targets)?;
        if inputs.is_empty() {
            return Ok(0.0);
        }

        let optimizer = Sgd::new(learning_rate);
        let mut total_loss = 0.0;
        for (input, target) in inputs.iter().zip(targets) {
            let loss = self.train_sample(input, target, &optimizer)?;
            trace!(loss, "sample trained");
            total_loss += loss;
        }

        Ok(total_loss / inputs.len() as f64)
    }

    /// `train` with the network's configured learning rate.
    pub fn train_default(&mut self, inputs: &[Vec<f64>], targets: &[Vec<f64>]) -> Result<f64> {
        self.train(inputs, targets, self.learning_rate)
    }

    fn train_sample(&mut self, input: &[f64], target: &[f64], optimizer: &Sgd) -> Result<f64> {
        let pass = self.forward(input)?;
        let prediction = pass.output();
        let loss = match self.loss_of(prediction, target) {
            Err(Error::UndefinedLoss { index, value }) => {
                warn!(index, value, "prediction saturated, reporting infinite loss");
                f64::INFINITY
            }
            other => other?,
        };

        let last = self.layers.len() - 1;
        let traces = pass.traces();

        // Output delta. With Softmax the combined cross-entropy gradient
        // (p − t) is already ∂L/∂z; otherwise scale by f'(z).
        let output_layer = &self.layers[last];
        let mut delta = match output_layer.activation() {
            ActivationFunction::Softmax => {
                Matrix::column(CrossEntropyLoss::derivative(prediction, target))
            }
            _ => Matrix::column(SquaredErrorLoss::derivative(prediction, target))
                .elementwise_multiply(&output_layer.activation_derivative(&traces[last].pre_activation))?,
        };

        // Borrow-checker ordering: compute gradients → compute next delta → apply step.
        // The propagated delta must use the weights from before this update.
        for i in (0..=last).rev() {
            let (weights_grad, biases_grad) =
                self.layers[i].compute_gradients(&delta, &traces[i].input, self.lambda)?;

            if i > 0 {
                let below = &self.layers[i - 1];
                delta = self.layers[i]
                    .propagate(&delta)?
                    .elementwise_multiply(&below.activation_derivative(&traces[i - 1].pre_activation))?;
            }

            optimizer.step(&mut self.layers[i], &weights_grad, &biases_grad)?;
        }

        Ok(loss)
    }

    /// Repeats `train` for `epochs` passes at the configured learning rate and
    /// returns the mean loss of the last pass.
    pub fn fit(&mut self, inputs: &[Vec<f64>], targets: &[Vec<f64>], epochs: usize) -> Result<f64> {
        let mut last_loss = 0.0;
        for epoch in 1..=epochs {
            last_loss = self.train_default(inputs, targets)?;
            debug!(epoch, epochs, loss = last_loss, "epoch finished");
        }
        info!(epochs, loss = last_loss, "training finished");
        Ok(last_loss)
    }

    /// Mean configured loss over a dataset, without updating weights.
    pub fn evaluate(&self, inputs: &[Vec<f64>], targets: &[Vec<f64>]) -> Result<f64> {
        self.check_batch(inputs, targets)?;
        if inputs.is_empty() {
            return Ok(0.0);
        }
        let mut total = 0.0;
        for (input, target) in inputs.iter().zip(targets) {
            total += self.loss(input, target)?;
        }
        Ok(total / inputs.len() as f64)
    }

    /// Fraction of samples whose prediction argmax matches the target argmax.
    pub fn accuracy(&self, inputs: &[Vec<f64>], targets: &[Vec<f64>]) -> Result<f64> {
        self.check_batch(inputs, targets)?;
        if inputs.is_empty() {
            return Ok(0.0);
        }
        let mut correct = 0usize;
        for (input, target) in inputs.iter().zip(targets) {
            if argmax(&self.predict(input)?) == argmax(target) {
                correct += 1;
            }
        }
        Ok(correct as f64 / inputs.len() as f64)
    }

    /// Serializes the whole network (topology, weights, hyperparameters) to a
    /// pretty-printed JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        info!(path = %path.display(), "saved network json");
        Ok(())
    }

    /// Deserializes a network written by `save_json`, re-checking topology
    /// and hyperparameters.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Network> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let network: Network = serde_json::from_reader(reader)?;
        network.validate()?;
        info!(path = %path.display(), layers = network.layers.len(), "loaded network json");
        Ok(network)
    }
}

/// Index of the maximum element in a slice (first on ties, 0 when empty).
pub fn argmax(v: &[f64]) -> usize {
    let mut best = 0;
    for (i, &x) in v.iter().enumerate() {
        if x > v[best] {
            best = i;
        }
    }
    best
}
