use std::path::Path;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Serialize, Deserialize};
use tracing::info;

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::layers::dense::{Layer, LayerSize};
use crate::loss::loss_type::LossType;
use crate::network::network::Network;

pub const DEFAULT_LEARNING_RATE: f64 = 0.1;

/// Describes one layer in a network configuration.
///
/// Fields:
/// - `input_size`  — values feeding into this layer (the previous layer's
///                   output size, or the raw input dimension for the first)
/// - `output_size` — neurons in this layer
/// - `activation`  — activation applied after the affine transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub input_size: usize,
    pub output_size: usize,
    pub activation: ActivationFunction,
}

/// How initial weights are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightInit {
    /// U[0, 1).
    #[default]
    Uniform,
    Xavier,
    He,
}

/// Architecture plus hyperparameters. Topology is freely editable here;
/// `build` validates it once and freezes it into a `Network`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Ordered list of layer descriptions (input → output).
    #[serde(default)]
    pub layers: Vec<LayerSpec>,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// L2 regularization coefficient.
    #[serde(default)]
    pub lambda: f64,
    /// Seed for weight initialization; equal seeds give equal networks.
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub init: WeightInit,
    /// Reported loss. `None` picks cross-entropy for a Softmax output and
    /// squared error otherwise.
    #[serde(default)]
    pub loss: Option<LossType>,
}

fn default_learning_rate() -> f64 {
    DEFAULT_LEARNING_RATE
}

pub(crate) fn check_layer_size(index: usize, input_size: usize, output_size: usize) -> Result<()> {
    if input_size == 0 || output_size == 0 {
        return Err(Error::InvalidConfig(format!("layer {index} has a zero size")));
    }
    Ok(())
}

pub(crate) fn check_learning_rate(learning_rate: f64) -> Result<()> {
    if !learning_rate.is_finite() || learning_rate <= 0.0 {
        return Err(Error::InvalidConfig(format!("learning rate {learning_rate} must be positive")));
    }
    Ok(())
}

pub(crate) fn check_lambda(lambda: f64) -> Result<()> {
    if !lambda.is_finite() || lambda < 0.0 {
        return Err(Error::InvalidConfig(format!("lambda {lambda} must be non-negative")));
    }
    Ok(())
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            layers: Vec::new(),
            learning_rate: DEFAULT_LEARNING_RATE,
            lambda: 0.0,
            seed: 0,
            init: WeightInit::default(),
            loss: None,
        }
    }
}

impl NetworkConfig {
    pub fn new() -> NetworkConfig {
        NetworkConfig::default()
    }

    /// Appends a layer.
    pub fn layer(mut self, input_size: usize, output_size: usize, activation: ActivationFunction) -> Self {
        self.layers.push(LayerSpec { input_size, output_size, activation });
        self
    }

    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn regularization(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn init(mut self, init: WeightInit) -> Self {
        self.init = init;
        self
    }

    pub fn loss(mut self, loss: LossType) -> Self {
        self.loss = Some(loss);
        self
    }

    /// Checks everything `build` relies on without allocating any weights.
    pub fn validate(&self) -> Result<()> {
        let last = self.layers.last().ok_or(Error::EmptyNetwork)?;

        for (index, spec) in self.layers.iter().enumerate() {
            check_layer_size(index, spec.input_size, spec.output_size)?;
            if index > 0 {
                let found = self.layers[index - 1].output_size;
                if found != spec.input_size {
                    return Err(Error::LayerSizeMismatch { index, expected: spec.input_size, found });
                }
            }
            if spec.activation == ActivationFunction::Softmax && index + 1 != self.layers.len() {
                return Err(Error::MisplacedSoftmax { index });
            }
        }

        if last.activation == ActivationFunction::Softmax && self.loss == Some(LossType::SquaredError) {
            return Err(Error::IncompatibleLoss {
                loss: LossType::SquaredError.name(),
                activation: last.activation.name(),
            });
        }
        check_learning_rate(self.learning_rate)?;
        check_lambda(self.lambda)
    }

    /// Validates the configuration and initializes a network from `seed`.
    pub fn build(&self) -> Result<Network> {
        self.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let layers: Vec<Layer> = self.layers.iter()
            .map(|spec| {
                Layer::new(
                    LayerSize::new(spec.input_size, spec.output_size),
                    spec.activation,
                    self.init,
                    &mut rng,
                )
            })
            .collect();
        let output = layers.last().map(|l| l.activation()).ok_or(Error::EmptyNetwork)?;
        let loss = self.loss.unwrap_or_else(|| LossType::default_for(output));

        info!(
            layers = layers.len(),
            seed = self.seed,
            loss = loss.name(),
            "built network"
        );
        Network::from_parts(layers, self.learning_rate, self.lambda, loss)
    }

    /// Serializes the configuration to a pretty-printed JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `NetworkConfig` from a JSON file. The result is not
    /// validated until `build`.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<NetworkConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
