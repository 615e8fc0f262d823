pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::{Layer, LayerSize};
pub use network::config::{LayerSpec, NetworkConfig, WeightInit};
pub use network::forward::{ForwardPass, LayerTrace};
pub use network::network::{argmax, Network};
pub use loss::loss_type::LossType;
pub use optim::sgd::Sgd;
