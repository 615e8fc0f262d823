pub mod config;
pub mod forward;
pub mod network;
pub mod persist;

pub use config::{LayerSpec, NetworkConfig, WeightInit};
pub use forward::{ForwardPass, LayerTrace};
pub use network::{argmax, Network};
