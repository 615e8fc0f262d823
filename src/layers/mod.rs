pub mod dense;

pub use dense::{Layer, LayerSize};
