pub mod squared_error;
pub mod cross_entropy;
pub mod loss_type;

pub use squared_error::SquaredErrorLoss;
pub use cross_entropy::CrossEntropyLoss;
pub use loss_type::LossType;
