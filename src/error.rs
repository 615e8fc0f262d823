use thiserror::Error;

/// Every failure the engine can report. Nothing in the crate panics or exits
/// on bad input; callers get one of these back instead.
#[derive(Debug, Error)]
pub enum Error {
    /// A matrix operation was given operands with incompatible shapes.
    #[error("dimension mismatch in {op}: {left:?} vs {right:?}")]
    DimensionMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("index ({row}, {col}) out of bounds for {rows}x{cols} matrix")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// Adjacent layers disagree: layer `index` expects `expected` inputs but
    /// the previous layer produces `found` outputs.
    #[error("layer {index} expects {expected} inputs but previous layer outputs {found}")]
    LayerSizeMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("network has no layers")]
    EmptyNetwork,

    #[error("softmax is only supported on the output layer (found on layer {index})")]
    MisplacedSoftmax { index: usize },

    #[error("loss {loss} cannot be paired with a {activation} output layer")]
    IncompatibleLoss {
        loss: &'static str,
        activation: &'static str,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("input has {actual} values but the first layer expects {expected}")]
    InvalidInputSize { expected: usize, actual: usize },

    #[error("batch has {inputs} inputs but {targets} targets")]
    BatchSizeMismatch { inputs: usize, targets: usize },

    /// Cross-entropy is undefined for non-positive predictions.
    #[error("cross-entropy undefined: prediction[{index}] = {value}")]
    UndefinedLoss { index: usize, value: f64 },

    #[error("malformed weight file at line {line}: {reason}")]
    PersistenceFormat { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn format(line: usize, reason: impl Into<String>) -> Error {
        Error::PersistenceFormat { line, reason: reason.into() }
    }
}
