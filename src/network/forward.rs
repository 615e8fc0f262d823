use crate::math::matrix::Matrix;

/// What one layer saw and produced during a forward step.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerTrace {
    /// Column vector fed into the layer.
    pub input: Matrix,
    /// `W·x + b`.
    pub pre_activation: Matrix,
    /// Activated output.
    pub output: Matrix,
}

/// Per-sample record of a full forward pass, one trace per layer.
///
/// Owned by the caller rather than the layers, so inference needs only a
/// shared borrow of the network and the backward pass reads exactly the
/// state of the sample it is updating for.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardPass {
    traces: Vec<LayerTrace>,
}

impl ForwardPass {
    pub(crate) fn with_capacity(layers: usize) -> ForwardPass {
        ForwardPass { traces: Vec::with_capacity(layers) }
    }

    pub(crate) fn push(&mut self, trace: LayerTrace) {
        self.traces.push(trace);
    }

    pub fn traces(&self) -> &[LayerTrace] {
        &self.traces
    }

    /// The network's prediction, i.e. the last layer's output.
    pub fn output(&self) -> &[f64] {
        self.traces.last().map_or(&[][..], |t| t.output.as_slice())
    }

    pub fn into_output(self) -> Vec<f64> {
        self.traces.into_iter().last().map_or_else(Vec::new, |t| t.output.into_vec())
    }
}
