pub struct SquaredErrorLoss;

impl SquaredErrorLoss {
    /// Data term of the squared error: 0.5·Σ(expected − predicted)² / input_size.
    ///
    /// The L2 penalty depends on the weights, so `Network::squared_error` adds
    /// it on top.
    pub fn loss(predicted: &[f64], expected: &[f64], input_size: usize) -> f64 {
        let sum: f64 = predicted.iter().zip(expected.iter())
            .map(|(p, y)| (y - p).powi(2))
            .sum();
        0.5 * sum / input_size.max(1) as f64
    }

    /// L2 penalty: (lambda / 2)·Σ W².
    pub fn penalty(lambda: f64, sum_squared_weights: f64) -> f64 {
        lambda / 2.0 * sum_squared_weights
    }

    /// Per-output gradient w.r.t. the prediction: predicted − expected.
    pub fn derivative(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        predicted.iter().zip(expected.iter())
            .map(|(p, y)| p - y)
            .collect()
    }
}
