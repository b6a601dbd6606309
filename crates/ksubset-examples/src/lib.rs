//! # ksubset-examples utilities
//!
//! Shared helpers for the runnable examples: input construction and small
//! formatting utilities.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Build a `[batch, n]` log-probability tensor by repeating one row of
/// probabilities.
pub fn log_prob_rows<B: Backend>(
    probs: &[f64],
    batch: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    let row: Vec<f32> = probs.iter().map(|&p| p.ln() as f32).collect();
    let data: Vec<f32> = (0..batch).flat_map(|_| row.iter().copied()).collect();
    Tensor::<B, 1>::from_floats(data.as_slice(), device)
        .reshape([batch as i32, probs.len() as i32])
}

/// Render one row of a dense tensor readback with fixed precision.
pub fn format_row(values: &[f32]) -> String {
    let cells: Vec<String> = values.iter().map(|v| format!("{v:.4}")).collect();
    format!("[{}]", cells.join(", "))
}
