//! # Straight-Through Training Example
//!
//! Drives the sampling layer end to end under autodiff: a toy objective
//! rewards including the last two of four variables, and gradient descent
//! on the input log-probabilities pushes their inclusion marginals up.
//! The forward value each step is a hard 2-subset; the gradient flows
//! through the circuit marginals.

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::tensor::Tensor;
use ksubset_core::{compile, exactly_k};
use ksubset_examples::format_row;
use ksubset_layer::{CompiledCircuit, KSubsetLayer, RngKey};

type B = Autodiff<NdArray>;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Straight-through training ===\n");

    let device = NdArrayDevice::default();
    let (graph, root) = exactly_k(4, 2)?;
    let layout = compile(&graph, root)?;
    let layer = KSubsetLayer::new(CompiledCircuit::<B>::new(&layout, &device), 2)?;

    // Reward picking variables 2 and 3.
    let reward: Tensor<B, 2> = Tensor::from_data([[0.0f32, 0.0, 1.0, 1.0]], &device);

    let mut logits: Vec<f32> = vec![0.5f32.ln(); 4];
    let learning_rate = 0.5;

    for (step, key) in RngKey::new(3).split(40).into_iter().enumerate() {
        let input = Tensor::<B, 1>::from_floats(logits.as_slice(), &device)
            .reshape([1, 4])
            .require_grad();

        let sample = layer.forward(key, input.clone())?;
        // Maximize the collected reward = minimize its negation.
        let loss = (sample * reward.clone()).sum().neg();
        let grads = loss.backward();
        let gradient: Vec<f32> = input
            .grad(&grads)
            .expect("loss depends on the input")
            .into_data()
            .to_vec()
            .unwrap();

        for (logit, g) in logits.iter_mut().zip(&gradient) {
            // Keep log-probabilities strictly negative.
            *logit = (*logit - learning_rate * g).min(-1e-3);
        }

        if step % 10 == 0 {
            println!("step {step:>2}: log p = {}", format_row(&logits));
        }
    }

    let final_input = Tensor::<B, 1>::from_floats(logits.as_slice(), &device).reshape([1, 4]);
    let marginals: Vec<f32> = layer
        .circuit()
        .log_pr(final_input)?
        .exp()
        .into_data()
        .to_vec()
        .unwrap();
    println!("\nFinal inclusion marginals: {}", format_row(&marginals));
    println!("(variables 2 and 3 should dominate)");

    Ok(())
}
