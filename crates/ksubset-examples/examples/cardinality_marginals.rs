//! # Cardinality Marginals Example
//!
//! Builds the "exactly 2 of 4" constraint circuit, computes the weighted
//! model count and the exact per-variable marginals for a batch of
//! log-probability inputs, and draws a few hard subset samples.

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::NdArray;
use ksubset_core::{compile, exactly_k};
use ksubset_examples::{format_row, log_prob_rows};
use ksubset_layer::{CompiledCircuit, KSubsetLayer, RngKey};

type B = NdArray;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Cardinality marginals ===\n");

    let device = NdArrayDevice::default();

    let (graph, root) = exactly_k(4, 2)?;
    let layout = compile(&graph, root)?;
    println!(
        "Compiled circuit: {} nodes, {} levels, {} variables",
        layout.num_nodes,
        layout.levels.len(),
        layout.num_variables
    );

    let circuit = CompiledCircuit::<B>::new(&layout, &device);
    let probs = [0.3, 0.6, 0.5, 0.2];
    let input = log_prob_rows::<B>(&probs, 1, &device);

    let wmc: Vec<f32> = circuit
        .log_wmc(input.clone())?
        .exp()
        .into_data()
        .to_vec()
        .unwrap();
    println!("\nP(exactly 2 of 4 | p = {probs:?}) = {:.4}", wmc[0]);

    let marginals: Vec<f32> = circuit
        .log_pr(input.clone())?
        .exp()
        .into_data()
        .to_vec()
        .unwrap();
    println!("Conditional marginals: {}", format_row(&marginals));

    let layer = KSubsetLayer::new(circuit, 2)?;
    println!("\nHard subset samples:");
    for key in RngKey::new(7).split(4) {
        let sample: Vec<f32> = layer
            .sample(key, input.clone())?
            .into_data()
            .to_vec()
            .unwrap();
        println!("  key {:>20} -> {}", key.seed(), format_row(&sample));
    }

    Ok(())
}
