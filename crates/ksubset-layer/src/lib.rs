//! # ksubset-layer
//!
//! Burn-backed evaluation of compiled probabilistic circuits and the
//! differentiable k-subset sampling layer built on top of it.
//!
//! - [`CompiledCircuit`]: a [`ksubset_core::CircuitLayout`] uploaded once to
//!   integer index tensors on the injected device, with the two level-wise
//!   evaluation passes: [`CompiledCircuit::log_wmc`] (bottom-up weighted
//!   model count) and [`CompiledCircuit::log_pr`] (top-down literal
//!   marginals)
//! - [`RngKey`]: deterministic, splittable random keys for reproducible
//!   sampling
//! - [`KSubsetLayer`]: Gumbel-top-k subset sampling with a straight-through
//!   gradient path through the marginals
//!
//! Everything is generic over `B: Backend`; wrap the backend in
//! `burn::backend::Autodiff` to differentiate through the marginals.
//!
//! ```rust,ignore
//! use burn::backend::NdArray;
//! use ksubset_core::{compile, exactly_k};
//! use ksubset_layer::{CompiledCircuit, KSubsetLayer, RngKey};
//!
//! let (graph, root) = exactly_k(4, 2)?;
//! let layout = compile(&graph, root)?;
//! let circuit = CompiledCircuit::<NdArray>::new(&layout, &Default::default());
//! let layer = KSubsetLayer::new(circuit, 2)?;
//! let sample = layer.forward(RngKey::new(42), log_probs)?;
//! ```

pub mod circuit;
pub mod rng;
pub mod sampler;

pub use circuit::*;
pub use rng::*;
pub use sampler::*;
