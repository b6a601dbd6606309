//! Gumbel-top-k subset sampling with a straight-through gradient path.
//!
//! Perturbing per-literal log-weights with Gumbel(0, 1) noise and keeping
//! the k largest draws samples a k-subset without replacement. The hard
//! indicator carries no gradient; the layer therefore returns
//! `(hard - marginals).detach() + marginals`, whose forward value is the
//! discrete sample and whose backward value is the circuit marginal, the
//! only differentiable path.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

use ksubset_core::error::CircuitError;

use crate::circuit::CompiledCircuit;
use crate::rng::RngKey;

/// Perturb log-weights with Gumbel(0, 1) noise: `w + (-log(-log u))`.
///
/// The uniforms come from `key`'s ChaCha stream, so a fixed key yields a
/// fixed perturbation. The noise is not a function of `w`; this whole step
/// lives outside the differentiable scope.
fn gumbel_keys<B: Backend>(key: RngKey, w: Tensor<B, 2>, device: &B::Device) -> Tensor<B, 2> {
    let [batch, n] = w.dims();
    let uniform = key.uniform(batch * n);
    let uniform: Tensor<B, 2> =
        Tensor::<B, 1>::from_floats(uniform.as_slice(), device).reshape([batch as i32, n as i32]);
    let gumbel = uniform.log().neg().log().neg();
    w + gumbel
}

/// Indices of the `k` largest perturbed weights per batch row, `[batch, k]`.
/// Ties fall to the selection order of the backend's top-k; no stability
/// beyond that is promised.
fn sample_subset<B: Backend>(
    key: RngKey,
    w: Tensor<B, 2>,
    k: usize,
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    let perturbed = gumbel_keys(key, w.detach(), device);
    let (_, indices) = perturbed.topk_with_indices(k, 1);
    indices
}

/// Differentiable sampling of a fixed-size subset of literals.
///
/// Wraps a [`CompiledCircuit`] and a subset size; produces multi-hot
/// indicators with exactly `subset_size` ones per batch row.
#[derive(Debug)]
pub struct KSubsetLayer<B: Backend> {
    circuit: CompiledCircuit<B>,
    subset_size: usize,
}

impl<B: Backend> KSubsetLayer<B> {
    /// Validates the subset size against the circuit's variable count
    /// before any sampling work begins.
    pub fn new(circuit: CompiledCircuit<B>, subset_size: usize) -> Result<Self, CircuitError> {
        if subset_size > circuit.num_variables() {
            return Err(CircuitError::SamplingConstraint {
                subset_size,
                num_variables: circuit.num_variables(),
            });
        }
        Ok(KSubsetLayer {
            circuit,
            subset_size,
        })
    }

    pub fn circuit(&self) -> &CompiledCircuit<B> {
        &self.circuit
    }

    pub fn subset_size(&self) -> usize {
        self.subset_size
    }

    /// Hard `{0, 1}` indicator with exactly `subset_size` ones per row,
    /// `[batch, num_variables]`. Carries no gradient.
    pub fn sample(
        &self,
        key: RngKey,
        log_probs: Tensor<B, 2>,
    ) -> Result<Tensor<B, 2>, CircuitError> {
        self.circuit.validate(&log_probs)?;
        let [batch, vars] = log_probs.dims();
        let device = self.circuit.device();

        let indices = sample_subset(key, log_probs, self.subset_size, device);
        let ones = Tensor::ones([batch, self.subset_size], device);
        Ok(Tensor::zeros([batch, vars], device).scatter(1, indices, ones))
    }

    /// Straight-through estimator, `(hard - marginals).detach() + marginals`:
    /// the forward value is the hard sample from [`Self::sample`], the
    /// gradient flows through the exponentiated circuit marginals.
    pub fn forward(
        &self,
        key: RngKey,
        log_probs: Tensor<B, 2>,
    ) -> Result<Tensor<B, 2>, CircuitError> {
        let hard = self.sample(key, log_probs.clone())?;
        let marginals = self.circuit.log_pr(log_probs)?.exp();
        Ok((hard - marginals.clone()).detach() + marginals)
    }
}
