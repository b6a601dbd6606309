//! Level-wise evaluation of a compiled circuit.
//!
//! The layout's index tables are uploaded once to integer tensors; each
//! call then runs two passes over a pair of per-call buffers:
//!
//! - `data`, shape `[num_nodes + 1, batch]`: per-node log-value. The extra
//!   row is the padding row, pinned to [`LOG_ZERO`].
//! - `theta`, shape `[(num_nodes + 1) * max_elements, batch]`: per-element
//!   log-contribution, normalized by the owning node's total in the
//!   bottom-up pass and consumed as the routing weight of the top-down
//!   pass.
//!
//! The bottom-up pass computes the weighted model count at the root; the
//! top-down pass redistributes the root's unit mass through the normalized
//! element weights to obtain every literal's marginal. Levels execute in
//! order (each level's output feeds the next); within a level all nodes and
//! batch entries are one batched gather / reduce / scatter expression.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

use ksubset_core::compile::CircuitLayout;
use ksubset_core::error::CircuitError;
use ksubset_core::stability::{log1mexp, logsumexp_dim};

/// Finite stand-in for log 0. Padding rows and impossible branches hold
/// this value; true negative infinity would turn the subtractions in the
/// normalization step into NaN.
pub const LOG_ZERO: f32 = -1000.0;

/// One decomposition level of the bottom-up pass, pre-flattened so the
/// element gather is a single `select` per operand.
#[derive(Debug)]
struct UpwardLevel<B: Backend> {
    /// Node rows written by this level, `[len]`.
    nodes: Tensor<B, 1, Int>,
    /// Prime rows into `data`, `[len * max_elements]`.
    primes: Tensor<B, 1, Int>,
    /// Sub rows into `data`, `[len * max_elements]`.
    subs: Tensor<B, 1, Int>,
    /// Rows into `theta` owned by this level, `[len * max_elements]`.
    theta_rows: Tensor<B, 1, Int>,
    len: usize,
}

/// One level of the top-down pass: for every node, the padded list of
/// `(parent, slot)` paths it can be reached through.
#[derive(Debug)]
struct DownwardLevel<B: Backend> {
    /// Node rows resolved by this level, `[len]`.
    nodes: Tensor<B, 1, Int>,
    /// Parent rows into `data`, `[len * max_parents]`.
    parent_nodes: Tensor<B, 1, Int>,
    /// Parent-element rows into `theta`, `[len * max_parents]`.
    parent_theta: Tensor<B, 1, Int>,
    len: usize,
}

/// A circuit compiled onto a device: immutable after construction, cheap to
/// clone, and safe to share across concurrent evaluation calls.
#[derive(Debug)]
pub struct CompiledCircuit<B: Backend> {
    num_nodes: usize,
    max_elements: usize,
    max_parents: usize,
    num_variables: usize,
    /// Leaves first; the last level holds only the root.
    upward: Vec<UpwardLevel<B>>,
    /// Processing order: the level below the root first, literals last.
    downward: Vec<DownwardLevel<B>>,
    /// The root row, reset to log 1 before the top-down pass.
    root_row: Tensor<B, 1, Int>,
    /// Literal rows into `data`, `[num_literals]`.
    literal_rows: Tensor<B, 1, Int>,
    /// Rows into the stacked `[negative; positive]` weight table,
    /// `[num_literals]`.
    literal_weight_rows: Tensor<B, 1, Int>,
    /// Positive-literal rows in ascending variable order, `[num_variables]`.
    pos_literal_rows: Tensor<B, 1, Int>,
    device: B::Device,
}

fn index_tensor<B: Backend>(rows: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let rows: Vec<i32> = rows.iter().map(|&row| row as i32).collect();
    Tensor::from_ints(rows.as_slice(), device)
}

/// Replace the selected rows of `tensor` with `values`.
///
/// `select_assign` accumulates, so the current row contents are subtracted
/// first; each row is written at most once per pass, which keeps this exact.
fn scatter_rows<B: Backend>(
    tensor: Tensor<B, 2>,
    rows: Tensor<B, 1, Int>,
    values: Tensor<B, 2>,
) -> Tensor<B, 2> {
    let current = tensor.clone().select(0, rows.clone());
    tensor.select_assign(0, rows, values - current)
}

impl<B: Backend> CompiledCircuit<B> {
    /// Upload `layout`'s index tables to `device`.
    pub fn new(layout: &CircuitLayout, device: &B::Device) -> Self {
        let n = layout.num_nodes;
        let a = layout.max_elements;
        let p = layout.max_parents;

        let upward = layout
            .levels
            .iter()
            .map(|level| {
                let mut primes = Vec::with_capacity(level.len() * a);
                let mut subs = Vec::with_capacity(level.len() * a);
                let mut theta_rows = Vec::with_capacity(level.len() * a);
                for &node in level {
                    for slot in 0..a {
                        let [prime, sub] = layout.elements[node * a + slot];
                        primes.push(prime);
                        subs.push(sub);
                        theta_rows.push(node * a + slot);
                    }
                }
                UpwardLevel {
                    nodes: index_tensor(level, device),
                    primes: index_tensor(&primes, device),
                    subs: index_tensor(&subs, device),
                    theta_rows: index_tensor(&theta_rows, device),
                    len: level.len(),
                }
            })
            .collect();

        // Top-down order: intermediate levels from just below the root,
        // then the literal level. The root itself is the unit seed.
        let mut downward_nodes: Vec<&[usize]> = layout.levels[..layout.levels.len() - 1]
            .iter()
            .rev()
            .map(Vec::as_slice)
            .collect();
        downward_nodes.push(&layout.literal_ids);
        let downward = downward_nodes
            .into_iter()
            .map(|nodes| {
                let mut parent_nodes = Vec::with_capacity(nodes.len() * p);
                let mut parent_theta = Vec::with_capacity(nodes.len() * p);
                for &node in nodes {
                    for slot in 0..p {
                        let [parent, element] = layout.parents[node * p + slot];
                        parent_nodes.push(parent);
                        parent_theta.push(parent * a + element);
                    }
                }
                DownwardLevel {
                    nodes: index_tensor(nodes, device),
                    parent_nodes: index_tensor(&parent_nodes, device),
                    parent_theta: index_tensor(&parent_theta, device),
                    len: nodes.len(),
                }
            })
            .collect();

        // Literal initialization: row `variable` of the stacked weight
        // table is log(1 - p), row `num_variables + variable` is log p.
        let literal_weight_rows: Vec<usize> = layout
            .literal_vars
            .iter()
            .zip(&layout.literal_signs)
            .map(|(&var, &positive)| if positive { layout.num_variables + var } else { var })
            .collect();

        log::debug!(
            "uploaded circuit tables: {} nodes, {} upward levels, {} variables",
            n,
            layout.levels.len(),
            layout.num_variables
        );

        CompiledCircuit {
            num_nodes: n,
            max_elements: a,
            max_parents: p,
            num_variables: layout.num_variables,
            upward,
            downward,
            root_row: index_tensor(&[layout.root_id()], device),
            literal_rows: index_tensor(&layout.literal_ids, device),
            literal_weight_rows: index_tensor(&literal_weight_rows, device),
            pos_literal_rows: index_tensor(&layout.pos_literal_order, device),
            device: device.clone(),
        }
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub(crate) fn device(&self) -> &B::Device {
        &self.device
    }

    /// Reject inputs outside the `(-inf, 0]` log-probability domain or with
    /// the wrong width.
    pub(crate) fn validate(&self, log_probs: &Tensor<B, 2>) -> Result<(), CircuitError> {
        let [_, vars] = log_probs.dims();
        if vars != self.num_variables {
            return Err(CircuitError::numeric_domain(format!(
                "expected {} variables per row, got {}",
                self.num_variables, vars
            )));
        }
        let values: Vec<f32> = log_probs
            .clone()
            .into_data()
            .to_vec()
            .map_err(|e| CircuitError::numeric_domain(format!("unreadable input: {e:?}")))?;
        if values.iter().any(|v| !v.is_finite() || *v > 0.0) {
            return Err(CircuitError::numeric_domain(
                "log-probabilities must be finite and <= 0",
            ));
        }
        Ok(())
    }

    /// Fresh `data` / `theta` buffers for one call: zeros everywhere (true
    /// rows are thereby log 1), the padding row at [`LOG_ZERO`], and the
    /// literal rows filled from the caller's per-variable log-probabilities.
    fn init_buffers(&self, log_probs: &Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch, _] = log_probs.dims();
        let per_var = log_probs.clone().swap_dims(0, 1); // [vars, batch]

        // Stacked weight table: negative-literal rows first, positive after.
        // A unit probability would send log(1 - p) to -inf; clamp it to the
        // padding constant instead so the buffers stay finite.
        let weights = Tensor::cat(
            vec![log1mexp(per_var.clone()).clamp_min(LOG_ZERO), per_var],
            0,
        ); // [2 * vars, batch]
        let literal_values = weights.select(0, self.literal_weight_rows.clone());

        let data = Tensor::cat(
            vec![
                Tensor::zeros([self.num_nodes, batch], &self.device),
                Tensor::full([1, batch], LOG_ZERO, &self.device),
            ],
            0,
        );
        let data = scatter_rows(data, self.literal_rows.clone(), literal_values);

        let theta = Tensor::zeros([(self.num_nodes + 1) * self.max_elements, batch], &self.device);
        (data, theta)
    }

    /// Bottom-up pass: weighted model count.
    ///
    /// For each level, leaves first, and every node `r` in it:
    ///
    /// - `theta[r][i] = data[prime_i] + data[sub_i]` (log of the element
    ///   conjunction),
    /// - `data[r] = logsumexp_i(theta[r][i])` (log of the disjoint sum),
    /// - `theta[r][i] -= data[r]` (per-element log-responsibility, the
    ///   message the top-down pass routes mass through).
    ///
    /// Returns the final buffers and the root's log-weight per batch item.
    fn upward_pass(
        &self,
        log_probs: &Tensor<B, 2>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>, Tensor<B, 1>) {
        let [batch, _] = log_probs.dims();
        let (mut data, mut theta) = self.init_buffers(log_probs);

        let a = self.max_elements;
        for level in &self.upward {
            let len = level.len;
            let conjunction = data.clone().select(0, level.primes.clone())
                + data.clone().select(0, level.subs.clone()); // [len * a, batch]
            let element_logits =
                conjunction.reshape([len as i32, a as i32, batch as i32]);
            let totals = logsumexp_dim(element_logits.clone(), 1); // [len, 1, batch]
            let responsibilities = element_logits - totals.clone();

            data = scatter_rows(
                data,
                level.nodes.clone(),
                totals.reshape([len as i32, batch as i32]),
            );
            theta = scatter_rows(
                theta,
                level.theta_rows.clone(),
                responsibilities.reshape([(len * a) as i32, batch as i32]),
            );
        }

        let root = data
            .clone()
            .select(0, self.root_row.clone())
            .reshape([batch as i32]);
        (data, theta, root)
    }

    /// Log weighted model count at the root, `[batch]`.
    pub fn log_wmc(&self, log_probs: Tensor<B, 2>) -> Result<Tensor<B, 1>, CircuitError> {
        self.validate(&log_probs)?;
        let (_, _, root) = self.upward_pass(&log_probs);
        Ok(root)
    }

    /// Log-marginals of the positive literals, `[batch, num_variables]` in
    /// ascending variable order. Exponentiate for probabilities.
    ///
    /// Runs the bottom-up pass, resets the root to log 1, then resolves
    /// each level below it as
    /// `data[n] = logsumexp over parents (theta[parent, slot] + data[parent])`,
    /// the total probability of reaching `n` along any parent-element path.
    /// Padded parent slots route through the [`LOG_ZERO`] row and the zero
    /// rows of `theta`, vanishing from the sum while staying finite.
    pub fn log_pr(&self, log_probs: Tensor<B, 2>) -> Result<Tensor<B, 2>, CircuitError> {
        self.validate(&log_probs)?;
        let [batch, _] = log_probs.dims();
        let (data, theta, _) = self.upward_pass(&log_probs);

        let mut data = scatter_rows(
            data,
            self.root_row.clone(),
            Tensor::zeros([1, batch], &self.device),
        );

        let p = self.max_parents;
        for level in &self.downward {
            let len = level.len;
            let paths = theta.clone().select(0, level.parent_theta.clone())
                + data.clone().select(0, level.parent_nodes.clone()); // [len * p, batch]
            let marginals = logsumexp_dim(
                paths.reshape([len as i32, p as i32, batch as i32]),
                1,
            )
            .reshape([len as i32, batch as i32]);
            data = scatter_rows(data, level.nodes.clone(), marginals);
        }

        Ok(data
            .select(0, self.pos_literal_rows.clone())
            .swap_dims(0, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn test_scatter_rows_replaces_instead_of_accumulating() {
        let device = Default::default();
        let t: Tensor<B, 2> = Tensor::from_data([[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]], &device);
        let rows = index_tensor(&[0, 2], &device);
        let values: Tensor<B, 2> = Tensor::from_data([[10.0f32, 20.0], [50.0, 60.0]], &device);

        let out: Vec<f32> = scatter_rows(t, rows, values).into_data().to_vec().unwrap();
        assert_eq!(out, vec![10.0, 20.0, 3.0, 4.0, 50.0, 60.0]);
    }
}
