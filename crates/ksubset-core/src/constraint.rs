//! Cardinality-constraint circuit builders.
//!
//! The constraints are compiled over a right-linear variable order with the
//! standard cardinality DP: at variable `i` with `picks` still to place,
//! branch on the literal of `i` and recurse. Memoization over
//! `(variable, picks)` makes shared suffixes single nodes, so the circuit
//! has `O(n * k)` nodes.

use std::collections::HashMap;

use crate::error::CircuitError;
use crate::node::{CircuitGraph, NodeRef};

/// Build a circuit asserting that exactly `k` of `n` variables are true.
///
/// Returns the graph and its root. Requires `1 <= k <= n`; a constraint
/// with `k = 0` would leave variables without a positive literal, which the
/// compiled layout cannot index.
pub fn exactly_k(n: usize, k: usize) -> Result<(CircuitGraph, NodeRef), CircuitError> {
    if n == 0 {
        return Err(CircuitError::structural(
            "cardinality constraint needs at least one variable",
        ));
    }
    if k == 0 || k > n {
        return Err(CircuitError::structural(format!(
            "cannot pick exactly {k} of {n} variables"
        )));
    }

    let mut graph = CircuitGraph::new();
    let mut memo: HashMap<(usize, usize), NodeRef> = HashMap::new();
    let root = build(&mut graph, &mut memo, n, 0, k);
    Ok((graph, root))
}

/// Circuit over variables `var..n` with `picks` of them still to be true.
/// Invariant on entry: `picks <= n - var`.
fn build(
    graph: &mut CircuitGraph,
    memo: &mut HashMap<(usize, usize), NodeRef>,
    n: usize,
    var: usize,
    picks: usize,
) -> NodeRef {
    if var == n {
        return graph.true_node();
    }
    if let Some(&node) = memo.get(&(var, picks)) {
        return node;
    }

    let remaining = n - var;
    let mut elements = Vec::with_capacity(2);
    if picks >= 1 {
        let prime = graph.literal(var, true);
        let sub = build(graph, memo, n, var + 1, picks - 1);
        elements.push((prime, sub));
    }
    if picks + 1 <= remaining {
        let prime = graph.literal(var, false);
        let sub = build(graph, memo, n, var + 1, picks);
        elements.push((prime, sub));
    }

    let node = graph.decomposition(elements);
    memo.insert((var, picks), node);
    node
}
