//! Circuit compilation: from an arena graph to flat, fixed-width index
//! tables.
//!
//! Compilation happens once per circuit. The output [`CircuitLayout`] is a
//! plain-data description: dense node ids, a leaves-first level partition of
//! the decomposition nodes, and padded `elements` / `parents` tables in
//! which the id `num_nodes` is the padding reference. Evaluation backends
//! upload these tables to device tensors and never look at the graph again.

use std::collections::VecDeque;

use itertools::izip;
use serde::{Deserialize, Serialize};

use crate::error::CircuitError;
use crate::node::{CircuitGraph, Node, NodeRef};

/// Flat index tables for one compiled circuit.
///
/// Node ids are dense in `[0, num_nodes)`, assigned in traversal order from
/// the root. The id `num_nodes` never denotes a real node: it is the padding
/// reference, and every numeric buffer indexed by these tables carries one
/// extra row for it holding a finite log-zero constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitLayout {
    /// Count of distinct reachable nodes (N).
    pub num_nodes: usize,
    /// Maximum element count over decomposition nodes.
    pub max_elements: usize,
    /// Maximum parent-slot count over nodes.
    pub max_parents: usize,
    /// Decomposition levels, leaves first; the last level is `[root]`.
    /// Every element operand of a level's node lives in an earlier level
    /// (or is a leaf).
    pub levels: Vec<Vec<usize>>,
    /// `num_nodes * max_elements` rows of `[prime, sub]`; row `r *
    /// max_elements + slot` describes element `slot` of node `r`. Unused
    /// slots (and all rows of non-decomposition nodes) hold
    /// `[num_nodes, num_nodes]`.
    pub elements: Vec<[usize; 2]>,
    /// `num_nodes * max_parents` rows of `[decomposition, slot]`, one row
    /// per element occurrence referencing the node (not deduplicated).
    /// Unused slots hold `[num_nodes, 0]`.
    pub parents: Vec<[usize; 2]>,
    /// Ids of constant-true nodes.
    pub true_ids: Vec<usize>,
    /// Ids of literal nodes, with their variable and polarity in parallel.
    pub literal_ids: Vec<usize>,
    pub literal_vars: Vec<usize>,
    pub literal_signs: Vec<bool>,
    /// Ids of the positive literals, ascending variable order. This is the
    /// output ordering of the marginal pass.
    pub pos_literal_order: Vec<usize>,
    /// Number of distinct variables; positive literals cover `0..num_variables`.
    pub num_variables: usize,
}

impl CircuitLayout {
    /// Ids of the root level (always a single node).
    pub fn root_id(&self) -> usize {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .expect("a compiled layout always has a root level")
    }
}

/// Compile `graph` rooted at `root` into a [`CircuitLayout`].
///
/// Fails with [`CircuitError::Structural`] on a dangling reference, a
/// non-decomposition root, an empty decomposition, a cycle through
/// decomposition nodes, duplicate positive literals for one variable, or
/// positive literals not covering a contiguous variable range. No partial
/// layout is ever returned.
pub fn compile(graph: &CircuitGraph, root: NodeRef) -> Result<CircuitLayout, CircuitError> {
    let order = graph.reachable(root)?;
    let num_nodes = order.len();

    let mut id_of = vec![usize::MAX; graph.len()];
    for (id, &node) in order.iter().enumerate() {
        id_of[node] = id;
    }

    if !graph
        .get(root)
        .is_some_and(|node| node.is_decomposition())
    {
        return Err(CircuitError::structural(
            "root must be a decomposition node",
        ));
    }

    // Per-node element lists in compiled ids; empty for leaves.
    let mut elements_of: Vec<Vec<(usize, usize)>> = vec![Vec::new(); num_nodes];
    for (id, &node) in order.iter().enumerate() {
        if let Some(Node::Decomposition { elements }) = graph.get(node) {
            if elements.is_empty() {
                return Err(CircuitError::structural(format!(
                    "decomposition node {id} has no elements"
                )));
            }
            elements_of[id] = elements
                .iter()
                .map(|&(prime, sub)| (id_of[prime], id_of[sub]))
                .collect();
        }
    }

    let levels = level_partition(&elements_of, num_nodes)?;

    let max_elements = elements_of
        .iter()
        .map(Vec::len)
        .max()
        .expect("at least the root is a decomposition");

    // Padded elements table plus reverse edges, one parent entry per
    // element occurrence.
    let mut elements = vec![[num_nodes, num_nodes]; num_nodes * max_elements];
    let mut parent_lists: Vec<Vec<[usize; 2]>> = vec![Vec::new(); num_nodes];
    for (id, node_elements) in elements_of.iter().enumerate() {
        for (slot, &(prime, sub)) in node_elements.iter().enumerate() {
            elements[id * max_elements + slot] = [prime, sub];
            parent_lists[prime].push([id, slot]);
            parent_lists[sub].push([id, slot]);
        }
    }
    let max_parents = parent_lists
        .iter()
        .map(Vec::len)
        .max()
        .unwrap_or(0)
        .max(1);
    let mut parents = vec![[num_nodes, 0]; num_nodes * max_parents];
    for (id, list) in parent_lists.iter().enumerate() {
        for (slot, &entry) in list.iter().enumerate() {
            parents[id * max_parents + slot] = entry;
        }
    }

    // Leaf bookkeeping.
    let mut true_ids = Vec::new();
    let mut literal_ids = Vec::new();
    let mut literal_vars = Vec::new();
    let mut literal_signs = Vec::new();
    for (id, &node) in order.iter().enumerate() {
        match graph.get(node) {
            Some(Node::True) => true_ids.push(id),
            Some(Node::Literal { variable, positive }) => {
                literal_ids.push(id);
                literal_vars.push(*variable);
                literal_signs.push(*positive);
            }
            _ => {}
        }
    }

    let mut positive: Vec<(usize, usize)> = izip!(&literal_ids, &literal_vars, &literal_signs)
        .filter(|(_, _, &sign)| sign)
        .map(|(&id, &var, _)| (var, id))
        .collect();
    positive.sort_unstable();
    if positive.is_empty() {
        return Err(CircuitError::structural("circuit has no positive literals"));
    }
    for window in positive.windows(2) {
        if window[0].0 == window[1].0 {
            return Err(CircuitError::structural(format!(
                "variable {} has duplicate positive literal nodes",
                window[0].0
            )));
        }
    }
    let num_variables = literal_vars.iter().max().map(|&v| v + 1).unwrap_or(0);
    if positive.len() != num_variables {
        return Err(CircuitError::structural(format!(
            "positive literals cover {} of {} variables; the variable range must be contiguous",
            positive.len(),
            num_variables
        )));
    }
    let pos_literal_order: Vec<usize> = positive.into_iter().map(|(_, id)| id).collect();

    log::debug!(
        "compiled circuit: {} nodes, {} levels, max arity {}, max parents {}, {} variables",
        num_nodes,
        levels.len(),
        max_elements,
        max_parents,
        num_variables
    );

    Ok(CircuitLayout {
        num_nodes,
        max_elements,
        max_parents,
        levels,
        elements,
        parents,
        true_ids,
        literal_ids,
        literal_vars,
        literal_signs,
        pos_literal_order,
        num_variables,
    })
}

/// Partition the decomposition nodes into dependency levels, leaves first.
///
/// A node's level is its longest-path depth from the root over
/// decomposition-to-decomposition edges, so every element operand sits
/// strictly closer to the leaves than the node that owns it, even when a
/// sub-circuit is shared at several depths. Computed with a topological
/// (Kahn) pass; decomposition nodes left unprocessed betray a cycle.
fn level_partition(
    elements_of: &[Vec<(usize, usize)>],
    num_nodes: usize,
) -> Result<Vec<Vec<usize>>, CircuitError> {
    let is_decomposition: Vec<bool> = elements_of.iter().map(|e| !e.is_empty()).collect();
    let decomposition_count = is_decomposition.iter().filter(|&&d| d).count();

    let mut indegree = vec![0usize; num_nodes];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); num_nodes];
    for (id, node_elements) in elements_of.iter().enumerate() {
        for &(prime, sub) in node_elements {
            for operand in [prime, sub] {
                if is_decomposition[operand] {
                    children[id].push(operand);
                    indegree[operand] += 1;
                }
            }
        }
    }

    let mut depth = vec![0usize; num_nodes];
    let mut queue: VecDeque<usize> = (0..num_nodes)
        .filter(|&id| is_decomposition[id] && indegree[id] == 0)
        .collect();
    let mut processed = 0usize;
    while let Some(id) = queue.pop_front() {
        processed += 1;
        for &child in &children[id] {
            depth[child] = depth[child].max(depth[id] + 1);
            indegree[child] -= 1;
            if indegree[child] == 0 {
                queue.push_back(child);
            }
        }
    }
    if processed != decomposition_count {
        return Err(CircuitError::structural(
            "cycle detected among decomposition nodes",
        ));
    }

    let max_depth = (0..num_nodes)
        .filter(|&id| is_decomposition[id])
        .map(|id| depth[id])
        .max()
        .unwrap_or(0);
    let mut levels: Vec<Vec<usize>> = vec![Vec::new(); max_depth + 1];
    for id in 0..num_nodes {
        if is_decomposition[id] {
            levels[depth[id]].push(id);
        }
    }
    // Root-first by construction; the forward pass wants leaves first.
    levels.reverse();
    Ok(levels)
}
