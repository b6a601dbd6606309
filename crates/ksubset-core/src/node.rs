use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::CircuitError;

/// Index of a node in a [`CircuitGraph`] arena.
pub type NodeRef = usize;

/// A node of a structured decomposable circuit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Node {
    /// An OR over mutually exclusive AND-decompositions. Each element is a
    /// `(prime, sub)` conjunction; the node's weight is the sum over
    /// elements of the product of the two operand weights.
    Decomposition { elements: Vec<(NodeRef, NodeRef)> },
    /// A literal leaf for `variable` with the given polarity.
    Literal { variable: usize, positive: bool },
    /// The constant-true leaf (weight 1).
    True,
}

impl Node {
    pub fn is_decomposition(&self) -> bool {
        matches!(self, Node::Decomposition { .. })
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Node::Literal { .. })
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Node::True)
    }
}

/// Arena of circuit nodes.
///
/// Nodes are inserted once and referenced thereafter only by [`NodeRef`];
/// sharing a sub-circuit means reusing its ref. The builder methods for
/// leaves deduplicate, so a variable's literal is a single shared node no
/// matter how many decompositions mention it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CircuitGraph {
    nodes: Vec<Node>,
}

impl CircuitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an externally produced node list (e.g. a deserialized circuit).
    /// References are not checked here; [`crate::compile`] validates them.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        CircuitGraph { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, node: NodeRef) -> Option<&Node> {
        self.nodes.get(node)
    }

    /// Add a decomposition node over already inserted operands.
    pub fn decomposition(&mut self, elements: Vec<(NodeRef, NodeRef)>) -> NodeRef {
        self.push(Node::Decomposition { elements })
    }

    /// Add (or reuse) the literal node for `variable` with the given polarity.
    pub fn literal(&mut self, variable: usize, positive: bool) -> NodeRef {
        let literal = Node::Literal { variable, positive };
        match self.nodes.iter().position(|n| *n == literal) {
            Some(existing) => existing,
            None => self.push(literal),
        }
    }

    /// Add (or reuse) the constant-true node.
    pub fn true_node(&mut self) -> NodeRef {
        match self.nodes.iter().position(|n| n.is_true()) {
            Some(existing) => existing,
            None => self.push(Node::True),
        }
    }

    fn push(&mut self, node: Node) -> NodeRef {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Every node reachable from `root`, each exactly once, in first-visit
    /// (preorder) order. Shared nodes appear once regardless of how many
    /// element slots point at them.
    pub fn reachable(&self, root: NodeRef) -> Result<Vec<NodeRef>, CircuitError> {
        if root >= self.nodes.len() {
            return Err(CircuitError::structural(format!(
                "root reference {} is outside the arena (size {})",
                root,
                self.nodes.len()
            )));
        }

        let mut seen: IndexSet<NodeRef> = IndexSet::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            if let Some(Node::Decomposition { elements }) = self.nodes.get(node) {
                // Reverse so primes are visited before subs, left to right.
                for &(prime, sub) in elements.iter().rev() {
                    for operand in [sub, prime] {
                        if operand >= self.nodes.len() {
                            return Err(CircuitError::structural(format!(
                                "element of node {node} references {operand}, outside the arena"
                            )));
                        }
                        if !seen.contains(&operand) {
                            stack.push(operand);
                        }
                    }
                }
            }
        }
        Ok(seen.into_iter().collect())
    }
}
