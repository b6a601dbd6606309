//! Tests for circuit compilation: leveling, index tables, and structural
//! validation.

use ksubset_core::compile::compile;
use ksubset_core::constraint::exactly_k;
use ksubset_core::error::CircuitError;
use ksubset_core::node::{CircuitGraph, Node};

#[test]
fn test_exactly_two_of_four_layout() {
    let (graph, root) = exactly_k(4, 2).unwrap();
    let layout = compile(&graph, root).unwrap();

    assert_eq!(layout.num_nodes, 17);
    assert_eq!(layout.num_variables, 4);
    assert_eq!(layout.max_elements, 2);
    assert_eq!(layout.levels.len(), 4, "one level per variable");
    assert_eq!(
        layout.levels.last().unwrap(),
        &vec![layout.root_id()],
        "root level is the last, leaves-first"
    );
    assert_eq!(layout.literal_ids.len(), 8);
    assert_eq!(layout.pos_literal_order.len(), 4);
    assert_eq!(layout.true_ids.len(), 1);
}

#[test]
fn test_levels_are_a_topological_partition() {
    let (graph, root) = exactly_k(6, 3).unwrap();
    let layout = compile(&graph, root).unwrap();

    // Map each decomposition id to its level index.
    let mut level_of = vec![usize::MAX; layout.num_nodes];
    for (index, level) in layout.levels.iter().enumerate() {
        for &id in level {
            level_of[id] = index;
        }
    }

    for (index, level) in layout.levels.iter().enumerate() {
        for &id in level {
            for slot in 0..layout.max_elements {
                let [prime, sub] = layout.elements[id * layout.max_elements + slot];
                for operand in [prime, sub] {
                    if operand < layout.num_nodes && level_of[operand] != usize::MAX {
                        assert!(
                            level_of[operand] < index,
                            "operand {operand} of {id} must sit closer to the leaves"
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn test_shared_subcircuit_takes_its_deepest_level() {
    // d2 hangs off both the root (depth 1) and d1 (depth 2); its level must
    // respect the longer chain or d1 would consume d2 before it is ready.
    let mut graph = CircuitGraph::new();
    let x0 = graph.literal(0, true);
    let nx0 = graph.literal(0, false);
    let x1 = graph.literal(1, true);
    let top = graph.true_node();
    let d2 = graph.decomposition(vec![(x1, top)]);
    let d1 = graph.decomposition(vec![(nx0, d2)]);
    let root = graph.decomposition(vec![(x0, d1), (nx0, d2)]);

    let layout = compile(&graph, root).unwrap();
    let level_of = |target: usize| {
        layout
            .levels
            .iter()
            .position(|level| level.contains(&target))
            .unwrap()
    };
    // Leaves-first indices: deeper nodes come earlier.
    let order = graph.reachable(root).unwrap();
    let id_of = |node| order.iter().position(|&n| n == node).unwrap();
    assert!(level_of(id_of(d2)) < level_of(id_of(d1)));
    assert!(level_of(id_of(d1)) < level_of(id_of(root)));
}

#[test]
fn test_parents_enumerate_every_element_occurrence() {
    let (graph, root) = exactly_k(4, 2).unwrap();
    let layout = compile(&graph, root).unwrap();
    let n = layout.num_nodes;
    let a = layout.max_elements;
    let p = layout.max_parents;

    // Rebuild the expected parent multiset from the elements table.
    let mut expected: Vec<Vec<[usize; 2]>> = vec![Vec::new(); n];
    for id in 0..n {
        for slot in 0..a {
            let [prime, sub] = layout.elements[id * a + slot];
            if prime < n {
                expected[prime].push([id, slot]);
                expected[sub].push([id, slot]);
            }
        }
    }

    for id in 0..n {
        let mut actual: Vec<[usize; 2]> = (0..p)
            .map(|slot| layout.parents[id * p + slot])
            .filter(|entry| entry[0] < n)
            .collect();
        actual.sort_unstable();
        expected[id].sort_unstable();
        assert_eq!(actual, expected[id], "parents of node {id}");
    }

    // Padding entries route to the extra row.
    assert!(layout
        .parents
        .iter()
        .filter(|entry| entry[0] == n)
        .all(|entry| entry[1] == 0));
}

#[test]
fn test_single_element_decomposition_is_padded() {
    let mut graph = CircuitGraph::new();
    let x0 = graph.literal(0, true);
    let x1 = graph.literal(1, true);
    let nx1 = graph.literal(1, false);
    let top = graph.true_node();
    let wide = graph.decomposition(vec![(x1, top), (nx1, top)]);
    let narrow = graph.decomposition(vec![(x1, top)]);
    let root = graph.decomposition(vec![(x0, wide), (x0, narrow)]);

    let layout = compile(&graph, root).unwrap();
    let n = layout.num_nodes;
    let a = layout.max_elements;
    assert_eq!(a, 2);

    let order = graph.reachable(root).unwrap();
    let narrow_id = order.iter().position(|&node| node == narrow).unwrap();
    assert_eq!(layout.elements[narrow_id * a + 1], [n, n]);
}

#[test]
fn test_compile_rejects_cycle() {
    // Built by hand: node 0's second element points back at node 0.
    let graph = CircuitGraph::from_nodes(vec![
        Node::Decomposition {
            elements: vec![(1, 2), (3, 0)],
        },
        Node::Literal {
            variable: 0,
            positive: true,
        },
        Node::True,
        Node::Literal {
            variable: 0,
            positive: false,
        },
    ]);
    let err = compile(&graph, 0).unwrap_err();
    assert!(matches!(err, CircuitError::Structural { .. }));
    assert!(err.to_string().contains("cycle"));
}

#[test]
fn test_compile_rejects_dangling_reference() {
    let graph = CircuitGraph::from_nodes(vec![Node::Decomposition {
        elements: vec![(7, 8)],
    }]);
    let err = compile(&graph, 0).unwrap_err();
    assert!(matches!(err, CircuitError::Structural { .. }));
}

#[test]
fn test_compile_rejects_missing_root() {
    let graph = CircuitGraph::new();
    assert!(compile(&graph, 0).is_err());
}

#[test]
fn test_compile_rejects_literal_root() {
    let mut graph = CircuitGraph::new();
    let x = graph.literal(0, true);
    let err = compile(&graph, x).unwrap_err();
    assert!(err.to_string().contains("root"));
}

#[test]
fn test_compile_rejects_empty_decomposition() {
    let graph = CircuitGraph::from_nodes(vec![Node::Decomposition { elements: vec![] }]);
    let err = compile(&graph, 0).unwrap_err();
    assert!(err.to_string().contains("no elements"));
}

#[test]
fn test_compile_rejects_duplicate_positive_literals() {
    let graph = CircuitGraph::from_nodes(vec![
        Node::Decomposition {
            elements: vec![(1, 3), (2, 3)],
        },
        Node::Literal {
            variable: 0,
            positive: true,
        },
        Node::Literal {
            variable: 0,
            positive: true,
        },
        Node::True,
    ]);
    let err = compile(&graph, 0).unwrap_err();
    assert!(err.to_string().contains("duplicate"));
}

#[test]
fn test_compile_rejects_variable_gap() {
    // Positive literals for variables 0 and 2 but not 1.
    let mut graph = CircuitGraph::new();
    let x0 = graph.literal(0, true);
    let x2 = graph.literal(2, true);
    let top = graph.true_node();
    let inner = graph.decomposition(vec![(x2, top)]);
    let root = graph.decomposition(vec![(x0, inner)]);
    let err = compile(&graph, root).unwrap_err();
    assert!(err.to_string().contains("contiguous"));
}

#[test]
fn test_pos_literal_order_is_ascending_by_variable() {
    let (graph, root) = exactly_k(5, 2).unwrap();
    let layout = compile(&graph, root).unwrap();

    let var_of = |id: usize| {
        let index = layout
            .literal_ids
            .iter()
            .position(|&lit| lit == id)
            .unwrap();
        assert!(layout.literal_signs[index]);
        layout.literal_vars[index]
    };
    let vars: Vec<usize> = layout.pos_literal_order.iter().map(|&id| var_of(id)).collect();
    assert_eq!(vars, vec![0, 1, 2, 3, 4]);
}
