//! # ksubset-core
//!
//! Backend-independent core for the ksubset probabilistic circuit library.
//!
//! This crate provides the pieces that exist before any tensor is allocated:
//!
//! - [`CircuitGraph`]: an arena of circuit nodes ([`Node`]) referenced by
//!   integer id ([`NodeRef`])
//! - [`exactly_k`]: a cardinality-constraint circuit builder
//! - [`compile`] / [`CircuitLayout`]: flattening a circuit into fixed-width
//!   index tables suitable for level-wise batched evaluation
//! - [`log1mexp`] / [`logsumexp_dim`]: numerically stable log-domain
//!   primitives shared by the evaluation passes
//! - [`CircuitError`]: the error kinds surfaced by compilation and evaluation
//!
//! ## Circuits
//!
//! A circuit is a DAG of decomposition nodes (an OR over mutually exclusive
//! AND-decompositions, each element a `(prime, sub)` pair), literal leaves,
//! and the constant-true leaf. Compilation assigns dense ids, partitions the
//! decomposition nodes into dependency levels, and materializes padded
//! `elements` and `parents` tables so that both evaluation passes reduce to
//! gather / reduce / scatter expressions over one buffer per pass.
//!
//! ```rust
//! use ksubset_core::{compile, exactly_k};
//!
//! let (graph, root) = exactly_k(4, 2).unwrap();
//! let layout = compile(&graph, root).unwrap();
//! assert_eq!(layout.num_variables, 4);
//! ```

pub mod compile;
pub mod constraint;
pub mod error;
pub mod node;
pub mod stability;

pub use compile::*;
pub use constraint::*;
pub use error::*;
pub use node::*;
pub use stability::*;
