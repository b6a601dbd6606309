use thiserror::Error;

/// Errors surfaced by circuit compilation and evaluation.
#[derive(Debug, Error)]
pub enum CircuitError {
    /// The circuit is malformed (cycle, dangling reference, invalid root).
    /// Raised at compile time only; no partially built layout is exposed.
    #[error("structural error: {reason}")]
    Structural { reason: String },

    /// A caller-supplied numeric input is outside the valid domain.
    #[error("numeric domain error: {reason}")]
    NumericDomain { reason: String },

    /// The requested subset size cannot be satisfied by the circuit.
    #[error("sampling constraint error: subset size {subset_size} exceeds {num_variables} variables")]
    SamplingConstraint {
        subset_size: usize,
        num_variables: usize,
    },
}

impl CircuitError {
    pub fn structural(reason: impl Into<String>) -> Self {
        CircuitError::Structural {
            reason: reason.into(),
        }
    }

    pub fn numeric_domain(reason: impl Into<String>) -> Self {
        CircuitError::NumericDomain {
            reason: reason.into(),
        }
    }
}
