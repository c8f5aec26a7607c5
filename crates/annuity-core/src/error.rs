use thiserror::Error;

/// Errors surfaced by the pricing and reserve engines.
///
/// Every failure carries the violated invariant and the offending value so
/// batch drivers can report per-product diagnostics without re-running.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    /// Input violated a precondition before any computation ran.
    #[error("precondition failed: {what} (got {value})")]
    Precondition { what: String, value: f64 },

    /// A numerical routine failed to produce a usable value.
    #[error("numerical failure in {what}: value {value} after {iterations} iterations")]
    Numeric {
        what: String,
        value: f64,
        iterations: u32,
    },

    /// Input data was structurally inconsistent (shape or field mismatch).
    #[error("data error: {0}")]
    Data(String),

    /// A validation gate halted and the caller asked for an ensured result.
    #[error("validation halt at gate '{gate}': {message}")]
    ValidationHalt { gate: String, message: String },
}

impl PricingError {
    /// Shorthand for a precondition failure.
    pub fn precondition(what: impl Into<String>, value: f64) -> Self {
        PricingError::Precondition {
            what: what.into(),
            value,
        }
    }
}
