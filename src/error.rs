//! Construction-time errors.
//!
//! Runtime outcomes of the heuristic (no structure, failed restricted
//! solves, callback aborts, exhausted budgets) are not errors; they are
//! reported through [`RunOutcome`](crate::dw::RunOutcome) and the
//! controller's [`Phase`](crate::dw::Phase).

use thiserror::Error;

/// Errors raised while building a model or configuring the heuristic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DwError {
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The master problem is malformed.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// A vector handed in by the host has the wrong length.
    #[error("{what} has length {actual}, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl DwError {
    pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(DwError::DimensionMismatch {
                what,
                expected,
                actual,
            })
        }
    }
}
