use ndarray_linalg::error::LinalgError;
use std::fmt;

/// Failures of the LAS routines. Non-convergence of a solver is not an error, it is
/// reported through the convergence flags of the results.
#[derive(Debug, Clone, PartialEq)]
pub enum LasError {
    /// Invalid weights, electron counts, table shapes or duplicate states.
    Configuration(String),
    /// CI vectors or density matrices that do not fit the fragment partitioning.
    StructuralInconsistency(String),
    /// Requested feature that is not available for LAS wave functions.
    Unimplemented(String),
    /// A dense linear algebra routine failed.
    Linalg(String),
}

impl fmt::Display for LasError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LasError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            LasError::StructuralInconsistency(msg) => {
                write!(f, "Structural inconsistency: {}", msg)
            }
            LasError::Unimplemented(msg) => write!(f, "Not implemented: {}", msg),
            LasError::Linalg(msg) => write!(f, "Linear algebra failure: {}", msg),
        }
    }
}

impl std::error::Error for LasError {}

impl From<LinalgError> for LasError {
    fn from(err: LinalgError) -> Self {
        LasError::Linalg(err.to_string())
    }
}
