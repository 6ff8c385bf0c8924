//! The localized active space (LAS) wave function: RDM aggregation, effective
//! Hamiltonians, energies, gradients, canonicalization and the solvers.
pub mod canonicalize;
pub mod energy;
mod fock;
pub mod gradients;
pub mod h1eff;
pub mod kernel;
pub mod lasscf;
pub mod logging;
pub mod rdm;
pub mod state_average;
pub mod veff;

use ndarray::prelude::*;

/// CI vectors indexed [fragment][state]. A missing vector is reinitialized by the next solve.
pub type CiVectors = Vec<Vec<Option<Array2<f64>>>>;

/// Spin-separated 1-RDMs of every fragment, each of shape (nroots, 2, n, n).
pub type StateDm1s = Vec<Array4<f64>>;

/// Spin-summed 2-RDMs [fragment][state], each of shape (n, n, n, n).
pub type StateDm2 = Vec<Vec<Array4<f64>>>;
