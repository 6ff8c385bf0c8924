//! Fragment CI solvers. A fragment CI problem is solved by any [FragmentCiBox]; the
//! LAS routines only ever talk to this interface.
mod dense;
mod product_state;
pub mod strings;

pub use dense::DenseFciBox;
pub use product_state::{ProductState, ProductStateSolver};

use crate::errors::LasError;
use ndarray::prelude::*;
use std::fmt;

/// Quantum numbers that select the root of a fragment CI problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CiTarget {
    pub nelec: (usize, usize),
    /// spin multiplicity 2S + 1
    pub smult: usize,
    pub wfnsym: usize,
}

/// Ground state of a fragment CI problem.
#[derive(Debug, Clone)]
pub struct CiSolution {
    pub energy: f64,
    pub ci: Array2<f64>,
    pub converged: bool,
}

/// CI collaborator of one fragment. CI vectors are stored as (alpha strings, beta strings)
/// matrices, the one-electron operators are spin-separated (2, norb, norb) stacks.
pub trait FragmentCiBox: Send + Sync + fmt::Debug {
    /// Lowest root with the requested quantum numbers.
    fn kernel(
        &self,
        h1s: ArrayView3<f64>,
        eri: ArrayView4<f64>,
        norb: usize,
        target: &CiTarget,
        ci0: Option<ArrayView2<f64>>,
    ) -> Result<CiSolution, LasError>;

    /// dm1s[s, p, q] = <a+_ps a_qs>
    fn make_rdm1s(&self, ci: ArrayView2<f64>, norb: usize, nelec: (usize, usize)) -> Array3<f64>;

    /// Spin-summed one- and two-particle density matrices,
    /// dm2[p, q, r, s] = sum_st <a+_ps a+_rt a_st a_qs>
    fn make_rdm12(
        &self,
        ci: ArrayView2<f64>,
        norb: usize,
        nelec: (usize, usize),
    ) -> (Array2<f64>, Array4<f64>);

    /// Action of the Hamiltonian on a CI vector.
    fn contract_h(
        &self,
        h1s: ArrayView3<f64>,
        eri: ArrayView4<f64>,
        ci: ArrayView2<f64>,
        norb: usize,
        nelec: (usize, usize),
    ) -> Array2<f64>;

    /// CI vector of the same state after the orbitals were rotated by `u`
    /// (new orbitals = old orbitals . u).
    fn transform_ci_for_orbital_rotation(
        &self,
        ci: ArrayView2<f64>,
        norb: usize,
        nelec: (usize, usize),
        u: ArrayView2<f64>,
    ) -> Result<Array2<f64>, LasError>;

    /// Expectation value of S^2.
    fn spin_square(&self, ci: ArrayView2<f64>, norb: usize, nelec: (usize, usize)) -> f64;

    /// Starting vector for the product-state iterations.
    fn init_guess(
        &self,
        h1s: ArrayView3<f64>,
        eri: ArrayView4<f64>,
        norb: usize,
        target: &CiTarget,
    ) -> Result<Array2<f64>, LasError> {
        Ok(self.kernel(h1s, eri, norb, target, None)?.ci)
    }
}
