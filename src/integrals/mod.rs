//! Mean-field collaborators: one-electron integrals, Coulomb/exchange builds and the
//! partial transformation of the two-electron integrals to the active space.
mod df;
mod h2eff;
mod incore;

pub use df::DfAdapter;
pub use h2eff::H2Eff;
pub use incore::InCoreEngine;

use ndarray::prelude::*;

/// Source of the AO integrals of the host mean-field calculation.
pub trait MeanFieldEngine: Sync {
    /// Number of atomic orbitals.
    fn nao(&self) -> usize;

    /// Core Hamiltonian in AO basis.
    fn hcore(&self) -> ArrayView2<f64>;

    /// AO overlap matrix.
    fn ovlp(&self) -> ArrayView2<f64>;

    /// Nuclear repulsion energy.
    fn energy_nuc(&self) -> f64;

    /// Coulomb and exchange matrices of a stack of AO density matrices:
    /// J[i, m, n] = sum_ls (mn|ls) D[i, l, s] and K[i, m, n] = sum_ls (ml|sn) D[i, l, s]
    fn get_jk(&self, dms: ArrayView3<f64>) -> (Array3<f64>, Array3<f64>);

    /// Partially transformed integrals (p u|v w), p running over the columns of `mo` and
    /// u, v, w over the columns of `mo_cas`.
    fn ao2mo(&self, mo: ArrayView2<f64>, mo_cas: ArrayView2<f64>) -> H2Eff;
}
