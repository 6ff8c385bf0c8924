use crate::integrals::H2Eff;
use crate::properties::Properties;
use ndarray::prelude::*;

impl Properties {
    /// Returns the cached (p u|v w) integrals of the current orbitals.
    pub fn h2eff_sub(&self) -> Option<&H2Eff> {
        match self.get("h2eff_sub") {
            Some(value) => Some(value.as_h2_eff().unwrap()),
            _ => None,
        }
    }

    /// Returns the spin-separated effective potential in AO basis.
    pub fn veff(&self) -> Option<ArrayView3<f64>> {
        self.get("veff")
            .map(|value| value.as_array3().unwrap().view())
    }

    pub fn mo_energy(&self) -> Option<ArrayView1<f64>> {
        self.get("mo_energy")
            .map(|value| value.as_array1().unwrap().view())
    }

    pub fn mo_occ(&self) -> Option<ArrayView1<f64>> {
        self.get("mo_occ")
            .map(|value| value.as_array1().unwrap().view())
    }

    /// Returns the total energies of the states of the manifold.
    pub fn e_states(&self) -> Option<ArrayView1<f64>> {
        self.get("e_states")
            .map(|value| value.as_array1().unwrap().view())
    }

    /// Returns the state-averaged total energy.
    pub fn e_tot(&self) -> Option<f64> {
        self.get("e_tot").map(|value| *value.as_double().unwrap())
    }

    /// Returns the symmetry labels of the orbitals at the time of the last canonicalization.
    pub fn orbsym(&self) -> Option<&[usize]> {
        match self.get("orbsym") {
            Some(value) => Some(value.as_vec_usize().unwrap()),
            _ => None,
        }
    }

    /// Returns the convergence flag of the last calculation.
    pub fn converged(&self) -> Option<bool> {
        self.get("converged").map(|value| *value.as_bool().unwrap())
    }
}
