//! Energy gradients of a LAS wave function with respect to orbital rotations and CI
//! relaxation.
mod ci;
mod orbital;
mod ugg;

pub use orbital::FockForm;
pub use ugg::UnitaryGroupGenerators;

use crate::errors::LasError;
use crate::initialization::LasSystem;
use crate::integrals::H2Eff;
use crate::las::{CiVectors, StateDm1s};
use ndarray::prelude::*;

/// Gradient of the LAS energy in packed and in matrix form.
#[derive(Debug, Clone)]
pub struct LasGradient {
    /// non-redundant orbital rotation gradient
    pub gorb: Array1<f64>,
    /// CI gradients of all fragments and states, flattened
    pub gci: Array1<f64>,
    /// antisymmetric orbital gradient (nmo, nmo)
    pub gorb_full: Array2<f64>,
    pub gci_full: CiVectors,
}

impl LasGradient {
    pub fn norm_gorb(&self) -> f64 {
        self.gorb.dot(&self.gorb).sqrt()
    }

    pub fn norm_gci(&self) -> f64 {
        self.gci.dot(&self.gci).sqrt()
    }
}

impl<'a> LasSystem<'a> {
    /// Orbital rotation and CI relaxation gradients of the CI vectors `ci` with the orbitals
    /// `mo_coeff`.
    pub fn get_grad(
        &self,
        mo_coeff: ArrayView2<f64>,
        ci: &CiVectors,
        h2eff: &H2Eff,
    ) -> Result<LasGradient, LasError> {
        let ugg = UnitaryGroupGenerators::new(self, ci);
        let casdm1frs: StateDm1s = self.states_make_casdm1s_sub(ci)?;
        let veff: Array3<f64> = self.get_split_veff(mo_coeff, h2eff, &casdm1frs)?;
        let h1eff: Vec<Array4<f64>> = self.h1e_for_cas(mo_coeff, veff.view(), h2eff, &casdm1frs)?;

        let gorb_full: Array2<f64> =
            self.get_grad_orb(mo_coeff, ci, h2eff, Some(veff.view()), FockForm::Gradient)?;
        let gci_full: CiVectors = self.get_grad_ci(ci, &h1eff, h2eff)?;
        let packed: Array1<f64> = ugg.pack(gorb_full.view(), &gci_full)?;
        let nvar_orb: usize = ugg.nvar_orb();
        Ok(LasGradient {
            gorb: packed.slice(s![..nvar_orb]).to_owned(),
            gci: packed.slice(s![nvar_orb..]).to_owned(),
            gorb_full,
            gci_full,
        })
    }
}
