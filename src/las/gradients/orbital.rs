use crate::errors::LasError;
use crate::initialization::LasSystem;
use crate::integrals::H2Eff;
use crate::las::rdm::{cumulant, make_casdm1s, make_casdm1s_sub, make_casdm2};
use crate::las::{CiVectors, StateDm1s};
use crate::utils::contract_last3;
use ndarray::prelude::*;

/// Form in which the generalized Fock matrix F1 is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FockForm {
    /// Orbital rotation gradient F1 - F1^T.
    Gradient,
    /// F1 itself.
    Raw,
    /// (F1 + F1^T) / 2
    Symmetrized,
}

impl FockForm {
    /// -1, 0 and +1 select the antisymmetrized, raw and symmetrized forms.
    pub fn from_hermi(hermi: i32) -> Result<Self, LasError> {
        match hermi {
            -1 => Ok(FockForm::Gradient),
            0 => Ok(FockForm::Raw),
            1 => Ok(FockForm::Symmetrized),
            _ => Err(LasError::Configuration(format!(
                "hermiticity {} of the generalized Fock matrix is not -1, 0 or 1",
                hermi
            ))),
        }
    }

    pub fn apply(self, f1: Array2<f64>) -> Array2<f64> {
        match self {
            FockForm::Gradient => &f1 - &f1.t(),
            FockForm::Raw => f1,
            FockForm::Symmetrized => (&f1 + &f1.t()) * 0.5,
        }
    }
}

impl<'a> LasSystem<'a> {
    /// Generalized Fock matrix in the MO basis,
    /// F1[p, q] = sum_s [(h + v_s) D_s]_pq + sum_uvw (p u|v w) L[q, u, v, w],
    /// where the second term runs over active q only and L is the cumulant of the
    /// state-averaged active 2-RDM.
    pub fn get_grad_orb(
        &self,
        mo_coeff: ArrayView2<f64>,
        ci: &CiVectors,
        h2eff: &H2Eff,
        veff: Option<ArrayView3<f64>>,
        form: FockForm,
    ) -> Result<Array2<f64>, LasError> {
        let casdm1frs: StateDm1s = self.states_make_casdm1s_sub(ci)?;
        let casdm1s_sub: Vec<Array3<f64>> = make_casdm1s_sub(&casdm1frs, self.weights())?;
        let veff: Array3<f64> = match veff {
            Some(v) => v.to_owned(),
            None => self.get_split_veff(mo_coeff, h2eff, &casdm1frs)?,
        };
        let dm1s: Array3<f64> = self.make_rdm1s(mo_coeff, &casdm1s_sub);
        let hcore = self.engine.hcore();

        let mut f1_ao: Array2<f64> = Array2::zeros((self.n_ao, self.n_ao));
        for (v, dm) in veff.outer_iter().zip(dm1s.outer_iter()) {
            f1_ao += &(&hcore + &v).dot(&dm);
        }
        // the overlap brings the density matrix back to the MO basis
        let smo: Array2<f64> = self.engine.ovlp().dot(&mo_coeff);
        let mut f1: Array2<f64> = mo_coeff.t().dot(&f1_ao).dot(&smo);

        let casdm2: Array4<f64> = make_casdm2(
            &casdm1frs,
            &self.states_make_casdm2_sub(ci)?,
            self.weights(),
        )?;
        let cum: Array4<f64> = cumulant(casdm2.view(), make_casdm1s(&casdm1s_sub).view());
        let eri: Array4<f64> = h2eff.unpack();
        let mut f1_cas = f1.slice_mut(s![.., self.n_core..self.n_occ()]);
        f1_cas += &contract_last3(eri.view(), cum.view());
        Ok(form.apply(f1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::las::StateDm2;
    use crate::utils::tests::*;
    use approx::AbsDiffEq;

    pub const EPSILON: f64 = 1e-12;

    #[test]
    fn forms_of_the_generalized_fock_matrix() {
        let molecule = get_test_molecule();
        let system = get_two_state_system(&molecule);
        let mo = molecule.mo_coeff.view();
        let ci = system.get_init_guess_ci(mo, None).unwrap();
        let h2eff = system.get_h2eff(mo);
        let f1 = system
            .get_grad_orb(mo, &ci, &h2eff, None, FockForm::Raw)
            .unwrap();
        let grad = system
            .get_grad_orb(mo, &ci, &h2eff, None, FockForm::Gradient)
            .unwrap();
        let sym = system
            .get_grad_orb(mo, &ci, &h2eff, None, FockForm::Symmetrized)
            .unwrap();
        assert!(grad.abs_diff_eq(&(&f1 - &f1.t()), EPSILON));
        assert!(sym.abs_diff_eq(&((&f1 + &f1.t()) * 0.5), EPSILON));
        assert_eq!(FockForm::from_hermi(-1), Ok(FockForm::Gradient));
        assert!(FockForm::from_hermi(2).is_err());
    }

    #[test]
    fn orbital_gradient_matches_finite_differences() {
        let molecule = get_test_molecule();
        let system = get_two_state_system(&molecule);
        let mo = molecule.mo_coeff.view();
        let ci = system.get_init_guess_ci(mo, None).unwrap();
        let casdm1frs: StateDm1s = system.states_make_casdm1s_sub(&ci).unwrap();
        let casdm2fr: StateDm2 = system.states_make_casdm2_sub(&ci).unwrap();
        let grad = system
            .get_grad_orb(mo, &ci, &system.get_h2eff(mo), None, FockForm::Gradient)
            .unwrap();

        let energy = |p: usize, q: usize, t: f64| -> f64 {
            let mut u: Array2<f64> = Array2::eye(system.n_mo);
            u[[p, p]] = t.cos();
            u[[q, q]] = t.cos();
            u[[p, q]] = t.sin();
            u[[q, p]] = -t.sin();
            let mo_new: Array2<f64> = mo.dot(&u);
            let h2eff = system.get_h2eff(mo_new.view());
            system
                .energy_elec(mo_new.view(), &h2eff, &casdm1frs, &casdm2fr, None)
                .unwrap()
        };
        let step: f64 = 1e-4;
        // core-active, active-active between fragments, active-external and core-external
        for (p, q) in [(1, 0), (3, 1), (6, 2), (7, 0)] {
            let numerical: f64 = (energy(p, q, step) - energy(p, q, -step)) / (2.0 * step);
            assert!(
                numerical.abs_diff_eq(&(2.0 * grad[[p, q]]), 1e-6),
                "rotation ({}, {}): {} vs {}",
                p,
                q,
                numerical,
                2.0 * grad[[p, q]]
            );
        }
    }
}
