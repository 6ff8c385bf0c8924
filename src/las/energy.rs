use crate::errors::LasError;
use crate::initialization::LasSystem;
use crate::integrals::H2Eff;
use crate::las::rdm::{cumulant, make_casdm1s, make_casdm1s_sub, make_casdm2};
use crate::las::{CiVectors, StateDm1s, StateDm2};
use crate::utils::contract_all;
use ndarray::prelude::*;

impl<'a> LasSystem<'a> {
    /// Mean-field part sum_s <h + v_s / 2, D_s> of the energy in the AO basis.
    fn energy_one_body(&self, veff: ArrayView3<f64>, dm1s: ArrayView3<f64>) -> f64 {
        let hcore = self.engine.hcore();
        veff.outer_iter()
            .zip(dm1s.outer_iter())
            .map(|(v, dm)| contract_all(&(&hcore + &(&v * 0.5)), &dm))
            .sum()
    }

    /// Electronic energy of the state-averaged ensemble. The mean-field part is evaluated with
    /// the split potential `veff` (computed if not given), the correlation part with the
    /// cumulant of the state-averaged active 2-RDM. Since the cumulant between fragments
    /// vanishes, only the fragment blocks contribute to it.
    pub fn energy_elec(
        &self,
        mo_coeff: ArrayView2<f64>,
        h2eff: &H2Eff,
        casdm1frs: &StateDm1s,
        casdm2fr: &StateDm2,
        veff: Option<ArrayView3<f64>>,
    ) -> Result<f64, LasError> {
        let casdm1s_sub: Vec<Array3<f64>> = make_casdm1s_sub(casdm1frs, self.weights())?;
        let veff: Array3<f64> = match veff {
            Some(v) => v.to_owned(),
            None => self.get_split_veff(mo_coeff, h2eff, casdm1frs)?,
        };
        let dm1s: Array3<f64> = self.make_rdm1s(mo_coeff, &casdm1s_sub);
        let e1: f64 = self.energy_one_body(veff.view(), dm1s.view());

        let casdm1s: Array3<f64> = make_casdm1s(&casdm1s_sub);
        let casdm2: Array4<f64> = make_casdm2(casdm1frs, casdm2fr, self.weights())?;
        let cum: Array4<f64> = cumulant(casdm2.view(), casdm1s.view());
        let e2: f64 = 0.5 * contract_all(&h2eff.active_block(self.n_core), &cum);
        Ok(e1 + e2)
    }

    /// Electronic energy of every state. Each state sees the exact potential of its own
    /// density; the cumulant contributions are summed fragment by fragment.
    pub fn states_energy_elec(
        &self,
        mo_coeff: ArrayView2<f64>,
        h2eff: &H2Eff,
        casdm1frs: &StateDm1s,
        casdm2fr: &StateDm2,
    ) -> Result<Array1<f64>, LasError> {
        let dm1rs: Array4<f64> = self.states_make_rdm1s(mo_coeff, casdm1frs);
        let eri_sub: Vec<Array4<f64>> = self
            .fragments
            .iter()
            .map(|frag| h2eff.fragment_slice(self.n_core, frag.cas_range()))
            .collect();
        let mut energies: Array1<f64> = Array1::zeros(self.nroots());
        for (root, dm1s) in dm1rs.outer_iter().enumerate() {
            let veff: Array3<f64> = self.get_veff_spin_sep(dm1s);
            let e1: f64 = self.energy_one_body(veff.view(), dm1s);
            let mut e2: f64 = 0.0;
            for ((eri, dm1), dm2) in eri_sub.iter().zip(casdm1frs.iter()).zip(casdm2fr.iter()) {
                let dm2_r: &Array4<f64> = dm2.get(root).ok_or_else(|| {
                    LasError::Configuration(format!("no 2-RDM of state {}", root))
                })?;
                let cum: Array4<f64> = cumulant(dm2_r.view(), dm1.slice(s![root, .., .., ..]));
                e2 += 0.5 * contract_all(eri, &cum);
            }
            energies[root] = e1 + e2;
        }
        Ok(energies)
    }

    /// Total energy of the ensemble of the CI vectors `ci` with the orbitals `mo_coeff`.
    pub fn energy_tot(
        &self,
        mo_coeff: ArrayView2<f64>,
        h2eff: &H2Eff,
        ci: &CiVectors,
    ) -> Result<f64, LasError> {
        let casdm1frs: StateDm1s = self.states_make_casdm1s_sub(ci)?;
        let casdm2fr: StateDm2 = self.states_make_casdm2_sub(ci)?;
        Ok(self.engine.energy_nuc() + self.energy_elec(mo_coeff, h2eff, &casdm1frs, &casdm2fr, None)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::las::{StateDm1s, StateDm2};
    use crate::utils::tests::*;
    use approx::AbsDiffEq;
    use ndarray::prelude::*;

    pub const EPSILON: f64 = 1e-8;

    #[test]
    fn ensemble_energy_is_weighted_sum_of_state_energies() {
        let molecule = get_test_molecule();
        let system = get_two_state_system(&molecule);
        let mo = molecule.mo_coeff.view();
        let ci = system.get_init_guess_ci(mo, None).unwrap();
        let h2eff = system.get_h2eff(mo);
        let casdm1frs: StateDm1s = system.states_make_casdm1s_sub(&ci).unwrap();
        let casdm2fr: StateDm2 = system.states_make_casdm2_sub(&ci).unwrap();
        let e_states = system
            .states_energy_elec(mo, &h2eff, &casdm1frs, &casdm2fr)
            .unwrap();
        let e_sa = system
            .energy_elec(mo, &h2eff, &casdm1frs, &casdm2fr, None)
            .unwrap();
        let weights = Array1::from(system.weights().to_vec());
        assert!(e_sa.abs_diff_eq(&weights.dot(&e_states), EPSILON));
    }

    #[test]
    fn energy_of_one_state_from_full_density_matrices() {
        let molecule = get_test_molecule();
        let system = get_test_system(&molecule);
        let mo = molecule.mo_coeff.view();
        let ci = system.get_init_guess_ci(mo, None).unwrap();
        let h2eff = system.get_h2eff(mo);
        let casdm1frs: StateDm1s = system.states_make_casdm1s_sub(&ci).unwrap();
        let casdm2fr: StateDm2 = system.states_make_casdm2_sub(&ci).unwrap();
        let e_states = system
            .states_energy_elec(mo, &h2eff, &casdm1frs, &casdm2fr)
            .unwrap();

        // E = E_core + <h1_core, D> + 1/2 <(uv|wx), d2> in the active space
        let (h1, energy_core) = system.get_h1e_core(mo);
        let casdm1: Array2<f64> = system.make_casdm1s(&ci).unwrap().sum_axis(Axis(0));
        let casdm2: Array4<f64> = system.make_casdm2(&ci).unwrap();
        let eri: Array4<f64> = h2eff.active_block(system.n_core);
        let reference: f64 = energy_core - molecule.engine.energy_nuc
            + (&h1 * &casdm1).sum()
            + 0.5 * (&eri * &casdm2).sum();
        assert!(e_states[0].abs_diff_eq(&reference, EPSILON));
    }
}
