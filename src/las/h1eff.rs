use crate::errors::LasError;
use crate::initialization::LasSystem;
use crate::integrals::H2Eff;
use crate::las::rdm::{make_casdm1s, make_casdm1s_sub, states_make_casdm1s};
use crate::las::{CiVectors, StateDm1s};
use crate::utils::{contract_coulomb, contract_exchange};
use ndarray::prelude::*;

impl<'a> LasSystem<'a> {
    /// Effective one-electron Hamiltonians of every fragment and state, each of shape
    /// (nroots, 2, n, n).
    ///
    /// The state-averaged potential `veff` (spin-separated, AO basis) is first corrected to the
    /// density of every state: h1[r, s] = h1 + J[Dr - D] - K[Drs - Ds]. The field of the
    /// fragment itself is then removed again, h1f[r, s] = h1[r, s] - J[Dfr] + K[Dfrs], so that
    /// the fragment sees the mean field of the core and of all other fragments only.
    pub fn h1e_for_cas(
        &self,
        mo_coeff: ArrayView2<f64>,
        veff: ArrayView3<f64>,
        h2eff: &H2Eff,
        casdm1frs: &StateDm1s,
    ) -> Result<Vec<Array4<f64>>, LasError> {
        let mo_cas = mo_coeff.slice(s![.., self.n_core..self.n_occ()]);
        let hcore = self.engine.hcore();
        let casdm1s_sub: Vec<Array3<f64>> = make_casdm1s_sub(casdm1frs, self.weights())?;
        let avgdm1s: Array3<f64> = make_casdm1s(&casdm1s_sub);
        let statedm1s: Array4<f64> = states_make_casdm1s(casdm1frs);
        let h2e: Array4<f64> = h2eff.active_block(self.n_core);

        let mut h1e: Array3<f64> = Array3::zeros((2, self.n_cas, self.n_cas));
        for (mut h, v) in h1e.outer_iter_mut().zip(veff.outer_iter()) {
            h.assign(&mo_cas.t().dot(&(&hcore + &v)).dot(&mo_cas));
        }

        // correction to the density of every state
        let mut h1e_r: Array4<f64> = Array4::zeros((self.nroots(), 2, self.n_cas, self.n_cas));
        for (root, mut h_r) in h1e_r.outer_iter_mut().enumerate() {
            let dm1s: Array3<f64> = &statedm1s.slice(s![root, .., .., ..]) - &avgdm1s;
            let vj: Array2<f64> = contract_coulomb(h2e.view(), dm1s.sum_axis(Axis(0)).view());
            for spin in 0..2 {
                let vk: Array2<f64> = contract_exchange(h2e.view(), dm1s.slice(s![spin, .., ..]));
                h_r.slice_mut(s![spin, .., ..])
                    .assign(&(&h1e.slice(s![spin, .., ..]) + &vj - &vk));
            }
        }

        // removal of the self-interaction of every fragment
        let mut h1e_fr: Vec<Array4<f64>> = Vec::with_capacity(self.nfrags());
        for (frag, dm1rs) in self.fragments.iter().zip(casdm1frs.iter()) {
            let r = frag.cas_range();
            let n: usize = frag.n_orbs;
            let eri: Array4<f64> = h2eff.fragment_slice(self.n_core, r.clone());
            let mut h1_f: Array4<f64> = Array4::zeros((self.nroots(), 2, n, n));
            for (root, mut h) in h1_f.outer_iter_mut().enumerate() {
                let dm1s = dm1rs.slice(s![root, .., .., ..]);
                let vj: Array2<f64> = contract_coulomb(eri.view(), dm1s.sum_axis(Axis(0)).view());
                for spin in 0..2 {
                    let vk: Array2<f64> = contract_exchange(eri.view(), dm1s.slice(s![spin, .., ..]));
                    h.slice_mut(s![spin, .., ..]).assign(
                        &(&h1e_r.slice(s![root, spin, r.clone(), r.clone()]) - &vj + &vk),
                    );
                }
            }
            h1e_fr.push(h1_f);
        }
        Ok(h1e_fr)
    }

    /// [h1e_for_cas](LasSystem::h1e_for_cas) of CI vectors with the split state-averaged
    /// potential computed on the fly.
    pub fn get_h1eff(
        &self,
        mo_coeff: ArrayView2<f64>,
        ci: &CiVectors,
        h2eff: &H2Eff,
    ) -> Result<Vec<Array4<f64>>, LasError> {
        let casdm1frs: StateDm1s = self.states_make_casdm1s_sub(ci)?;
        let veff: Array3<f64> = self.get_split_veff(mo_coeff, h2eff, &casdm1frs)?;
        self.h1e_for_cas(mo_coeff, veff.view(), h2eff, &casdm1frs)
    }

    /// Spin-separated state-averaged potential J - K/2 of the total density, split with the
    /// active spin density.
    pub fn get_split_veff(
        &self,
        mo_coeff: ArrayView2<f64>,
        h2eff: &H2Eff,
        casdm1frs: &StateDm1s,
    ) -> Result<Array3<f64>, LasError> {
        let casdm1s_sub: Vec<Array3<f64>> = make_casdm1s_sub(casdm1frs, self.weights())?;
        let veff: Array2<f64> = self.get_veff(self.make_rdm1(mo_coeff, &casdm1s_sub).view());
        Ok(self.split_veff(veff.view(), h2eff, mo_coeff, &casdm1s_sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fci::ProductStateSolver;
    use crate::utils::tests::*;
    use approx::AbsDiffEq;

    #[test]
    fn fragment_hamiltonian_is_field_of_core_and_other_fragments() {
        let molecule = get_test_molecule();
        let system = get_two_state_system(&molecule);
        let mo = molecule.mo_coeff.view();
        let ci = system.get_init_guess_ci(mo, None).unwrap();
        let h2eff = system.get_h2eff(mo);
        let h1eff = system.get_h1eff(mo, &ci, &h2eff).unwrap();
        let (h1_core, _) = system.get_h1e_core(mo);
        let eri_cas = h2eff.active_block(system.n_core);
        for root in 0..system.nroots() {
            let boxes = system
                .fragments
                .iter()
                .map(|frag| frag.cibox.as_ref())
                .collect();
            let targets = (0..system.nfrags())
                .map(|frag| system.states.target(root, frag))
                .collect();
            let solver = ProductStateSolver::new(boxes, system.ncas_sub(), targets);
            let dm1s: Vec<Array3<f64>> = system
                .states_make_casdm1s_sub(&ci)
                .unwrap()
                .iter()
                .map(|dm| dm.slice(s![root, .., .., ..]).to_owned())
                .collect();
            for frag in 0..system.nfrags() {
                let reference = solver.fragment_h1(frag, h1_core.view(), eri_cas.view(), &dm1s);
                assert!(
                    h1eff[frag]
                        .slice(s![root, .., .., ..])
                        .abs_diff_eq(&reference, 1e-10),
                    "effective Hamiltonian of fragment {} in state {} differs",
                    frag,
                    root
                );
            }
        }
    }
}
