use crate::initialization::LasSystem;
use crate::integrals::H2Eff;
use crate::utils::to_matrix;
use ndarray::prelude::*;

impl<'a> LasSystem<'a> {
    /// Spin-summed effective potential J - K/2 of a spin-summed AO density matrix.
    pub fn get_veff(&self, dm: ArrayView2<f64>) -> Array2<f64> {
        let dms: Array3<f64> = dm.to_owned().insert_axis(Axis(0));
        let (vj, vk) = self.get_jk(dms.view());
        &vj.index_axis(Axis(0), 0) - &(&vk.index_axis(Axis(0), 0) * 0.5)
    }

    /// Spin-separated effective potential J[Da + Db] - K[Ds] of spin-separated AO densities.
    pub fn get_veff_spin_sep(&self, dm1s: ArrayView3<f64>) -> Array3<f64> {
        let (vj, vk) = self.get_jk(dm1s);
        let vj_total: Array2<f64> = vj.sum_axis(Axis(0));
        let mut veff: Array3<f64> = -vk;
        for mut v in veff.outer_iter_mut() {
            v += &vj_total;
        }
        veff
    }

    /// Splits the spin-summed potential `veff` into its alpha and beta parts. Only the spin
    /// density of the active space contributes to the difference; its exchange potential is
    /// built from the (p u|v w) integrals fragment by fragment, so that only the blocks with
    /// at least one active index are affected. Returns (2, nao, nao).
    pub fn split_veff(
        &self,
        veff: ArrayView2<f64>,
        h2eff: &H2Eff,
        mo_coeff: ArrayView2<f64>,
        casdm1s_sub: &[Array3<f64>],
    ) -> Array3<f64> {
        let (ncore, nocc, nmo, ncas) = (self.n_core, self.n_occ(), self.n_mo, self.n_cas);
        let eri: Array4<f64> = h2eff.unpack();
        let mut veff_s: Array2<f64> = Array2::zeros((nmo, nmo));
        for (frag, casdm1s) in self.fragments.iter().zip(casdm1s_sub.iter()) {
            let r = frag.cas_range();
            let sdm: Array2<f64> = &casdm1s.slice(s![0, .., ..]) - &casdm1s.slice(s![1, .., ..]);
            // eri_k[p, a, b, c] = (p b|c a) with b, c on the fragment
            let eri_k = eri
                .slice(s![.., r.clone(), r.clone(), ..])
                .permuted_axes([0, 3, 1, 2]);
            let sdm_vec: Array1<f64> = Array1::from_iter(sdm.iter().cloned());
            let vk_pa: Array2<f64> = to_matrix(eri_k, 2)
                .dot(&sdm_vec)
                .into_shape((nmo, ncas))
                .expect("a matrix-vector product is contiguous")
                * -0.5;
            let vk_aa: Array2<f64> = vk_pa.slice(s![ncore..nocc, ..]).to_owned();
            let mut columns = veff_s.slice_mut(s![.., ncore..nocc]);
            columns += &vk_pa;
            let mut rows = veff_s.slice_mut(s![ncore..nocc, ..]);
            rows += &vk_pa.t();
            let mut block = veff_s.slice_mut(s![ncore..nocc, ncore..nocc]);
            block -= &(&vk_aa * 0.5);
            block -= &(&vk_aa.t() * 0.5);
        }
        let smo: Array2<f64> = self.engine.ovlp().dot(&mo_coeff);
        let veff_s_ao: Array2<f64> = smo.dot(&veff_s).dot(&smo.t());
        ndarray::stack![Axis(0), &veff + &veff_s_ao, &veff - &veff_s_ao]
    }

    /// Effective potential of the active electrons. With density fitting and a half-transformed
    /// factor on `h2eff` the exchange part is built from that factor, otherwise from the full
    /// Coulomb/exchange routine. With `spin_sep` the result holds J - K[Ds] for both spins,
    /// otherwise a single matrix J - K/2. The core contributions are not included.
    pub fn fast_veffa(
        &self,
        casdm1s_sub: &[Array3<f64>],
        h2eff: &H2Eff,
        mo_coeff: ArrayView2<f64>,
        spin_sep: bool,
    ) -> Array3<f64> {
        let mo_cas = mo_coeff.slice(s![.., self.n_core..self.n_occ()]);
        let casdm1s: Array3<f64> = crate::las::rdm::make_casdm1s(casdm1s_sub);
        match (&self.df, &h2eff.bmpu) {
            (Some(df), Some(bmpu)) => {
                if spin_sep {
                    let (vj, vk) = df.jk_active(bmpu.view(), mo_cas, casdm1s.view());
                    let vj_total: Array2<f64> = vj.sum_axis(Axis(0));
                    let mut veff: Array3<f64> = -vk;
                    for mut v in veff.outer_iter_mut() {
                        v += &vj_total;
                    }
                    veff
                } else {
                    let casdm1: Array3<f64> = casdm1s.sum_axis(Axis(0)).insert_axis(Axis(0));
                    let (vj, vk) = df.jk_active(bmpu.view(), mo_cas, casdm1.view());
                    &vj - &(&vk * 0.5)
                }
            }
            _ => {
                let dm1s: Array3<f64> = self
                    .make_rdm1s_sub(mo_coeff, casdm1s_sub, false)
                    .sum_axis(Axis(0));
                let veff: Array3<f64> = self.get_veff_spin_sep(dm1s.view());
                if spin_sep {
                    veff
                } else {
                    (veff.sum_axis(Axis(0)) * 0.5).insert_axis(Axis(0))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::tests::*;
    use approx::AbsDiffEq;

    pub const EPSILON: f64 = 1e-10;

    #[test]
    fn split_potential_is_exact_in_blocks_with_active_index() {
        let molecule = get_test_molecule();
        let system = get_two_state_system(&molecule);
        let mo = molecule.mo_coeff.view();
        let ci = system.get_init_guess_ci(mo, None).unwrap();
        let casdm1s_sub = system.make_casdm1s_sub(&ci).unwrap();
        let h2eff = system.get_h2eff(mo);
        let dm1s = system.make_rdm1s(mo, &casdm1s_sub);
        let veff = system.get_veff(dm1s.sum_axis(Axis(0)).view());
        let split = system.split_veff(veff.view(), &h2eff, mo, &casdm1s_sub);
        let exact = system.get_veff_spin_sep(dm1s.view());
        // the state-averaged spin density does not vanish
        let sdm: Array2<f64> = &dm1s.slice(s![0, .., ..]) - &dm1s.slice(s![1, .., ..]);
        assert!(sdm.iter().any(|x| x.abs() > 1e-3));
        for spin in 0..2 {
            let split_spin: ArrayView2<f64> = split.slice(s![spin, .., ..]);
            let split_mo: Array2<f64> = mo.t().dot(&split_spin).dot(&mo);
            let exact_spin: ArrayView2<f64> = exact.slice(s![spin, .., ..]);
            let exact_mo: Array2<f64> = mo.t().dot(&exact_spin).dot(&mo);
            assert!(split_mo
                .slice(s![1..5, ..])
                .abs_diff_eq(&exact_mo.slice(s![1..5, ..]), EPSILON));
            assert!(split_mo
                .slice(s![.., 1..5])
                .abs_diff_eq(&exact_mo.slice(s![.., 1..5]), EPSILON));
        }
        // the spin average is the spin-summed potential
        let average: Array2<f64> = split.sum_axis(Axis(0)) * 0.5;
        assert!(average.abs_diff_eq(&veff, EPSILON));
    }

    #[test]
    fn density_fitted_active_potential() {
        let molecule = get_test_molecule();
        let system = get_two_state_system(&molecule);
        let system_df = get_two_state_system(&molecule).with_df(molecule.df.clone());
        let mo = molecule.mo_coeff.view();
        let ci = system.get_init_guess_ci(mo, None).unwrap();
        let casdm1s_sub = system.make_casdm1s_sub(&ci).unwrap();
        let h2eff = system.get_h2eff(mo);
        let h2eff_df = system_df.get_h2eff(mo);
        assert!(h2eff_df.bmpu.is_some());
        for spin_sep in [true, false] {
            let reference = system.fast_veffa(&casdm1s_sub, &h2eff, mo, spin_sep);
            let fitted = system_df.fast_veffa(&casdm1s_sub, &h2eff_df, mo, spin_sep);
            assert_eq!(reference.dim().0, if spin_sep { 2 } else { 1 });
            assert!(fitted.abs_diff_eq(&reference, EPSILON));
        }
    }
}
