use crate::integrals::H2Eff;
use crate::utils::{from_matrix, transform_axis};
use ndarray::prelude::*;
use rayon::prelude::*;

/// Density-fitted two-electron integrals (mn|ls) = sum_P B[P, m, n] B[P, l, s].
#[derive(Debug, Clone)]
pub struct DfAdapter {
    pub cderi: Array3<f64>,
}

impl DfAdapter {
    pub fn new(cderi: Array3<f64>) -> Self {
        // the reshapes below need row-major storage; npy files may be Fortran ordered
        DfAdapter {
            cderi: cderi.as_standard_layout().into_owned(),
        }
    }

    pub fn naux(&self) -> usize {
        self.cderi.dim().0
    }

    pub fn nao(&self) -> usize {
        self.cderi.dim().1
    }

    /// The four-index integrals represented by the factor.
    pub fn full_eri(&self) -> Array4<f64> {
        let (naux, nao, _) = self.cderi.dim();
        let b: ArrayView2<f64> = self
            .cderi
            .view()
            .into_shape((naux, nao * nao))
            .expect("the three-index factor is stored in row-major order");
        from_matrix(b.t().dot(&b).view(), (nao, nao, nao, nao))
    }

    pub fn get_jk(&self, dms: ArrayView3<f64>) -> (Array3<f64>, Array3<f64>) {
        let mut vj: Array3<f64> = Array3::zeros(dms.raw_dim());
        let mut vk: Array3<f64> = Array3::zeros(dms.raw_dim());
        for ((dm, mut j), mut k) in dms
            .outer_iter()
            .zip(vj.outer_iter_mut())
            .zip(vk.outer_iter_mut())
        {
            for b in self.cderi.outer_iter() {
                let rho: f64 = (&b * &dm).sum();
                j.scaled_add(rho, &b);
                k += &b.dot(&dm).dot(&b);
            }
        }
        (vj, vk)
    }

    /// Half-transformed factor bmPu[m, P, u] = sum_n B[P, m, n] C[n, u].
    pub fn half_transform(&self, mo_cas: ArrayView2<f64>) -> Array3<f64> {
        let (naux, nao, _) = self.cderi.dim();
        let ncas: usize = mo_cas.ncols();
        let mut bmpu: Array3<f64> = Array3::zeros((nao, naux, ncas));
        bmpu.axis_iter_mut(Axis(1))
            .into_par_iter()
            .zip(self.cderi.axis_iter(Axis(0)).into_par_iter())
            .for_each(|(mut slab, b)| slab.assign(&b.dot(&mo_cas)));
        bmpu
    }

    /// Two-step transformation: first to (m u|v w) through the three-index factor, then the
    /// first index to the molecular orbitals. The half-transformed factor is kept on the
    /// result for the fast exchange builds.
    pub fn ao2mo(&self, mo: ArrayView2<f64>, mo_cas: ArrayView2<f64>) -> H2Eff {
        let (naux, nao, _) = self.cderi.dim();
        let ncas: usize = mo_cas.ncols();
        let bmpu: Array3<f64> = self.half_transform(mo_cas);
        // buvP[u, v, P] = sum_m C[m, u] bmPu[m, P, v]
        let mut buvp: Array3<f64> = Array3::zeros((ncas, ncas, naux));
        for (aux, mut slab) in buvp.axis_iter_mut(Axis(2)).enumerate() {
            slab.assign(&mo_cas.t().dot(&bmpu.slice(s![.., aux, ..])));
        }
        // (m u|v w) = sum_P bmuP[m, u, P] buvP[v, w, P]
        let bmup: Array2<f64> = Array2::from_shape_vec(
            (nao * ncas, naux),
            bmpu.view().permuted_axes([0, 2, 1]).iter().cloned().collect(),
        )
        .expect("the element count matches the (nao * ncas, naux) shape");
        let buv: ArrayView2<f64> = buvp.view().into_shape((ncas * ncas, naux))
            .expect("a freshly allocated array is contiguous");
        let eri_muvw: Array4<f64> =
            from_matrix(bmup.dot(&buv.t()).view(), (nao, ncas, ncas, ncas));
        let eri: Array4<f64> = transform_axis(eri_muvw.view(), 0, mo);
        H2Eff::from_full(eri.view()).with_df_factor(bmpu)
    }

    /// Coulomb and exchange potentials of the active-space density `casdm1` (one matrix per
    /// spin or a single spin-summed matrix) from the half-transformed factor:
    /// vj from the full factor, vk[m, n] = sum_Puv bmPu[m, P, u] D[u, v] bmPu[n, P, v]
    pub fn jk_active(
        &self,
        bmpu: ArrayView3<f64>,
        mo_cas: ArrayView2<f64>,
        casdm1s: ArrayView3<f64>,
    ) -> (Array3<f64>, Array3<f64>) {
        let (nao, naux, ncas) = bmpu.dim();
        let nspin: usize = casdm1s.dim().0;
        let bmpu_rows: ArrayView2<f64> = bmpu.into_shape((nao * naux, ncas))
            .expect("the half-transformed factor is contiguous");
        let bmpu_cols: ArrayView2<f64> = bmpu.into_shape((nao, naux * ncas))
            .expect("the half-transformed factor is contiguous");
        let mut vj: Array3<f64> = Array3::zeros((nspin, nao, nao));
        let mut vk: Array3<f64> = Array3::zeros((nspin, nao, nao));
        for (spin, casdm1) in casdm1s.outer_iter().enumerate() {
            let dm_ao: Array2<f64> = mo_cas.dot(&casdm1).dot(&mo_cas.t());
            for b in self.cderi.outer_iter() {
                let rho: f64 = (&b * &dm_ao).sum();
                vj.slice_mut(s![spin, .., ..]).scaled_add(rho, &b);
            }
            let vmpu: Array2<f64> = bmpu_rows.dot(&casdm1);
            let vmpu: ArrayView2<f64> = vmpu.view().into_shape((nao, naux * ncas))
                .expect("a matrix product is contiguous");
            vk.slice_mut(s![spin, .., ..])
                .assign(&vmpu.dot(&bmpu_cols.t()));
        }
        (vj, vk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrals::MeanFieldEngine;
    use crate::utils::tests::*;
    use approx::AbsDiffEq;

    pub const EPSILON: f64 = 1e-10;

    #[test]
    fn factor_reproduces_four_index_integrals() {
        let molecule = get_test_molecule();
        assert!(molecule
            .df
            .full_eri()
            .abs_diff_eq(&molecule.engine.eri, EPSILON));
    }

    #[test]
    fn column_major_factor_is_accepted() {
        let molecule = get_test_molecule();
        let mut fortran: Array3<f64> = Array3::zeros(molecule.df.cderi.raw_dim().f());
        fortran.assign(&molecule.df.cderi);
        let df = DfAdapter::new(fortran);
        assert!(df.cderi.is_standard_layout());
        assert!(df.full_eri().abs_diff_eq(&molecule.engine.eri, EPSILON));
        let mo = molecule.mo_coeff.view();
        let h2eff = df.ao2mo(mo, mo.slice(s![.., 1..5]));
        let reference = molecule.engine.ao2mo(mo, mo.slice(s![.., 1..5]));
        assert!(h2eff.packed.abs_diff_eq(&reference.packed, EPSILON));
    }

    #[test]
    fn two_step_transformation_matches_in_core() {
        let molecule = get_test_molecule();
        let mo = molecule.mo_coeff.view();
        let mo_cas = mo.slice(s![.., 1..5]);
        let df = molecule.df.ao2mo(mo, mo_cas);
        let incore = molecule.engine.ao2mo(mo, mo_cas);
        assert!(df.bmpu.is_some());
        assert!(df.packed.abs_diff_eq(&incore.packed, EPSILON));
    }

    #[test]
    fn coulomb_and_exchange_match_in_core() {
        let molecule = get_test_molecule();
        let mo = molecule.mo_coeff.view();
        let occ = mo.slice(s![.., 0..3]);
        let dm: Array2<f64> = occ.dot(&occ.t());
        let dms: Array3<f64> = dm.insert_axis(Axis(0));
        let (vj_df, vk_df) = molecule.df.get_jk(dms.view());
        let (vj, vk) = molecule.engine.get_jk(dms.view());
        assert!(vj_df.abs_diff_eq(&vj, EPSILON));
        assert!(vk_df.abs_diff_eq(&vk, EPSILON));
    }

    #[test]
    fn active_space_exchange_from_half_transformed_factor() {
        let molecule = get_test_molecule();
        let mo = molecule.mo_coeff.view();
        let mo_cas = mo.slice(s![.., 1..5]);
        let bmpu = molecule.df.half_transform(mo_cas);
        let casdm1: Array2<f64> = arr2(&[
            [0.9, 0.1, 0.0, 0.0],
            [0.1, 0.3, 0.0, 0.0],
            [0.0, 0.0, 0.6, -0.2],
            [0.0, 0.0, -0.2, 0.5],
        ]);
        let casdm1s: Array3<f64> = casdm1.clone().insert_axis(Axis(0));
        let (vj, vk) = molecule.df.jk_active(bmpu.view(), mo_cas, casdm1s.view());
        let dm_ao: Array2<f64> = mo_cas.dot(&casdm1).dot(&mo_cas.t());
        let (vj_ref, vk_ref) = molecule
            .engine
            .get_jk(dm_ao.insert_axis(Axis(0)).view());
        assert!(vj.abs_diff_eq(&vj_ref, EPSILON));
        assert!(vk.abs_diff_eq(&vk_ref, EPSILON));
    }
}
