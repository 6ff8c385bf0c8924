use crate::utils::{npair, pack_tril, transform_axis, unpack_tril};
use ndarray::prelude::*;
use std::ops::Range;

/// (p u|v w) integrals with p over all molecular orbitals and u, v, w over the active
/// orbitals. The (v w) pair is stored as a packed lower triangle, so the array has the
/// shape (nmo * ncas, ncas (ncas + 1) / 2).
#[derive(Debug, Clone)]
pub struct H2Eff {
    pub nmo: usize,
    pub ncas: usize,
    pub packed: Array2<f64>,
    /// Half-transformed three-index factor bmPu[m, P, u] of a density-fitted transformation.
    pub bmpu: Option<Array3<f64>>,
}

impl H2Eff {
    /// Packs the full (nmo, ncas, ncas, ncas) array. The last two indices have to be symmetric.
    pub fn from_full(eri: ArrayView4<f64>) -> Self {
        let (nmo, ncas, _, _) = eri.dim();
        let mut packed: Array2<f64> = Array2::zeros((nmo * ncas, npair(ncas)));
        for p in 0..nmo {
            for u in 0..ncas {
                packed
                    .row_mut(p * ncas + u)
                    .assign(&pack_tril(eri.slice(s![p, u, .., ..])));
            }
        }
        H2Eff {
            nmo,
            ncas,
            packed,
            bmpu: None,
        }
    }

    pub fn with_df_factor(mut self, bmpu: Array3<f64>) -> Self {
        self.bmpu = Some(bmpu);
        self
    }

    /// Returns the full (nmo, ncas, ncas, ncas) array.
    pub fn unpack(&self) -> Array4<f64> {
        self.unpack_rows(0..self.nmo)
    }

    fn unpack_rows(&self, rows: Range<usize>) -> Array4<f64> {
        let n: usize = self.ncas;
        let mut eri: Array4<f64> = Array4::zeros((rows.len(), n, n, n));
        for (i, p) in rows.enumerate() {
            for u in 0..n {
                eri.slice_mut(s![i, u, .., ..])
                    .assign(&unpack_tril(self.packed.row(p * n + u), n));
            }
        }
        eri
    }

    /// Active-active-active-active block (u v|w x). The rows of the active orbitals
    /// start at `ncore`.
    pub fn active_block(&self, ncore: usize) -> Array4<f64> {
        self.unpack_rows(ncore..ncore + self.ncas)
    }

    /// Four-fold restriction of the active block to one fragment, `range` given relative
    /// to the start of the active space.
    pub fn fragment_slice(&self, ncore: usize, range: Range<usize>) -> Array4<f64> {
        let eri: Array4<f64> =
            self.unpack_rows(ncore + range.start..ncore + range.end);
        eri.slice(s![.., range.clone(), range.clone(), range])
            .to_owned()
    }

    /// Rotates the integrals to new orbitals: `umat` acts on the first index and `ucas` on
    /// the three active indices. The density fitting factor refers to the old orbitals and is
    /// dropped.
    pub fn transform(&self, umat: ArrayView2<f64>, ucas: ArrayView2<f64>) -> Self {
        let mut eri: Array4<f64> = transform_axis(self.unpack().view(), 0, umat);
        for axis in 1..4 {
            eri = transform_axis(eri.view(), axis, ucas);
        }
        H2Eff::from_full(eri.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::tests::*;
    use approx::AbsDiffEq;
    use crate::integrals::MeanFieldEngine;

    pub const EPSILON: f64 = 1e-12;

    #[test]
    fn packed_storage_round_trip() {
        let molecule = get_test_molecule();
        let mo = molecule.mo_coeff.view();
        let full: Array4<f64> = molecule.engine.ao2mo_full(mo, mo.slice(s![.., 1..5]));
        let h2eff = H2Eff::from_full(full.view());
        assert_eq!(h2eff.packed.dim(), (8 * 4, 10));
        assert!(h2eff.unpack().abs_diff_eq(&full, EPSILON));
        let frag: Array4<f64> = h2eff.fragment_slice(1, 2..4);
        assert!(frag.abs_diff_eq(&full.slice(s![3..5, 2..4, 2..4, 2..4]), EPSILON));
    }

    #[test]
    fn orbital_rotation_and_its_inverse() {
        let molecule = get_test_molecule();
        let mo = molecule.mo_coeff.view();
        let h2eff: H2Eff = molecule.engine.ao2mo(mo, mo.slice(s![.., 1..5]));
        let umat: Array2<f64> = random_orthogonal(8, 3);
        let ucas: Array2<f64> = random_orthogonal(4, 5);
        let back = h2eff
            .transform(umat.view(), ucas.view())
            .transform(umat.t(), ucas.t());
        assert!(back.packed.abs_diff_eq(&h2eff.packed, EPSILON));
    }

    #[test]
    fn rotation_agrees_with_transformation_of_new_orbitals() {
        let molecule = get_test_molecule();
        let mo = molecule.mo_coeff.view();
        let h2eff: H2Eff = molecule.engine.ao2mo(mo, mo.slice(s![.., 1..5]));
        let mut umat: Array2<f64> = Array2::eye(8);
        let ucas: Array2<f64> = random_orthogonal(4, 11);
        umat.slice_mut(s![1..5, 1..5]).assign(&ucas);
        let new_mo: Array2<f64> = mo.dot(&umat);
        let reference: H2Eff = molecule
            .engine
            .ao2mo(new_mo.view(), new_mo.slice(s![.., 1..5]));
        let rotated = h2eff.transform(umat.view(), ucas.view());
        assert!(rotated.packed.abs_diff_eq(&reference.packed, EPSILON));
    }
}
