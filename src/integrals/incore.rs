use crate::integrals::{H2Eff, MeanFieldEngine};
use crate::utils::{contract_coulomb, contract_exchange, transform_axis};
use ndarray::prelude::*;

/// Mean-field engine that keeps the full four-index AO integrals in memory.
#[derive(Debug, Clone)]
pub struct InCoreEngine {
    pub hcore: Array2<f64>,
    pub ovlp: Array2<f64>,
    /// (mn|ls) in chemists' notation
    pub eri: Array4<f64>,
    pub energy_nuc: f64,
}

impl InCoreEngine {
    pub fn new(hcore: Array2<f64>, ovlp: Array2<f64>, eri: Array4<f64>, energy_nuc: f64) -> Self {
        InCoreEngine {
            hcore,
            ovlp,
            eri,
            energy_nuc,
        }
    }

    /// Unpacked (p u|v w).
    pub fn ao2mo_full(&self, mo: ArrayView2<f64>, mo_cas: ArrayView2<f64>) -> Array4<f64> {
        let mut eri: Array4<f64> = transform_axis(self.eri.view(), 0, mo);
        for axis in 1..4 {
            eri = transform_axis(eri.view(), axis, mo_cas);
        }
        eri
    }
}

impl MeanFieldEngine for InCoreEngine {
    fn nao(&self) -> usize {
        self.hcore.nrows()
    }

    fn hcore(&self) -> ArrayView2<f64> {
        self.hcore.view()
    }

    fn ovlp(&self) -> ArrayView2<f64> {
        self.ovlp.view()
    }

    fn energy_nuc(&self) -> f64 {
        self.energy_nuc
    }

    fn get_jk(&self, dms: ArrayView3<f64>) -> (Array3<f64>, Array3<f64>) {
        let mut vj: Array3<f64> = Array3::zeros(dms.raw_dim());
        let mut vk: Array3<f64> = Array3::zeros(dms.raw_dim());
        for ((dm, mut j), mut k) in dms
            .outer_iter()
            .zip(vj.outer_iter_mut())
            .zip(vk.outer_iter_mut())
        {
            j.assign(&contract_coulomb(self.eri.view(), dm));
            k.assign(&contract_exchange(self.eri.view(), dm));
        }
        (vj, vk)
    }

    fn ao2mo(&self, mo: ArrayView2<f64>, mo_cas: ArrayView2<f64>) -> H2Eff {
        H2Eff::from_full(self.ao2mo_full(mo, mo_cas).view())
    }
}
