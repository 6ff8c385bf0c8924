use crate::initialization::LasSystem;
use ndarray::prelude::*;

/// Roothaan's effective Fock matrix of a restricted open-shell density. The closed-shell,
/// open-shell and virtual projections of the alpha and beta Fock matrices are combined into
/// a single symmetric matrix.
pub fn get_roothaan_fock(
    focka_fockb: ArrayView3<f64>,
    dma_dmb: ArrayView3<f64>,
    s: ArrayView2<f64>,
) -> Array2<f64> {
    let (fa, fb): (ArrayView2<f64>, ArrayView2<f64>) = (focka_fockb.slice(s![0, .., ..]), focka_fockb.slice(s![1, .., ..]));
    let (dma, dmb): (ArrayView2<f64>, ArrayView2<f64>) = (dma_dmb.slice(s![0, .., ..]), dma_dmb.slice(s![1, .., ..]));
    let nao: usize = s.nrows();
    let fc: Array2<f64> = (&fa + &fb) * 0.5;
    // projectors for the core, open and virtual spaces
    let pc: Array2<f64> = dmb.dot(&s);
    let po: Array2<f64> = (&dma - &dmb).dot(&s);
    let pv: Array2<f64> = Array2::<f64>::eye(nao) - dma.dot(&s);
    let mut fock: Array2<f64> = pc.t().dot(&fc).dot(&pc) * 0.5;
    fock += &(po.t().dot(&fc).dot(&po) * 0.5);
    fock += &(pv.t().dot(&fc).dot(&pv) * 0.5);
    fock += &po.t().dot(&fb).dot(&pc);
    fock += &po.t().dot(&fa).dot(&pv);
    fock += &pv.t().dot(&fc).dot(&pc);
    &fock + &fock.t()
}

impl<'a> LasSystem<'a> {
    /// AO Fock matrix of the state-averaged density. With a spin-separated potential the
    /// Roothaan effective Fock matrix is used, otherwise h + J - K/2 of the total density.
    pub fn get_fock(
        &self,
        mo_coeff: ArrayView2<f64>,
        casdm1s_sub: &[Array3<f64>],
        veff: Option<ArrayView3<f64>>,
    ) -> Array2<f64> {
        let dm1s: Array3<f64> = self.make_rdm1s(mo_coeff, casdm1s_sub);
        let hcore = self.engine.hcore();
        match veff {
            Some(veff) => {
                let mut fock_ab: Array3<f64> = veff.to_owned();
                for mut f in fock_ab.outer_iter_mut() {
                    f += &hcore;
                }
                get_roothaan_fock(fock_ab.view(), dm1s.view(), self.engine.ovlp())
            }
            None => &hcore + &self.get_veff(dm1s.sum_axis(Axis(0)).view()),
        }
    }

    /// Effective one-electron operator of the active space in the field of the doubly occupied
    /// core and the core energy including the nuclear repulsion.
    pub fn get_h1e_core(&self, mo_coeff: ArrayView2<f64>) -> (Array2<f64>, f64) {
        let mo_core = mo_coeff.slice(s![.., ..self.n_core]);
        let mo_cas = mo_coeff.slice(s![.., self.n_core..self.n_occ()]);
        let hcore = self.engine.hcore();
        let dm_core: Array2<f64> = mo_core.dot(&mo_core.t()) * 2.0;
        let corevhf: Array2<f64> = self.get_veff(dm_core.view());
        let energy_core: f64 = self.engine.energy_nuc()
            + (&dm_core * &(&hcore + &(&corevhf * 0.5))).sum();
        let h1eff: Array2<f64> = mo_cas.t().dot(&(&hcore + &corevhf)).dot(&mo_cas);
        (h1eff, energy_core)
    }
}
