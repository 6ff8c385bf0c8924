use crate::defaults::{MAX_ORBITAL_ROTATION, MIN_ORBITAL_HESSIAN};
use crate::errors::LasError;
use crate::initialization::LasSystem;
use crate::integrals::H2Eff;
use crate::las::gradients::{LasGradient, UnitaryGroupGenerators};
use crate::las::kernel::LasciResult;
use crate::las::logging::*;
use crate::las::rdm::make_casdm1s;
use crate::las::CiVectors;
use crate::utils::Timer;
use log::{debug, warn};
use ndarray::prelude::*;
use ndarray_linalg::{into_col, into_row, Inverse};

/// Outcome of the orbital optimization.
#[derive(Debug, Clone)]
pub struct LasscfResult {
    pub converged: bool,
    pub e_tot: f64,
    pub e_states: Array1<f64>,
    pub n_iter: usize,
    /// norm of the orbital gradient at the final orbitals
    pub norm_gorb: f64,
}

/// Orthogonal matrix (1 - X/2)^-1 (1 + X/2) of an antisymmetric generator X.
pub fn cayley_transform(x: ArrayView2<f64>) -> Result<Array2<f64>, LasError> {
    let one: Array2<f64> = Array2::eye(x.nrows());
    let half: Array2<f64> = &x * 0.5;
    Ok((&one - &half).inv()?.dot(&(&one + &half)))
}

/// BFGS update of the inverse Hessian with the step `sk` and the gradient change `yk`
/// (Nocedal and Wright, Numerical Optimization, eq. 6.17).
pub fn bfgs_update(
    inv_hk: ArrayView2<f64>,
    sk: ArrayView1<f64>,
    yk: ArrayView1<f64>,
) -> Array2<f64> {
    let n: usize = sk.len();
    let id: Array2<f64> = Array2::eye(n);
    let rk: f64 = 1.0 / yk.dot(&sk);
    let u: Array2<f64> = &id - &(rk * into_col(sk).dot(&into_row(yk)));
    let v: Array2<f64> = &id - &(rk * into_col(yk).dot(&into_row(sk)));
    let w: Array2<f64> = rk * into_col(sk).dot(&into_row(sk));
    u.dot(&inv_hk.dot(&v)) + w
}

impl<'a> LasSystem<'a> {
    /// Approximate diagonal of the orbital Hessian, |n_p - n_q| |e_p - e_q| with the occupation
    /// numbers n and the diagonal e of the Fock matrix, bounded from below.
    pub fn orbital_hessian_diagonal(
        &self,
        mo_coeff: ArrayView2<f64>,
        casdm1s_sub: &[Array3<f64>],
        veff: Option<ArrayView3<f64>>,
    ) -> Array2<f64> {
        let (ncore, nocc, nmo) = (self.n_core, self.n_occ(), self.n_mo);
        let fock: Array2<f64> = mo_coeff
            .t()
            .dot(&self.get_fock(mo_coeff, casdm1s_sub, veff))
            .dot(&mo_coeff);
        let energies = fock.diag();
        let mut occ: Array1<f64> = Array1::zeros(nmo);
        occ.slice_mut(s![..ncore]).fill(2.0);
        occ.slice_mut(s![ncore..nocc])
            .assign(&make_casdm1s(casdm1s_sub).sum_axis(Axis(0)).diag());
        let shift: f64 = self.config.solver.ah_level_shift;
        Array2::from_shape_fn((nmo, nmo), |(p, q)| {
            let h: f64 = (occ[p] - occ[q]).abs() * (energies[p] - energies[q]).abs();
            h.max(MIN_ORBITAL_HESSIAN) + shift
        })
    }

    /// Inverse of the diagonal orbital Hessian in the packed non-redundant rotations, the
    /// starting point of the quasi-Newton updates.
    fn initial_inverse_hessian(
        &self,
        mo_coeff: ArrayView2<f64>,
        ugg: &UnitaryGroupGenerators,
        ci: &CiVectors,
    ) -> Result<Array2<f64>, LasError> {
        let casdm1s_sub: Vec<Array3<f64>> = self.make_casdm1s_sub(ci)?;
        let hdiag: Array1<f64> =
            ugg.pack_orb(self.orbital_hessian_diagonal(mo_coeff, &casdm1s_sub, None).view());
        Ok(Array2::from_diag(&hdiag.mapv(|h| self.config.solver.orbital_step / h)))
    }

    /// LASSCF: alternates LASCI at fixed orbitals with orbital steps until the orbital gradient
    /// drops below `conv_tol_grad`. The step is a BFGS quasi-Newton step in the non-redundant
    /// rotations, started from the diagonal orbital Hessian and applied as a Cayley transform;
    /// it is halved until the energy does not rise, at most `max_cycle_micro` times. At the end
    /// the orbitals are canonicalized.
    pub fn kernel(&mut self) -> Result<LasscfResult, LasError> {
        let timer: Timer = Timer::start();
        let solver = self.config.solver;
        print_lasscf_init(solver.max_cycle_macro, solver.conv_tol_grad);

        let mut mo: Array2<f64> = self.mo_coeff.clone();
        let mut current: LasciResult = self.run_lasci(mo.view(), self.ci.as_ref())?;
        let mut grad: LasGradient =
            self.get_grad(mo.view(), &current.ci, &self.get_h2eff(mo.view()))?;
        let mut norm_gorb: f64 = grad.norm_gorb();
        let mut converged: bool = norm_gorb < solver.conv_tol_grad && current.converged;
        let ugg = UnitaryGroupGenerators::new(self, &current.ci);
        let mut inv_hk: Array2<f64> = self.initial_inverse_hessian(mo.view(), &ugg, &current.ci)?;
        let mut fresh_hessian: bool = true;
        let mut n_iter: usize = 0;
        print_macro_iteration(0, current.e_tot, 0.0, norm_gorb, 0.0);

        while !converged && n_iter < solver.max_cycle_macro {
            let mut pk: Array1<f64> = -inv_hk.dot(&grad.gorb);
            let step_norm: f64 = pk.dot(&pk).sqrt();
            if step_norm > MAX_ORBITAL_ROTATION {
                pk *= MAX_ORBITAL_ROTATION / step_norm;
            }
            debug!("predicted energy change: {:.6e}", 2.0 * pk.dot(&grad.gorb));

            let mut accepted: Option<(Array2<f64>, LasciResult, f64)> = None;
            let mut scale: f64 = 1.0;
            for _ in 0..=solver.max_cycle_micro {
                let kappa: Array2<f64> = ugg.unpack_orb((&pk * scale).view());
                let mo_trial: Array2<f64> = mo.dot(&cayley_transform(kappa.view())?);
                let trial: LasciResult = self.run_lasci(mo_trial.view(), Some(&current.ci))?;
                if trial.e_tot <= current.e_tot {
                    accepted = Some((mo_trial, trial, scale));
                    break;
                }
                debug!(
                    "energy rises by {:.6e} with step scale {:.4e}",
                    trial.e_tot - current.e_tot,
                    scale
                );
                scale *= 0.5;
            }
            let (mo_new, result, scale) = match accepted {
                Some(step) => step,
                None if !fresh_hessian => {
                    warn!("No step along the quasi-Newton direction lowers the energy, restarting");
                    inv_hk = self.initial_inverse_hessian(mo.view(), &ugg, &current.ci)?;
                    fresh_hessian = true;
                    continue;
                }
                None => {
                    warn!("No orbital step lowers the energy, the optimization stops");
                    break;
                }
            };
            n_iter += 1;
            let e_last: f64 = current.e_tot;
            mo = mo_new;
            current = result;
            let grad_new: LasGradient =
                self.get_grad(mo.view(), &current.ci, &self.get_h2eff(mo.view()))?;
            norm_gorb = grad_new.norm_gorb();
            converged = norm_gorb < solver.conv_tol_grad && current.converged;
            print_macro_iteration(n_iter, current.e_tot, current.e_tot - e_last, norm_gorb, scale);

            let sk: Array1<f64> = &pk * scale;
            let yk: Array1<f64> = &grad_new.gorb - &grad.gorb;
            if yk.dot(&sk) > 0.0 {
                inv_hk = bfgs_update(inv_hk.view(), sk.view(), yk.view());
                fresh_hessian = false;
            } else {
                debug!("BFGS update skipped, the curvature condition y.s > 0 is violated");
            }
            grad = grad_new;
        }
        print_lasscf_end(&timer, converged, current.e_tot, n_iter);

        self.set_mo_coeff(mo);
        self.ci = Some(current.ci.clone());
        let h2eff: H2Eff = self.h2eff_sub();
        let casdm1frs = self.states_make_casdm1s_sub(&current.ci)?;
        let veff: Array3<f64> = self.get_split_veff(self.mo_coeff.view(), &h2eff, &casdm1frs)?;
        self.properties.set_veff(veff);
        self.canonicalize_()?;
        if let (Some(mo_energy), Some(mo_occ)) = (self.properties.mo_energy(), self.properties.mo_occ()) {
            print_orbital_information(mo_energy, mo_occ);
        }
        self.properties.set_e_tot(current.e_tot);
        self.properties.set_e_states(current.e_states.clone());
        self.properties.set_converged(converged);

        Ok(LasscfResult {
            converged,
            e_tot: current.e_tot,
            e_states: current.e_states,
            n_iter,
            norm_gorb,
        })
    }
}
