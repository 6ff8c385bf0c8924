use crate::errors::LasError;
use crate::fci::{FragmentCiBox, ProductState, ProductStateSolver};
use crate::initialization::LasSystem;
use crate::integrals::H2Eff;
use crate::las::logging::{print_lasci_end, print_lasci_state};
use crate::las::CiVectors;
use crate::utils::Timer;
use log::debug;
use ndarray::prelude::*;
use rayon::prelude::*;

/// Outcome of the product-state solves of all states at fixed orbitals.
#[derive(Debug, Clone)]
pub struct LasciResult {
    /// true if every state converged
    pub converged: bool,
    /// state-averaged total energy
    pub e_tot: f64,
    /// total energy of every state
    pub e_states: Array1<f64>,
    /// active-space energy of every state, without core and nuclear repulsion
    pub e_cas: Array1<f64>,
    pub ci: CiVectors,
    pub state_converged: Vec<bool>,
}

impl<'a> LasSystem<'a> {
    /// Starting CI vectors. Every fragment problem is solved with the one-electron operator
    /// of the core (h + veff of the core density) and the fragment block of the two-electron
    /// integrals; the fields of the other fragments are ignored. Vectors of `ci0` with the
    /// right shape are kept.
    pub fn get_init_guess_ci(
        &self,
        mo_coeff: ArrayView2<f64>,
        ci0: Option<&CiVectors>,
    ) -> Result<CiVectors, LasError> {
        let h2eff: H2Eff = self.get_h2eff(mo_coeff);
        let (h1_core, _) = self.get_h1e_core(mo_coeff);
        let mut ci: CiVectors = Vec::with_capacity(self.nfrags());
        for frag in self.fragments.iter() {
            let r = frag.cas_range();
            let h1 = h1_core.slice(s![r.clone(), r.clone()]);
            let h1s: Array3<f64> = ndarray::stack![Axis(0), h1, h1];
            let eri: Array4<f64> = h2eff.fragment_slice(self.n_core, r);
            let mut vectors: Vec<Option<Array2<f64>>> = Vec::with_capacity(self.nroots());
            for root in 0..self.nroots() {
                let guess: Option<&Array2<f64>> = ci0
                    .and_then(|ci0| ci0.get(frag.index))
                    .and_then(|c| c.get(root))
                    .and_then(|c| c.as_ref());
                match guess {
                    Some(c) if c.dim() == self.states.ci_shape(root, frag) => {
                        vectors.push(Some(c.clone()))
                    }
                    _ => vectors.push(Some(frag.cibox.init_guess(
                        h1s.view(),
                        eri.view(),
                        frag.n_orbs,
                        &self.states.target(root, frag.index),
                    )?)),
                }
            }
            ci.push(vectors);
        }
        Ok(ci)
    }

    /// Solves the product-state problems of all states at the orbitals `mo_coeff`. The
    /// effective Hamiltonian of the active space is the same for all states, so the states are
    /// solved in parallel. A state that does not converge is reported but does not stop the
    /// others.
    pub fn run_lasci(
        &self,
        mo_coeff: ArrayView2<f64>,
        ci0: Option<&CiVectors>,
    ) -> Result<LasciResult, LasError> {
        let (h1eff, energy_core) = self.get_h1e_core(mo_coeff);
        let eri_cas: Array4<f64> = self.get_h2eff(mo_coeff).active_block(self.n_core);
        let ci0: CiVectors = self.get_init_guess_ci(mo_coeff, ci0)?;
        let solver = self.config.solver;

        let states: Vec<ProductState> = (0..self.nroots())
            .into_par_iter()
            .map(|root| {
                let boxes: Vec<&dyn FragmentCiBox> = self
                    .fragments
                    .iter()
                    .map(|frag| frag.cibox.as_ref())
                    .collect();
                let targets = (0..self.nfrags())
                    .map(|frag| self.states.target(root, frag))
                    .collect();
                let guess: Vec<Option<Array2<f64>>> =
                    ci0.iter().map(|vectors| vectors[root].clone()).collect();
                ProductStateSolver::new(boxes, self.ncas_sub(), targets)
                    .with_convergence(
                        solver.conv_tol_grad,
                        solver.conv_tol_self,
                        solver.max_cycle_macro,
                    )
                    .kernel(h1eff.view(), eri_cas.view(), guess)
            })
            .collect::<Result<Vec<ProductState>, LasError>>()?;

        let mut ci: CiVectors = vec![vec![None; self.nroots()]; self.nfrags()];
        let mut e_cas: Array1<f64> = Array1::zeros(self.nroots());
        let mut state_converged: Vec<bool> = Vec::with_capacity(self.nroots());
        for (root, state) in states.into_iter().enumerate() {
            print_lasci_state(root, state.converged, state.n_iter, state.energy);
            e_cas[root] = state.energy;
            state_converged.push(state.converged);
            for (frag, c) in state.ci.into_iter().enumerate() {
                ci[frag][root] = Some(c);
            }
        }
        let e_states: Array1<f64> = &e_cas + energy_core;
        let e_tot: f64 = self.weights_array().dot(&e_states);
        debug!("core energy: {:>18.12}", energy_core);
        Ok(LasciResult {
            converged: state_converged.iter().all(|c| *c),
            e_tot,
            e_states,
            e_cas,
            ci,
            state_converged,
        })
    }

    /// LASCI at the current orbitals. The CI vectors, the energies and the split effective
    /// potential are stored on the system.
    pub fn lasci(&mut self) -> Result<LasciResult, LasError> {
        let timer: Timer = Timer::start();
        let result: LasciResult = self.run_lasci(self.mo_coeff.view(), self.ci.as_ref())?;
        let h2eff: H2Eff = self.h2eff_sub();
        let casdm1frs = self.states_make_casdm1s_sub(&result.ci)?;
        let veff: Array3<f64> = self.get_split_veff(self.mo_coeff.view(), &h2eff, &casdm1frs)?;
        self.properties.set_veff(veff);
        self.properties.set_e_tot(result.e_tot);
        self.properties.set_e_states(result.e_states.clone());
        self.properties.set_converged(result.converged);
        self.ci = Some(result.ci.clone());
        print_lasci_end(&timer, &result, self.weights());
        Ok(result)
    }
}
