use crate::errors::LasError;
use crate::initialization::LasSystem;
use crate::integrals::H2Eff;
use crate::las::CiVectors;
use crate::utils::contract_all;
use ndarray::prelude::*;

impl<'a> LasSystem<'a> {
    /// CI gradients 2 (H c - c <c|H|c>) of every fragment and state, with the effective
    /// one-electron Hamiltonians `h1eff_sub` of [h1e_for_cas](LasSystem::h1e_for_cas) and
    /// the fragment blocks of the two-electron integrals. Missing CI vectors have no gradient.
    pub fn get_grad_ci(
        &self,
        ci: &CiVectors,
        h1eff_sub: &[Array4<f64>],
        h2eff: &H2Eff,
    ) -> Result<CiVectors, LasError> {
        self.check_ci_structure(ci)?;
        self.fragments
            .iter()
            .zip(ci.iter())
            .zip(h1eff_sub.iter())
            .map(|((frag, vectors), h1eff)| {
                let eri: Array4<f64> = h2eff.fragment_slice(self.n_core, frag.cas_range());
                vectors
                    .iter()
                    .enumerate()
                    .map(|(root, vector)| {
                        let c: &Array2<f64> = match vector {
                            Some(c) => c,
                            None => return Ok(None),
                        };
                        let h1s = h1eff.slice(s![root, .., .., ..]);
                        let hc: Array2<f64> = frag.cibox.contract_h(
                            h1s,
                            eri.view(),
                            c.view(),
                            frag.n_orbs,
                            self.states.nelec(root, frag.index),
                        );
                        let chc: f64 = contract_all(c, &hc);
                        Ok(Some((&hc - &(c * chc)) * 2.0))
                    })
                    .collect::<Result<Vec<Option<Array2<f64>>>, LasError>>()
            })
            .collect()
    }
}
