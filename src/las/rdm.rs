//! Aggregation of the fragment density matrices. Fragments are uncorrelated: the active
//! 1-RDM is block diagonal and the inter-fragment blocks of the active 2-RDM are products
//! of fragment 1-RDMs (Coulomb and exchange parts).
use crate::errors::LasError;
use crate::initialization::LasSystem;
use crate::las::{CiVectors, StateDm1s, StateDm2};
use crate::utils::{block_diag, block_ranges, outer_2d, outer_2d_exchange};
use ndarray::prelude::*;
use std::ops::Range;

fn check_nroots(casdm1frs: &[Array4<f64>], weights: &[f64]) -> Result<(), LasError> {
    for (frag, dm) in casdm1frs.iter().enumerate() {
        if dm.dim().0 != weights.len() {
            return Err(LasError::Configuration(format!(
                "fragment {} has density matrices of {} states, but {} weights are given",
                frag,
                dm.dim().0,
                weights.len()
            )));
        }
    }
    Ok(())
}

/// State-averaged spin-separated 1-RDM of every fragment.
pub fn make_casdm1s_sub(
    casdm1frs: &[Array4<f64>],
    weights: &[f64],
) -> Result<Vec<Array3<f64>>, LasError> {
    check_nroots(casdm1frs, weights)?;
    Ok(casdm1frs
        .iter()
        .map(|dm| {
            let (_, nspin, n, _) = dm.dim();
            let mut avg: Array3<f64> = Array3::zeros((nspin, n, n));
            for (w, dm_r) in weights.iter().zip(dm.outer_iter()) {
                avg.scaled_add(*w, &dm_r);
            }
            avg
        })
        .collect())
}

/// Block-diagonal (2, ncas, ncas) active 1-RDM.
pub fn make_casdm1s(casdm1s_sub: &[Array3<f64>]) -> Array3<f64> {
    let alpha: Vec<ArrayView2<f64>> = casdm1s_sub.iter().map(|dm| dm.slice(s![0, .., ..])).collect();
    let beta: Vec<ArrayView2<f64>> = casdm1s_sub.iter().map(|dm| dm.slice(s![1, .., ..])).collect();
    let (dm_a, dm_b) = (block_diag(&alpha), block_diag(&beta));
    ndarray::stack![Axis(0), dm_a, dm_b]
}

/// Block-diagonal active 1-RDM of every state, (nroots, 2, ncas, ncas).
pub fn states_make_casdm1s(casdm1frs: &[Array4<f64>]) -> Array4<f64> {
    let nroots: usize = casdm1frs.first().map_or(0, |dm| dm.dim().0);
    let ncas: usize = casdm1frs.iter().map(|dm| dm.dim().2).sum();
    let mut out: Array4<f64> = Array4::zeros((nroots, 2, ncas, ncas));
    for (root, mut dm_r) in out.outer_iter_mut().enumerate() {
        let per_fragment: Vec<Array3<f64>> = casdm1frs
            .iter()
            .map(|dm| dm.slice(s![root, .., .., ..]).to_owned())
            .collect();
        dm_r.assign(&make_casdm1s(&per_fragment));
    }
    out
}

/// Active 2-RDM of one product state. The diagonal blocks are the fragment 2-RDMs,
/// the Coulomb blocks (ii|jj) the products of the spin-summed fragment 1-RDMs and the
/// exchange blocks (ij|ji) the negative products of the same-spin 1-RDMs.
pub fn assemble_casdm2(
    ranges: &[Range<usize>],
    dm1s: &[Array3<f64>],
    dm2: &[Array4<f64>],
) -> Array4<f64> {
    let ncas: usize = ranges.last().map_or(0, |r| r.end);
    let mut casdm2: Array4<f64> = Array4::zeros((ncas, ncas, ncas, ncas));
    for (ri, dm2_i) in ranges.iter().zip(dm2.iter()) {
        casdm2
            .slice_mut(s![ri.clone(), ri.clone(), ri.clone(), ri.clone()])
            .assign(dm2_i);
    }
    for (i, ri) in ranges.iter().enumerate() {
        let dm_i: Array2<f64> = dm1s[i].sum_axis(Axis(0));
        for (j, rj) in ranges.iter().enumerate() {
            if i == j {
                continue;
            }
            let dm_j: Array2<f64> = dm1s[j].sum_axis(Axis(0));
            casdm2
                .slice_mut(s![ri.clone(), ri.clone(), rj.clone(), rj.clone()])
                .assign(&outer_2d(dm_i.view(), dm_j.view()));
            let mut exchange = casdm2.slice_mut(s![ri.clone(), rj.clone(), rj.clone(), ri.clone()]);
            for spin in 0..2 {
                exchange -= &outer_2d_exchange(
                    dm1s[i].slice(s![spin, .., ..]),
                    dm1s[j].slice(s![spin, .., ..]),
                );
            }
        }
    }
    casdm2
}

/// Active 2-RDM of every state.
pub fn states_make_casdm2(
    casdm1frs: &[Array4<f64>],
    casdm2fr: &StateDm2,
) -> Result<Vec<Array4<f64>>, LasError> {
    if casdm1frs.len() != casdm2fr.len() {
        return Err(LasError::Configuration(format!(
            "1-RDMs of {} and 2-RDMs of {} fragments",
            casdm1frs.len(),
            casdm2fr.len()
        )));
    }
    let nroots: usize = casdm1frs.first().map_or(0, |dm| dm.dim().0);
    let ranges: Vec<Range<usize>> =
        block_ranges(&casdm1frs.iter().map(|dm| dm.dim().2).collect::<Vec<usize>>());
    (0..nroots)
        .map(|root| {
            let dm1s: Vec<Array3<f64>> = casdm1frs
                .iter()
                .map(|dm| dm.slice(s![root, .., .., ..]).to_owned())
                .collect();
            let dm2: Vec<Array4<f64>> = casdm2fr
                .iter()
                .map(|dm| {
                    dm.get(root).cloned().ok_or_else(|| {
                        LasError::Configuration(format!("no 2-RDM of state {}", root))
                    })
                })
                .collect::<Result<Vec<Array4<f64>>, LasError>>()?;
            Ok(assemble_casdm2(&ranges, &dm1s, &dm2))
        })
        .collect()
}

/// State-averaged active 2-RDM: the weighted sum of the per-state 2-RDMs.
pub fn make_casdm2(
    casdm1frs: &[Array4<f64>],
    casdm2fr: &StateDm2,
    weights: &[f64],
) -> Result<Array4<f64>, LasError> {
    check_nroots(casdm1frs, weights)?;
    let per_state: Vec<Array4<f64>> = states_make_casdm2(casdm1frs, casdm2fr)?;
    let ncas: usize = casdm1frs.iter().map(|dm| dm.dim().2).sum();
    let mut casdm2: Array4<f64> = Array4::zeros((ncas, ncas, ncas, ncas));
    for (w, dm2) in weights.iter().zip(per_state.iter()) {
        casdm2.scaled_add(*w, dm2);
    }
    Ok(casdm2)
}

/// Cumulant of a 2-RDM: dm2 - dm1 (x) dm1 + sum_s (dm1s (x) dm1s) with exchanged indices.
pub fn cumulant(dm2: ArrayView4<f64>, dm1s: ArrayView3<f64>) -> Array4<f64> {
    let dm1: Array2<f64> = dm1s.sum_axis(Axis(0));
    let mut cum: Array4<f64> = &dm2 - &outer_2d(dm1.view(), dm1.view());
    for dm in dm1s.outer_iter() {
        cum += &outer_2d_exchange(dm, dm);
    }
    cum
}

impl<'a> LasSystem<'a> {
    /// Checks that the CI vectors fit the fragments and the state manifold.
    pub fn check_ci_structure(&self, ci: &CiVectors) -> Result<(), LasError> {
        if ci.len() != self.nfrags() {
            return Err(LasError::StructuralInconsistency(format!(
                "CI vectors of {} fragments for {} fragments",
                ci.len(),
                self.nfrags()
            )));
        }
        for (frag, vectors) in self.fragments.iter().zip(ci.iter()) {
            if vectors.len() != self.nroots() {
                return Err(LasError::StructuralInconsistency(format!(
                    "fragment {} has CI vectors of {} states instead of {}",
                    frag.index,
                    vectors.len(),
                    self.nroots()
                )));
            }
            for (root, vector) in vectors.iter().enumerate() {
                if let Some(c) = vector {
                    let expected = self.states.ci_shape(root, frag);
                    if c.dim() != expected {
                        return Err(LasError::StructuralInconsistency(format!(
                            "CI vector of fragment {} in state {} has shape {:?} instead of {:?}",
                            frag.index,
                            root,
                            c.dim(),
                            expected
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Spin-separated 1-RDMs of all fragments and states. Missing CI vectors give zeros.
    pub fn states_make_casdm1s_sub(&self, ci: &CiVectors) -> Result<StateDm1s, LasError> {
        self.check_ci_structure(ci)?;
        Ok(self
            .fragments
            .iter()
            .zip(ci.iter())
            .map(|(frag, vectors)| {
                let n: usize = frag.n_orbs;
                let mut dm: Array4<f64> = Array4::zeros((self.nroots(), 2, n, n));
                for (root, vector) in vectors.iter().enumerate() {
                    if let Some(c) = vector {
                        dm.slice_mut(s![root, .., .., ..]).assign(&frag.cibox.make_rdm1s(
                            c.view(),
                            n,
                            self.states.nelec(root, frag.index),
                        ));
                    }
                }
                dm
            })
            .collect())
    }

    /// Spin-summed 2-RDMs of all fragments and states. Missing CI vectors give zeros.
    pub fn states_make_casdm2_sub(&self, ci: &CiVectors) -> Result<StateDm2, LasError> {
        self.check_ci_structure(ci)?;
        Ok(self
            .fragments
            .iter()
            .zip(ci.iter())
            .map(|(frag, vectors)| {
                let n: usize = frag.n_orbs;
                vectors
                    .iter()
                    .enumerate()
                    .map(|(root, vector)| match vector {
                        Some(c) => {
                            frag.cibox
                                .make_rdm12(c.view(), n, self.states.nelec(root, frag.index))
                                .1
                        }
                        None => Array4::zeros((n, n, n, n)),
                    })
                    .collect()
            })
            .collect())
    }

    pub fn make_casdm1s_sub(&self, ci: &CiVectors) -> Result<Vec<Array3<f64>>, LasError> {
        make_casdm1s_sub(&self.states_make_casdm1s_sub(ci)?, self.weights())
    }

    pub fn make_casdm1s(&self, ci: &CiVectors) -> Result<Array3<f64>, LasError> {
        Ok(make_casdm1s(&self.make_casdm1s_sub(ci)?))
    }

    pub fn states_make_casdm2(&self, ci: &CiVectors) -> Result<Vec<Array4<f64>>, LasError> {
        states_make_casdm2(
            &self.states_make_casdm1s_sub(ci)?,
            &self.states_make_casdm2_sub(ci)?,
        )
    }

    pub fn make_casdm2(&self, ci: &CiVectors) -> Result<Array4<f64>, LasError> {
        make_casdm2(
            &self.states_make_casdm1s_sub(ci)?,
            &self.states_make_casdm2_sub(ci)?,
            self.weights(),
        )
    }

    /// Spin-separated AO density matrices of the core (if requested) and of every fragment,
    /// (nfrags [+ 1], 2, nao, nao).
    pub fn make_rdm1s_sub(
        &self,
        mo_coeff: ArrayView2<f64>,
        casdm1s_sub: &[Array3<f64>],
        include_core: bool,
    ) -> Array4<f64> {
        let offset: usize = if include_core { 1 } else { 0 };
        let mut dm1s: Array4<f64> =
            Array4::zeros((self.nfrags() + offset, 2, self.n_ao, self.n_ao));
        if include_core {
            let mo_core = mo_coeff.slice(s![.., ..self.n_core]);
            let dm_core: Array2<f64> = mo_core.dot(&mo_core.t());
            for spin in 0..2 {
                dm1s.slice_mut(s![0, spin, .., ..]).assign(&dm_core);
            }
        }
        for (frag, dm) in self.fragments.iter().zip(casdm1s_sub.iter()) {
            let mo = mo_coeff.slice(s![.., frag.mo_range(self.n_core)]);
            for spin in 0..2 {
                let dm_spin: ArrayView2<f64> = dm.slice(s![spin, .., ..]);
                let mo_dm: Array2<f64> = mo.dot(&dm_spin);
                dm1s.slice_mut(s![frag.index + offset, spin, .., ..])
                    .assign(&mo_dm.dot(&mo.t()));
            }
        }
        dm1s
    }

    /// Spin-separated AO density matrix of the core and active electrons.
    pub fn make_rdm1s(&self, mo_coeff: ArrayView2<f64>, casdm1s_sub: &[Array3<f64>]) -> Array3<f64> {
        self.make_rdm1s_sub(mo_coeff, casdm1s_sub, true)
            .sum_axis(Axis(0))
    }

    /// Spin-summed AO density matrix.
    pub fn make_rdm1(&self, mo_coeff: ArrayView2<f64>, casdm1s_sub: &[Array3<f64>]) -> Array2<f64> {
        self.make_rdm1s(mo_coeff, casdm1s_sub).sum_axis(Axis(0))
    }

    /// Spin-separated AO density matrices of every state, (nroots, 2, nao, nao).
    pub fn states_make_rdm1s(&self, mo_coeff: ArrayView2<f64>, casdm1frs: &StateDm1s) -> Array4<f64> {
        let mut dm1rs: Array4<f64> = Array4::zeros((self.nroots(), 2, self.n_ao, self.n_ao));
        for (root, mut dm) in dm1rs.outer_iter_mut().enumerate() {
            let casdm1s_sub: Vec<Array3<f64>> = casdm1frs
                .iter()
                .map(|d| d.slice(s![root, .., .., ..]).to_owned())
                .collect();
            dm.assign(&self.make_rdm1s(mo_coeff, &casdm1s_sub));
        }
        dm1rs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::tests::*;
    use approx::AbsDiffEq;

    pub const EPSILON: f64 = 1e-10;

    /// Single determinants of both fragments in the two-state system.
    fn determinant_ci(system: &LasSystem) -> CiVectors {
        (0..system.nfrags())
            .map(|frag| {
                (0..system.nroots())
                    .map(|root| {
                        let shape = system.states.ci_shape(root, &system.fragments[frag]);
                        let mut c: Array2<f64> = Array2::zeros(shape);
                        c[[0, 0]] = 1.0;
                        Some(c)
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn active_one_particle_density_is_block_diagonal() {
        let molecule = get_test_molecule();
        let system = get_two_state_system(&molecule);
        let ci = system.get_init_guess_ci(molecule.mo_coeff.view(), None).unwrap();
        let casdm1frs = system.states_make_casdm1s_sub(&ci).unwrap();
        let casdm1s = system.make_casdm1s(&ci).unwrap();
        for (frag, dm) in system.fragments.iter().zip(casdm1frs.iter()) {
            let r = frag.cas_range();
            let avg: Array3<f64> = &dm.slice(s![0, .., .., ..]) * 0.5 + &dm.slice(s![1, .., .., ..]) * 0.5;
            assert!(casdm1s
                .slice(s![.., r.clone(), r.clone()])
                .abs_diff_eq(&avg, EPSILON));
        }
        assert_eq!(casdm1s[[0, 0, 3]], 0.0);
        assert!(casdm1s.sum_axis(Axis(0)).diag().sum().abs_diff_eq(&4.0, EPSILON));
    }

    #[test]
    fn product_of_determinants_has_vanishing_cumulant() {
        let molecule = get_test_molecule();
        let system = get_two_state_system(&molecule);
        let ci = determinant_ci(&system);
        let casdm1frs = system.states_make_casdm1s_sub(&ci).unwrap();
        let casdm2r = system.states_make_casdm2(&ci).unwrap();
        let casdm1rs = states_make_casdm1s(&casdm1frs);
        for root in 0..system.nroots() {
            let cum = cumulant(casdm2r[root].view(), casdm1rs.slice(s![root, .., .., ..]));
            assert!(
                cum.abs_diff_eq(&Array4::<f64>::zeros(cum.raw_dim()), EPSILON),
                "cumulant of a single determinant does not vanish in state {}",
                root
            );
        }
    }

    #[test]
    fn partial_trace_of_two_particle_density() {
        let molecule = get_test_molecule();
        let system = get_two_state_system(&molecule);
        let ci = system.get_init_guess_ci(molecule.mo_coeff.view(), None).unwrap();
        let casdm2 = system.make_casdm2(&ci).unwrap();
        let casdm1: Array2<f64> = system.make_casdm1s(&ci).unwrap().sum_axis(Axis(0));
        let partial: Array2<f64> =
            Array2::from_shape_fn((4, 4), |(p, q)| (0..4).map(|r| casdm2[[p, q, r, r]]).sum());
        assert!(partial.abs_diff_eq(&(&casdm1 * 3.0), EPSILON));
    }

    #[test]
    fn weights_have_to_match_the_states() {
        let casdm1frs: Vec<Array4<f64>> = vec![Array4::zeros((2, 2, 2, 2))];
        assert!(matches!(
            make_casdm1s_sub(&casdm1frs, &[1.0]),
            Err(LasError::Configuration(_))
        ));
    }

    #[test]
    fn misshaped_ci_vectors_are_rejected() {
        let molecule = get_test_molecule();
        let system = get_two_state_system(&molecule);
        let mut ci = determinant_ci(&system);
        ci[0][1] = Some(Array2::zeros((2, 2)));
        assert!(matches!(
            system.states_make_casdm1s_sub(&ci),
            Err(LasError::StructuralInconsistency(_))
        ));
    }

    #[test]
    fn missing_ci_vectors_give_zero_densities() {
        let molecule = get_test_molecule();
        let system = get_two_state_system(&molecule);
        let mut ci = determinant_ci(&system);
        ci[1][0] = None;
        let casdm1frs = system.states_make_casdm1s_sub(&ci).unwrap();
        assert!(casdm1frs[1]
            .slice(s![0, .., .., ..])
            .iter()
            .all(|x| *x == 0.0));
    }
}
