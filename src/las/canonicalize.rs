use crate::errors::LasError;
use crate::initialization::{eig_by_symmetry, LasSystem};
use crate::integrals::H2Eff;
use crate::las::rdm::make_casdm1s;
use crate::las::CiVectors;
use crate::utils::argsort_descending;
use log::{debug, warn};
use ndarray::prelude::*;
use ndarray_stats::QuantileExt;
use std::ops::Range;

/// Orbitals, CI vectors and integrals after canonicalization.
#[derive(Debug, Clone)]
pub struct Canonicalized {
    pub mo_coeff: Array2<f64>,
    /// eigenvalues of the Fock matrix in the core and external blocks, zero for active orbitals
    pub mo_energy: Array1<f64>,
    pub mo_occ: Array1<f64>,
    /// None if the active orbitals could not be canonicalized fragment by fragment
    pub ci: Option<CiVectors>,
    pub h2eff: Option<H2Eff>,
    pub orbsym: Option<Vec<usize>>,
}

/// Eigenvectors of the diagonal block `range` of `a` written into `umat`, in ascending
/// (or descending) order of the eigenvalues. The symmetry labels of the block are permuted
/// accordingly.
fn diagonalize_block(
    a: ArrayView2<f64>,
    range: Range<usize>,
    offset: usize,
    umat: &mut Array2<f64>,
    orbsym: &mut Option<Vec<usize>>,
    descending: bool,
) -> Result<Array1<f64>, LasError> {
    if range.is_empty() {
        return Ok(Array1::zeros(0));
    }
    let (la, lb) = (range.start - offset, range.end - offset);
    let block = a.slice(s![la..lb, la..lb]);
    let labels: Option<Vec<usize>> = orbsym.as_ref().map(|sym| sym[range.clone()].to_vec());
    let (e, c, irreps) = eig_by_symmetry(block, labels.as_deref())?;
    let order: Vec<usize> = if descending {
        argsort_descending(e.view())
    } else {
        (0..e.len()).collect()
    };
    umat.slice_mut(s![range.clone(), range.clone()])
        .assign(&c.select(Axis(1), &order));
    if let (Some(sym), Some(irreps)) = (orbsym.as_mut(), irreps) {
        for (k, idx) in order.iter().enumerate() {
            sym[range.start + k] = irreps[*idx];
        }
    }
    Ok(e.select(Axis(0), &order))
}

impl<'a> LasSystem<'a> {
    /// Canonical orbitals of the LAS wave function. The core and external orbitals
    /// diagonalize their blocks of the Fock matrix (ascending energies); the active orbitals
    /// are the natural orbitals of `natorb_casdm1` (the state-averaged active 1-RDM by
    /// default) in descending order of occupation. If that density couples different
    /// fragments the whole active block is diagonalized at once and the CI vectors are
    /// dropped; otherwise every fragment is rotated on its own and its CI vectors follow the
    /// rotation.
    pub fn canonicalize(
        &self,
        mo_coeff: ArrayView2<f64>,
        ci: &CiVectors,
        natorb_casdm1: Option<ArrayView2<f64>>,
        veff: Option<ArrayView3<f64>>,
        h2eff: Option<&H2Eff>,
    ) -> Result<Canonicalized, LasError> {
        let (ncore, nocc, nmo) = (self.n_core, self.n_occ(), self.n_mo);
        let casdm1s_sub: Vec<Array3<f64>> = self.make_casdm1s_sub(ci)?;
        let fock_ao: Array2<f64> = self.get_fock(mo_coeff, &casdm1s_sub, veff);
        let fock: Array2<f64> = mo_coeff.t().dot(&fock_ao).dot(&mo_coeff);
        let casdm1: Array2<f64> = match natorb_casdm1 {
            Some(dm) => dm.to_owned(),
            None => make_casdm1s(&casdm1s_sub).sum_axis(Axis(0)),
        };
        let mut orbsym: Option<Vec<usize>> = self.orbsym.clone();
        let mut umat: Array2<f64> = Array2::zeros((nmo, nmo));

        diagonalize_block(fock.view(), 0..ncore, 0, &mut umat, &mut orbsym, false)?;

        let mut off_diagonal: Array2<f64> = casdm1.clone();
        for frag in self.fragments.iter() {
            let r = frag.cas_range();
            off_diagonal.slice_mut(s![r.clone(), r]).fill(0.0);
        }
        let max_off_diagonal: f64 = *off_diagonal
            .mapv(f64::abs)
            .max()
            .map_err(|err| LasError::StructuralInconsistency(err.to_string()))?;
        let mut ci_new: Option<CiVectors> = Some(ci.clone());
        if max_off_diagonal < self.config.solver.offdiag_tol {
            for frag in self.fragments.iter() {
                diagonalize_block(
                    casdm1.view(),
                    frag.mo_range(ncore),
                    ncore,
                    &mut umat,
                    &mut orbsym,
                    true,
                )?;
                let r = frag.mo_range(ncore);
                let u = umat.slice(s![r.clone(), r]);
                if let Some(ci_new) = ci_new.as_mut() {
                    for (root, vector) in ci_new[frag.index].iter_mut().enumerate() {
                        if let Some(c) = vector.as_mut() {
                            *c = frag.cibox.transform_ci_for_orbital_rotation(
                                c.view(),
                                frag.n_orbs,
                                self.states.nelec(root, frag.index),
                                u,
                            )?;
                        }
                    }
                }
            }
        } else {
            warn!(
                "Active 1-RDM couples the fragments (max. element {:.3e}); the CI vectors are invalidated",
                max_off_diagonal
            );
            diagonalize_block(casdm1.view(), ncore..nocc, ncore, &mut umat, &mut orbsym, true)?;
            ci_new = None;
        }

        diagonalize_block(
            fock.slice(s![nocc.., nocc..]),
            nocc..nmo,
            nocc,
            &mut umat,
            &mut orbsym,
            false,
        )?;

        let ucas = umat.slice(s![ncore..nocc, ncore..nocc]);
        let mut mo_occ: Array1<f64> = Array1::zeros(nmo);
        mo_occ.slice_mut(s![..ncore]).fill(2.0);
        mo_occ
            .slice_mut(s![ncore..nocc])
            .assign(&ucas.t().dot(&casdm1).dot(&ucas).diag());
        let mut mo_energy: Array1<f64> = umat.t().dot(&fock).dot(&umat).diag().to_owned();
        mo_energy.slice_mut(s![ncore..nocc]).fill(0.0);
        debug!("canonical orbital energies: {}", mo_energy);

        Ok(Canonicalized {
            mo_coeff: mo_coeff.dot(&umat),
            mo_energy,
            mo_occ,
            ci: ci_new,
            h2eff: h2eff.map(|h2eff| h2eff.transform(umat.view(), ucas)),
            orbsym,
        })
    }

    /// Canonicalizes the orbitals and CI vectors of the system in place.
    pub fn canonicalize_(&mut self) -> Result<(), LasError> {
        let ci: CiVectors = self.ci_vectors()?.clone();
        let h2eff: H2Eff = match self.properties.take_h2eff_sub() {
            Ok(h2eff) => h2eff,
            Err(_) => self.get_h2eff(self.mo_coeff.view()),
        };
        let veff: Option<Array3<f64>> = self.properties.take_veff().ok();
        let result: Canonicalized = match self.canonicalize(
            self.mo_coeff.view(),
            &ci,
            None,
            veff.as_ref().map(|v| v.view()),
            Some(&h2eff),
        ) {
            Ok(result) => result,
            Err(err) => {
                // the orbitals are unchanged, so the cached data stays valid
                self.properties.set_h2eff_sub(h2eff);
                if let Some(veff) = veff {
                    self.properties.set_veff(veff);
                }
                return Err(err);
            }
        };
        self.set_mo_coeff(result.mo_coeff);
        self.ci = result.ci;
        if let Some(orbsym) = result.orbsym {
            self.properties.set_orbsym(orbsym.clone());
            self.orbsym = Some(orbsym);
        }
        if let Some(h2eff) = result.h2eff {
            self.properties.set_h2eff_sub(h2eff);
        }
        self.properties.set_mo_energy(result.mo_energy);
        self.properties.set_mo_occ(result.mo_occ);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::block_diag;
    use crate::utils::tests::*;
    use approx::AbsDiffEq;

    pub const EPSILON: f64 = 1e-10;

    #[test]
    fn canonicalization_is_idempotent() {
        let molecule = get_test_molecule();
        let system = get_two_state_system(&molecule);
        let mo = molecule.mo_coeff.view();
        let ci = system.get_init_guess_ci(mo, None).unwrap();
        let first = system.canonicalize(mo, &ci, None, None, None).unwrap();
        let second = system
            .canonicalize(
                first.mo_coeff.view(),
                first.ci.as_ref().unwrap(),
                None,
                None,
                None,
            )
            .unwrap();
        assert!(second.mo_energy.abs_diff_eq(&first.mo_energy, EPSILON));
        assert!(second.mo_occ.abs_diff_eq(&first.mo_occ, EPSILON));
        // the occupation numbers account for all electrons
        assert!(first.mo_occ.sum().abs_diff_eq(&(system.n_elec() as f64), EPSILON));
    }

    #[test]
    fn integrals_and_densities_follow_the_rotation() {
        let molecule = get_test_molecule();
        let system = get_two_state_system(&molecule);
        let mo = molecule.mo_coeff.view();
        let ci = system.get_init_guess_ci(mo, None).unwrap();
        let h2eff = system.get_h2eff(mo);
        let result = system.canonicalize(mo, &ci, None, None, Some(&h2eff)).unwrap();
        let reference = system.get_h2eff(result.mo_coeff.view());
        assert!(result
            .h2eff
            .unwrap()
            .packed
            .abs_diff_eq(&reference.packed, EPSILON));
        // the AO density matrices do not depend on the representation
        let ci_new = result.ci.unwrap();
        let dm_old = system.make_rdm1s(mo, &system.make_casdm1s_sub(&ci).unwrap());
        let dm_new = system.make_rdm1s(
            result.mo_coeff.view(),
            &system.make_casdm1s_sub(&ci_new).unwrap(),
        );
        assert!(dm_new.abs_diff_eq(&dm_old, EPSILON));
    }

    /// Orbitals mo . u and the CI vectors expressed in them, for a unitary u that does not
    /// mix the core, the fragments and the external orbitals.
    fn rotate(
        system: &LasSystem,
        mo: ArrayView2<f64>,
        ci: &CiVectors,
        u: ArrayView2<f64>,
    ) -> (Array2<f64>, CiVectors) {
        let mut ci_new: CiVectors = ci.clone();
        for frag in system.fragments.iter() {
            let r = frag.mo_range(system.n_core);
            for (root, vector) in ci_new[frag.index].iter_mut().enumerate() {
                if let Some(c) = vector.as_mut() {
                    *c = frag
                        .cibox
                        .transform_ci_for_orbital_rotation(
                            c.view(),
                            frag.n_orbs,
                            system.states.nelec(root, frag.index),
                            u.slice(s![r.clone(), r.clone()]),
                        )
                        .unwrap();
                }
            }
        }
        (mo.dot(&u), ci_new)
    }

    #[test]
    fn rotation_and_its_inverse_restore_densities_and_energy() {
        let molecule = get_test_molecule();
        let system = get_two_state_system(&molecule);
        let mo = molecule.mo_coeff.view();
        let ci = system.run_lasci(mo, None).unwrap().ci;
        let blocks: Vec<Array2<f64>> = vec![
            random_orthogonal(system.n_core, 11),
            random_orthogonal(system.fragments[0].n_orbs, 12),
            random_orthogonal(system.fragments[1].n_orbs, 13),
            random_orthogonal(system.n_mo - system.n_occ(), 14),
        ];
        let u: Array2<f64> = block_diag(&blocks);

        let (mo_rot, ci_rot) = rotate(&system, mo, &ci, u.view());
        let (mo_back, ci_back) = rotate(&system, mo_rot.view(), &ci_rot, u.t());
        assert!(mo_back.abs_diff_eq(&mo, EPSILON));

        let casdm1s = system.make_casdm1s(&ci).unwrap();
        let casdm2 = system.make_casdm2(&ci).unwrap();
        assert!(system.make_casdm1s(&ci_back).unwrap().abs_diff_eq(&casdm1s, EPSILON));
        assert!(system.make_casdm2(&ci_back).unwrap().abs_diff_eq(&casdm2, EPSILON));

        let energy = |mo: ArrayView2<f64>, ci: &CiVectors| {
            system.energy_tot(mo, &system.get_h2eff(mo), ci).unwrap()
        };
        let e_ref: f64 = energy(mo, &ci);
        // the rotated wave function is the same state in another basis
        assert!(energy(mo_rot.view(), &ci_rot).abs_diff_eq(&e_ref, EPSILON));
        assert!(energy(mo_back.view(), &ci_back).abs_diff_eq(&e_ref, EPSILON));
    }

    #[test]
    fn failed_canonicalization_keeps_the_cached_data() {
        let molecule = get_test_molecule();
        let mut system = get_two_state_system(&molecule);
        let mut ci = system.lasci().unwrap().ci;
        assert!(system.properties.h2eff_sub().is_some());
        assert!(system.properties.veff().is_some());
        ci[0][1] = Some(Array2::zeros((2, 2)));
        system.ci = Some(ci);
        assert!(matches!(
            system.canonicalize_(),
            Err(LasError::StructuralInconsistency(_))
        ));
        assert!(system.properties.h2eff_sub().is_some());
        assert!(system.properties.veff().is_some());
    }

    #[test]
    fn coupled_fragments_invalidate_the_ci_vectors() {
        let molecule = get_test_molecule();
        let system = get_test_system(&molecule);
        let mo = molecule.mo_coeff.view();
        let ci = system.get_init_guess_ci(mo, None).unwrap();
        let mut casdm1: Array2<f64> = system.make_casdm1s(&ci).unwrap().sum_axis(Axis(0));
        casdm1[[0, 2]] = 0.1;
        casdm1[[2, 0]] = 0.1;
        let result = system
            .canonicalize(mo, &ci, Some(casdm1.view()), None, None)
            .unwrap();
        assert!(result.ci.is_none());
        let mut invalidated = system.clone();
        invalidated.ci = result.ci;
        assert!(matches!(
            invalidated.canonicalize_(),
            Err(LasError::StructuralInconsistency(_))
        ));
    }
}
