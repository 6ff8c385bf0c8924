use crate::errors::LasError;
use crate::fci::FragmentCiBox;
use crate::initialization::{Fragment, StateManifold, SymmetryLabeler};
use crate::integrals::{DfAdapter, H2Eff, MeanFieldEngine};
use crate::io::Configuration;
use crate::las::CiVectors;
use crate::properties::Properties;
use log::debug;
use ndarray::prelude::*;
use std::sync::Arc;

/// Type that holds a LAS wave function: the partitioning of the orbitals, the fragments with
/// their CI solvers, the state manifold, the current orbitals and CI vectors, and the
/// collaborators that provide the integrals.
#[derive(Clone)]
pub struct LasSystem<'a> {
    /// Type that holds all the input settings from the user.
    pub config: Configuration,
    /// Source of the AO integrals
    pub engine: &'a dyn MeanFieldEngine,
    /// Density fitting of the two-electron integrals. If present it replaces the
    /// Coulomb/exchange builds and the integral transformation of the engine.
    pub df: Option<DfAdapter>,
    /// Optional point-group labeling of the orbitals
    pub symmetry: Option<Arc<dyn SymmetryLabeler>>,
    /// Number of atomic orbitals
    pub n_ao: usize,
    /// Number of molecular orbitals
    pub n_mo: usize,
    /// Number of doubly occupied core orbitals
    pub n_core: usize,
    /// Total number of active orbitals
    pub n_cas: usize,
    pub fragments: Vec<Fragment>,
    pub states: StateManifold,
    /// MO coefficients (n_ao, n_mo): core, active (fragment after fragment) and external orbitals
    pub mo_coeff: Array2<f64>,
    /// irrep of every molecular orbital
    pub orbsym: Option<Vec<usize>>,
    /// CI vectors [fragment][state]. None after they were invalidated.
    pub ci: Option<CiVectors>,
    /// Quantities that depend on the current orbitals.
    pub properties: Properties,
}

impl<'a> LasSystem<'a> {
    pub fn new(
        config: Configuration,
        engine: &'a dyn MeanFieldEngine,
        mo_coeff: Array2<f64>,
    ) -> Result<Self, LasError> {
        Self::input_check(&config, engine, mo_coeff.view())?;
        let las = &config.las;

        let mut fragments: Vec<Fragment> = Vec::with_capacity(las.ncas_sub.len());
        let mut offset: usize = 0;
        for (index, (norb, nelec)) in las.ncas_sub.iter().zip(las.nelecas_sub.iter()).enumerate() {
            let mut fragment = Fragment::new(index, *norb, (nelec[0], nelec[1]), offset);
            if let Some(smult) = las.spin_sub.get(index) {
                fragment.smult = *smult;
            }
            if let Some(wfnsym) = las.wfnsym_sub.get(index) {
                fragment.wfnsym = *wfnsym;
            }
            offset += norb;
            fragments.push(fragment);
        }
        let states: StateManifold = match &config.state_average {
            Some(sa) => StateManifold::from_config(sa, &fragments)?,
            None => StateManifold::single_state(&fragments)?,
        };
        debug!(
            "LAS system with {} fragments and {} states",
            fragments.len(),
            states.nroots()
        );

        Ok(LasSystem {
            n_ao: engine.nao(),
            n_mo: mo_coeff.ncols(),
            n_core: las.ncore,
            n_cas: offset,
            config,
            engine,
            df: None,
            symmetry: None,
            fragments,
            states,
            mo_coeff,
            orbsym: None,
            ci: None,
            properties: Properties::new(),
        })
    }

    /// Replaces the integral routines of the engine by density-fitted ones.
    pub fn with_df(mut self, df: DfAdapter) -> Self {
        self.df = Some(df);
        self.properties.reset();
        self
    }

    /// Attaches a symmetry labeler and labels the current orbitals.
    pub fn with_symmetry(mut self, labeler: Arc<dyn SymmetryLabeler>) -> Self {
        self.orbsym = Some(labeler.label_orbitals(self.mo_coeff.view(), self.engine.ovlp()));
        self.symmetry = Some(labeler);
        self
    }

    /// Sets fixed irrep labels of the current orbitals.
    pub fn with_orbsym(mut self, orbsym: Vec<usize>) -> Result<Self, LasError> {
        if orbsym.len() != self.n_mo {
            return Err(LasError::Configuration(format!(
                "{} symmetry labels given for {} orbitals",
                orbsym.len(),
                self.n_mo
            )));
        }
        self.orbsym = Some(orbsym);
        Ok(self)
    }

    /// Replaces the CI solver of one fragment.
    pub fn set_fcibox(&mut self, frag: usize, cibox: Arc<dyn FragmentCiBox>) {
        self.fragments[frag].cibox = cibox;
    }

    pub fn nfrags(&self) -> usize {
        self.fragments.len()
    }

    pub fn nroots(&self) -> usize {
        self.states.nroots()
    }

    /// Number of core and active orbitals.
    pub fn n_occ(&self) -> usize {
        self.n_core + self.n_cas
    }

    pub fn ncas_sub(&self) -> Vec<usize> {
        self.fragments.iter().map(|frag| frag.n_orbs).collect()
    }

    pub fn weights(&self) -> &[f64] {
        &self.states.weights
    }

    /// Total number of electrons of the reference state.
    pub fn n_elec(&self) -> usize {
        2 * self.n_core + self.fragments.iter().map(|frag| frag.n_elec()).sum::<usize>()
    }

    /// Replaces the orbitals and clears everything that was derived from the old ones.
    pub fn set_mo_coeff(&mut self, mo_coeff: Array2<f64>) {
        self.properties.reset();
        if let Some(labeler) = &self.symmetry {
            self.orbsym = Some(labeler.label_orbitals(mo_coeff.view(), self.engine.ovlp()));
        }
        self.mo_coeff = mo_coeff;
    }

    /// Returns the CI vectors or an error if they were invalidated.
    pub fn ci_vectors(&self) -> Result<&CiVectors, LasError> {
        self.ci.as_ref().ok_or_else(|| {
            LasError::StructuralInconsistency(String::from(
                "the CI vectors were invalidated by a non-local orbital rotation",
            ))
        })
    }

    /// Coulomb and exchange matrices of a stack of AO density matrices.
    pub fn get_jk(&self, dms: ArrayView3<f64>) -> (Array3<f64>, Array3<f64>) {
        match &self.df {
            Some(df) => df.get_jk(dms),
            None => self.engine.get_jk(dms),
        }
    }

    /// (p u|v w) integrals of the orbitals `mo_coeff`.
    pub fn get_h2eff(&self, mo_coeff: ArrayView2<f64>) -> H2Eff {
        let mo_cas = mo_coeff.slice(s![.., self.n_core..self.n_occ()]);
        match &self.df {
            Some(df) => df.ao2mo(mo_coeff, mo_cas),
            None => self.engine.ao2mo(mo_coeff, mo_cas),
        }
    }

    /// (p u|v w) integrals of the current orbitals, transformed once and cached.
    pub fn h2eff_sub(&mut self) -> H2Eff {
        match self.properties.h2eff_sub() {
            Some(h2eff) => h2eff.clone(),
            None => {
                let h2eff: H2Eff = self.get_h2eff(self.mo_coeff.view());
                self.properties.set_h2eff_sub(h2eff.clone());
                h2eff
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::tests::*;

    #[test]
    fn fragments_partition_the_active_space() {
        let molecule = get_test_molecule();
        let system = get_test_system(&molecule);
        assert_eq!(system.n_cas, 4);
        assert_eq!(system.fragments[1].cas_range(), 2..4);
        assert_eq!(system.fragments[1].mo_range(system.n_core), 3..5);
        assert_eq!(system.n_elec(), 6);
        assert_eq!(system.nroots(), 1);
    }

    #[test]
    fn frozen_orbitals_are_not_implemented() {
        let molecule = get_test_molecule();
        let mut config = get_test_config();
        config.las.frozen = vec![0];
        let result = LasSystem::new(config, &molecule.engine, molecule.mo_coeff.clone());
        assert!(matches!(result, Err(LasError::Unimplemented(_))));
    }

    #[test]
    fn fragments_too_large_for_occupation_strings_are_rejected() {
        let molecule = get_test_molecule();
        let mut config = get_test_config();
        config.las.ncas_sub = vec![64, 2];
        let result = LasSystem::new(config, &molecule.engine, molecule.mo_coeff.clone());
        assert!(matches!(result, Err(LasError::Configuration(msg)) if msg.contains("64")));
    }

    #[test]
    fn orbital_cache_is_cleared_with_new_orbitals() {
        let molecule = get_test_molecule();
        let mut system = get_test_system(&molecule);
        let _ = system.h2eff_sub();
        assert!(system.properties.h2eff_sub().is_some());
        let mo: Array2<f64> = system.mo_coeff.clone();
        system.set_mo_coeff(mo);
        assert!(system.properties.h2eff_sub().is_none());
        assert!(system.ci_vectors().is_err());
    }
}
