use super::LasSystem;
use crate::errors::LasError;
use crate::fci::strings::MAX_STRING_ORBITALS;
use crate::integrals::MeanFieldEngine;
use crate::io::Configuration;
use log::debug;
use ndarray::prelude::*;

impl<'a> LasSystem<'a> {
    /// Checks the partitioning of the orbitals and the fragment settings against the
    /// dimensions of the integrals and orbitals.
    pub fn input_check(
        config: &Configuration,
        engine: &dyn MeanFieldEngine,
        mo_coeff: ArrayView2<f64>,
    ) -> Result<(), LasError> {
        let las = &config.las;

        debug!("{:^80}", "");
        debug!("{:-^80}", "");

        // frozen orbitals are not supported by the LAS gradients
        if !las.frozen.is_empty() {
            return Err(LasError::Unimplemented(String::from(
                "frozen orbitals in LAS orbital optimizations",
            )));
        }
        if !["lasci", "lasscf"].contains(&config.jobtype.as_str()) {
            return Err(LasError::Configuration(format!(
                "unknown jobtype {}, use lasci or lasscf",
                config.jobtype
            )));
        }
        if las.ncas_sub.is_empty() || las.ncas_sub.contains(&0) {
            return Err(LasError::Configuration(format!(
                "every fragment needs at least one active orbital: {:?}",
                las.ncas_sub
            )));
        }
        // occupation strings of a fragment are bit masks of one u64
        if let Some(norb) = las.ncas_sub.iter().find(|norb| **norb > MAX_STRING_ORBITALS) {
            return Err(LasError::Configuration(format!(
                "a fragment with {} active orbitals exceeds the limit of {}",
                norb, MAX_STRING_ORBITALS
            )));
        }
        let nfrags: usize = las.ncas_sub.len();
        if las.nelecas_sub.len() != nfrags {
            return Err(LasError::Configuration(format!(
                "{} electron counts given for {} fragments",
                las.nelecas_sub.len(),
                nfrags
            )));
        }
        if (!las.spin_sub.is_empty() && las.spin_sub.len() != nfrags)
            || (!las.wfnsym_sub.is_empty() && las.wfnsym_sub.len() != nfrags)
        {
            return Err(LasError::Configuration(String::from(
                "spin_sub and wfnsym_sub need one entry per fragment",
            )));
        }
        for (index, (norb, nelec)) in las.ncas_sub.iter().zip(las.nelecas_sub.iter()).enumerate() {
            if nelec[0] > *norb || nelec[1] > *norb {
                return Err(LasError::Configuration(format!(
                    "fragment {}: {:?} electrons do not fit into {} orbitals",
                    index, nelec, norb
                )));
            }
            if let Some(smult) = las.spin_sub.get(index) {
                let twos: usize = nelec[0].abs_diff(nelec[1]);
                if *smult < twos + 1 || (*smult - 1 - twos) % 2 != 0 {
                    return Err(LasError::Configuration(format!(
                        "fragment {}: multiplicity {} is incompatible with {:?} electrons",
                        index, smult, nelec
                    )));
                }
            }
        }

        let nao: usize = engine.nao();
        if engine.hcore().dim() != (nao, nao) || engine.ovlp().dim() != (nao, nao) {
            return Err(LasError::Configuration(String::from(
                "the one-electron integrals do not match the number of atomic orbitals",
            )));
        }
        let ncas: usize = las.ncas_sub.iter().sum();
        if mo_coeff.nrows() != nao || las.ncore + ncas > mo_coeff.ncols() {
            return Err(LasError::Configuration(format!(
                "orbitals of shape {:?} cannot hold {} core and {} active orbitals",
                mo_coeff.dim(),
                las.ncore,
                ncas
            )));
        }

        debug!("{: ^80}", "Finished input check. No problems occured!");
        debug!("{:-<80} ", "");
        debug!("{:^80} ", "");
        Ok(())
    }
}
