use crate::defaults::{E_STATES_FILE, MO_COEFF_FILE, MO_ENERGY_FILE, MO_OCC_FILE, ORBSYM_FILE};
use crate::initialization::LasSystem;
use anyhow::{Context, Result};
use log::info;
use ndarray::prelude::*;
use ndarray_npy::write_npy;

/// Writes the orbitals, the orbital energies and occupations and the state energies of the
/// last calculation in numpy format.
pub fn write_results(system: &LasSystem) -> Result<()> {
    write_npy(MO_COEFF_FILE, &system.mo_coeff)
        .with_context(|| format!("unable to write {}", MO_COEFF_FILE))?;
    if let Some(mo_energy) = system.properties.mo_energy() {
        write_npy(MO_ENERGY_FILE, &mo_energy)
            .with_context(|| format!("unable to write {}", MO_ENERGY_FILE))?;
    }
    if let Some(mo_occ) = system.properties.mo_occ() {
        write_npy(MO_OCC_FILE, &mo_occ).with_context(|| format!("unable to write {}", MO_OCC_FILE))?;
    }
    if let Some(orbsym) = system.properties.orbsym() {
        let labels: Array1<i64> = orbsym.iter().map(|irrep| *irrep as i64).collect();
        write_npy(ORBSYM_FILE, &labels).with_context(|| format!("unable to write {}", ORBSYM_FILE))?;
    }
    if let Some(e_states) = system.properties.e_states() {
        write_npy(E_STATES_FILE, &e_states)
            .with_context(|| format!("unable to write {}", E_STATES_FILE))?;
        for (root, energy) in e_states.iter().enumerate() {
            info!("{:<25} {:>4} {:>18.10}", "final state energy:", root, energy);
        }
    }
    if let (Some(e_tot), Some(converged)) = (system.properties.e_tot(), system.properties.converged()) {
        info!("{:<25} {:>23.10}", "final average energy:", e_tot);
        info!("{:<25} {:>23}", "converged:", converged);
    }
    Ok(())
}
