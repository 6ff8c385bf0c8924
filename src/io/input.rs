use crate::integrals::{DfAdapter, InCoreEngine};
use crate::io::{Configuration, IntegralConfig};
use anyhow::{Context, Result};
use log::info;
use ndarray::prelude::*;
use ndarray_npy::read_npy;
use std::fs;
use std::path::Path;

/// AO integrals and starting orbitals of a calculation.
pub struct IntegralData {
    pub engine: InCoreEngine,
    pub df: Option<DfAdapter>,
    pub mo_coeff: Array2<f64>,
    pub orbsym: Option<Vec<usize>>,
}

pub fn read_input(config_file: &str) -> Result<Configuration> {
    // The configuration file is read, if it does not exist the default settings are
    // used and written to this file, so that the user can see all the used options.
    let config_file_path: &Path = Path::new(config_file);
    let config_string: String = if config_file_path.exists() {
        fs::read_to_string(config_file_path)
            .with_context(|| format!("unable to read config file {}", config_file))?
    } else {
        String::new()
    };
    let config: Configuration = toml::from_str(&config_string)
        .with_context(|| format!("unable to parse config file {}", config_file))?;
    if !config_file_path.exists() {
        fs::write(config_file_path, toml::to_string(&config)?)
            .with_context(|| format!("unable to write config file {}", config_file))?;
    }
    Ok(config)
}

fn read_array<A, D>(path: &str) -> Result<Array<A, D>>
where
    A: ndarray_npy::ReadableElement,
    D: Dimension,
{
    read_npy(path).with_context(|| format!("unable to read {}", path))
}

/// Loads the integrals listed in the configuration. If a three-index factor is given the
/// four-index integrals are rebuilt from it instead of being read.
pub fn load_integrals(config: &IntegralConfig) -> Result<IntegralData> {
    let hcore: Array2<f64> = read_array(&config.hcore)?;
    let ovlp: Array2<f64> = read_array(&config.ovlp)?;
    let mo_coeff: Array2<f64> = read_array(&config.mo_coeff)?;

    let (eri, df): (Array4<f64>, Option<DfAdapter>) = match &config.cderi {
        Some(path) => {
            let df = DfAdapter::new(read_array(path)?);
            info!("{:<25} {}", "density fitting basis:", df.naux());
            (df.full_eri(), Some(df))
        }
        None => (read_array(&config.eri)?, None),
    };
    let orbsym: Option<Vec<usize>> = match &config.orbsym {
        Some(path) => {
            let labels: Array1<i64> = read_array(path)?;
            Some(labels.iter().map(|irrep| *irrep as usize).collect())
        }
        None => None,
    };
    info!("{:<25} {}", "atomic orbitals:", hcore.nrows());
    info!("{:<25} {}", "molecular orbitals:", mo_coeff.ncols());

    Ok(IntegralData {
        engine: InCoreEngine::new(hcore, ovlp, eri, config.energy_nuc),
        df,
        mo_coeff,
        orbsym,
    })
}
