use crate::defaults::*;
use serde::{Deserialize, Serialize};

fn default_jobtype() -> String {
    String::from(JOBTYPE)
}
fn default_verbose() -> i8 {
    VERBOSE
}
fn default_ncore() -> usize {
    NCORE
}
fn default_assert_no_dupes() -> bool {
    ASSERT_NO_DUPES
}
fn default_conv_tol_grad() -> f64 {
    CONV_TOL_GRAD
}
fn default_conv_tol_self() -> f64 {
    CONV_TOL_SELF
}
fn default_max_cycle_macro() -> usize {
    MAX_CYCLE_MACRO
}
fn default_max_cycle_micro() -> usize {
    MAX_CYCLE_MICRO
}
fn default_ah_level_shift() -> f64 {
    AH_LEVEL_SHIFT
}
fn default_orbital_step() -> f64 {
    ORBITAL_STEP
}
fn default_offdiag_tol() -> f64 {
    OFFDIAG_TOL
}
fn default_number_of_cores() -> usize {
    NUMBER_OF_CORES
}
fn default_hcore_file() -> String {
    String::from("hcore.npy")
}
fn default_ovlp_file() -> String {
    String::from("ovlp.npy")
}
fn default_eri_file() -> String {
    String::from("eri.npy")
}
fn default_mo_coeff_file() -> String {
    String::from("mo_coeff.npy")
}
fn default_energy_nuc() -> f64 {
    0.0
}
fn default_las_config() -> LasConfig {
    let las_config: LasConfig = toml::from_str("").unwrap();
    las_config
}
fn default_solver_config() -> SolverConfig {
    let solver_config: SolverConfig = toml::from_str("").unwrap();
    solver_config
}
fn default_integral_config() -> IntegralConfig {
    let integral_config: IntegralConfig = toml::from_str("").unwrap();
    integral_config
}
fn default_parallelization_config() -> ParallelizationConfig {
    let parallelization_config: ParallelizationConfig = toml::from_str("").unwrap();
    parallelization_config
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Configuration {
    #[serde(default = "default_jobtype")]
    pub jobtype: String,
    #[serde(default = "default_verbose")]
    pub verbose: i8,
    #[serde(default = "default_las_config")]
    pub las: LasConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_average: Option<StateAverageConfig>,
    #[serde(default = "default_solver_config")]
    pub solver: SolverConfig,
    #[serde(default = "default_integral_config")]
    pub integrals: IntegralConfig,
    #[serde(default = "default_parallelization_config")]
    pub parallelization: ParallelizationConfig,
}

/// Partitioning of the orbitals into core, fragment active spaces and external orbitals.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LasConfig {
    #[serde(default = "default_ncore")]
    pub ncore: usize,
    /// number of active orbitals of every fragment
    #[serde(default)]
    pub ncas_sub: Vec<usize>,
    /// (alpha, beta) electrons of every fragment
    #[serde(default)]
    pub nelecas_sub: Vec<[usize; 2]>,
    /// spin multiplicities of the fragments, |na - nb| + 1 if empty
    #[serde(default)]
    pub spin_sub: Vec<usize>,
    /// irreps of the fragment wave functions, totally symmetric if empty
    #[serde(default)]
    pub wfnsym_sub: Vec<usize>,
    /// orbitals excluded from the orbital optimization
    #[serde(default)]
    pub frozen: Vec<usize>,
}

/// Table of the states of a state-averaged calculation. Every row (state) holds one
/// entry per fragment. Missing tables are filled from the fragment settings.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct StateAverageConfig {
    pub weights: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charges: Option<Vec<Vec<i32>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spins: Option<Vec<Vec<i32>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smults: Option<Vec<Vec<i32>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wfnsyms: Option<Vec<Vec<i32>>>,
    #[serde(default = "default_assert_no_dupes")]
    pub assert_no_dupes: bool,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct SolverConfig {
    #[serde(default = "default_conv_tol_grad")]
    pub conv_tol_grad: f64,
    #[serde(default = "default_conv_tol_self")]
    pub conv_tol_self: f64,
    #[serde(default = "default_max_cycle_macro")]
    pub max_cycle_macro: usize,
    #[serde(default = "default_max_cycle_micro")]
    pub max_cycle_micro: usize,
    #[serde(default = "default_ah_level_shift")]
    pub ah_level_shift: f64,
    #[serde(default = "default_orbital_step")]
    pub orbital_step: f64,
    #[serde(default = "default_offdiag_tol")]
    pub offdiag_tol: f64,
}

/// Files (numpy format) with the AO integrals and the starting orbitals.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct IntegralConfig {
    #[serde(default = "default_hcore_file")]
    pub hcore: String,
    #[serde(default = "default_ovlp_file")]
    pub ovlp: String,
    #[serde(default = "default_eri_file")]
    pub eri: String,
    /// three-index factor (naux, nao, nao); if present the density-fitted routines are used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cderi: Option<String>,
    #[serde(default = "default_mo_coeff_file")]
    pub mo_coeff: String,
    /// irrep label of every orbital
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orbsym: Option<String>,
    #[serde(default = "default_energy_nuc")]
    pub energy_nuc: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ParallelizationConfig {
    #[serde(default = "default_number_of_cores")]
    pub number_of_cores: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_gives_defaults() {
        let config: Configuration = toml::from_str("").unwrap();
        assert_eq!(config.jobtype, "lasci");
        assert_eq!(config.solver.max_cycle_macro, MAX_CYCLE_MACRO);
        assert!(config.state_average.is_none());
        assert!(config.las.ncas_sub.is_empty());
    }

    #[test]
    fn state_table_is_read() {
        let input: &str = r#"
            jobtype = "lasscf"
            [las]
            ncore = 1
            ncas_sub = [2, 2]
            nelecas_sub = [[1, 1], [1, 1]]
            [state_average]
            weights = [0.5, 0.5]
            spins = [[0, 0], [2, 0]]
            smults = [[1, 1], [3, 1]]
        "#;
        let config: Configuration = toml::from_str(input).unwrap();
        let sa = config.state_average.unwrap();
        assert_eq!(sa.weights, vec![0.5, 0.5]);
        assert_eq!(sa.spins, Some(vec![vec![0, 0], vec![2, 0]]));
        assert!(sa.charges.is_none());
        assert!(sa.assert_no_dupes);
        assert_eq!(config.las.nelecas_sub, vec![[1, 1], [1, 1]]);
    }
}
