use crate::initialization::LasSystem;
use crate::integrals::{DfAdapter, InCoreEngine};
use crate::io::{Configuration, StateAverageConfig};
use ndarray::prelude::*;
use ndarray_linalg::{Eigh, UPLO};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub const NAO: usize = 8;
pub const NAUX: usize = 14;
pub const MOLECULE_SEED: u64 = 1234;

/// Model molecule with a non-orthogonal AO basis and density-fitted integrals, so that the
/// in-core and the density-fitted routines describe exactly the same Hamiltonian.
pub struct TestMolecule {
    pub engine: InCoreEngine,
    pub df: DfAdapter,
    pub mo_coeff: Array2<f64>,
}

fn random_symmetric(n: usize, scale: f64, rng: &mut StdRng) -> Array2<f64> {
    let a: Array2<f64> = Array2::random_using((n, n), Uniform::new(-scale, scale), rng);
    (&a + &a.t()) * 0.5
}

fn random_cderi(naux: usize, n: usize, scale: f64, rng: &mut StdRng) -> Array3<f64> {
    let mut cderi: Array3<f64> = Array3::zeros((naux, n, n));
    for mut b in cderi.outer_iter_mut() {
        b.assign(&random_symmetric(n, scale, rng));
    }
    cderi
}

pub fn random_orthogonal(n: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (_, q) = random_symmetric(n, 1.0, &mut rng)
        .eigh(UPLO::Lower)
        .unwrap();
    q
}

/// One-electron operator and (pq|rs) integrals of a small orthonormal orbital space.
pub fn random_active_hamiltonian(norb: usize, seed: u64) -> (Array2<f64>, Array4<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut h1: Array2<f64> = random_symmetric(norb, 0.3, &mut rng);
    let mut diagonal = h1.diag_mut();
    diagonal += &Array1::linspace(-1.0, 0.5, norb);
    let eri: Array4<f64> = DfAdapter::new(random_cderi(6, norb, 0.3, &mut rng)).full_eri();
    (h1, eri)
}

pub fn get_test_molecule() -> TestMolecule {
    let mut rng = StdRng::seed_from_u64(MOLECULE_SEED);
    let df = DfAdapter::new(random_cderi(NAUX, NAO, 0.3, &mut rng));
    let eri: Array4<f64> = df.full_eri();
    let mut hcore: Array2<f64> = random_symmetric(NAO, 0.2, &mut rng);
    let mut diagonal = hcore.diag_mut();
    diagonal += &Array1::linspace(-3.0, 1.5, NAO);
    let mut ovlp: Array2<f64> = random_symmetric(NAO, 0.05, &mut rng);
    ovlp.diag_mut().fill(1.0);

    // symmetric orthogonalization followed by the eigenvectors of the core Hamiltonian
    let (s_e, s_v) = ovlp.eigh(UPLO::Lower).unwrap();
    let x: Array2<f64> = s_v
        .dot(&Array2::from_diag(&s_e.mapv(|e| 1.0 / e.sqrt())))
        .dot(&s_v.t());
    let (_, c) = x.dot(&hcore).dot(&x).eigh(UPLO::Lower).unwrap();
    let mo_coeff: Array2<f64> = x.dot(&c);
    TestMolecule {
        engine: InCoreEngine::new(hcore, ovlp, eri, 1.5),
        df,
        mo_coeff,
    }
}

/// One core orbital, two (2e, 2o) fragments and three external orbitals.
pub fn get_test_config() -> Configuration {
    let input: &str = r#"
        [las]
        ncore = 1
        ncas_sub = [2, 2]
        nelecas_sub = [[1, 1], [1, 1]]
        [solver]
        conv_tol_grad = 1e-9
        conv_tol_self = 1e-12
        max_cycle_macro = 200
    "#;
    toml::from_str(input).unwrap()
}

/// Two states: both fragments singlet, and fragment 0 as a high-spin triplet.
pub fn get_two_state_config() -> StateAverageConfig {
    StateAverageConfig {
        weights: vec![0.5, 0.5],
        spins: Some(vec![vec![0, 0], vec![2, 0]]),
        smults: Some(vec![vec![1, 1], vec![3, 1]]),
        assert_no_dupes: true,
        ..Default::default()
    }
}

pub fn get_test_system(molecule: &TestMolecule) -> LasSystem<'_> {
    LasSystem::new(get_test_config(), &molecule.engine, molecule.mo_coeff.clone()).unwrap()
}

pub fn get_two_state_system(molecule: &TestMolecule) -> LasSystem<'_> {
    let mut config: Configuration = get_test_config();
    config.state_average = Some(get_two_state_config());
    LasSystem::new(config, &molecule.engine, molecule.mo_coeff.clone()).unwrap()
}
