// JOB SPECIFICATION
// jobtype, either a single LASCI solve or the orbital-optimizing LASSCF cycle
pub const JOBTYPE: &str = "lasci";
// config file
pub const CONFIG_FILE_NAME: &str = "lasci.toml";
pub const VERBOSE: i8 = 0;

// LAS PARTITIONING
// number of doubly occupied core orbitals
pub const NCORE: usize = 0;

// STATE AVERAGING
// duplicate rows in the state table are treated as an error
pub const ASSERT_NO_DUPES: bool = true;

// PRODUCT-STATE AND ORBITAL CONVERGENCE
// threshold of the CI residual norm of every fragment
pub const CONV_TOL_GRAD: f64 = 1.0e-4;
// threshold of the energy change between two product-state sweeps
pub const CONV_TOL_SELF: f64 = 1.0e-10;
// maximum number of product-state sweeps per state or LASSCF macro iterations
pub const MAX_CYCLE_MACRO: usize = 50;
// maximum number of step halvings of one orbital step
pub const MAX_CYCLE_MICRO: usize = 5;
// shift added to the diagonal orbital Hessian
pub const AH_LEVEL_SHIFT: f64 = 1.0e-8;
// smallest admissible diagonal orbital Hessian element
pub const MIN_ORBITAL_HESSIAN: f64 = 0.1;
// initial scaling of the preconditioned orbital step
pub const ORBITAL_STEP: f64 = 1.0;
// largest norm of one packed orbital step
pub const MAX_ORBITAL_ROTATION: f64 = 0.5;

// CANONICALIZATION
// largest inter-fragment element of the natural-orbital density that still
// allows a per-fragment diagonalization
pub const OFFDIAG_TOL: f64 = 1.0e-8;

// FRAGMENT CI
// tolerance on <S^2> when a fragment root is chosen by spin
pub const SPIN_SQUARE_TOL: f64 = 1.0e-2;

// PARALLELIZATION
pub const NUMBER_OF_CORES: usize = 1;

// OUTPUT FILES
pub const MO_COEFF_FILE: &str = "mo_coeff.npy";
pub const MO_ENERGY_FILE: &str = "mo_energy.npy";
pub const MO_OCC_FILE: &str = "mo_occ.npy";
pub const E_STATES_FILE: &str = "e_states.npy";
pub const ORBSYM_FILE: &str = "orbsym.npy";
