use crate::defaults::SPIN_SQUARE_TOL;
use crate::errors::LasError;
use crate::fci::strings::{make_strings, occupied_orbitals, string_addresses};
use crate::fci::{CiSolution, CiTarget, FragmentCiBox};
use hashbrown::HashMap;
use log::debug;
use ndarray::prelude::*;
use ndarray_linalg::Determinant as _;
use ndarray_linalg::{Eigh, UPLO};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Spin {
    Alpha,
    Beta,
}

const SPINS: [Spin; 2] = [Spin::Alpha, Spin::Beta];

impl Spin {
    fn index(&self) -> usize {
        match self {
            Spin::Alpha => 0,
            Spin::Beta => 1,
        }
    }
}

/// Slater determinant given by its alpha and beta occupation strings. In the
/// second-quantized ordering all alpha spin orbitals precede the beta spin orbitals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Determinant {
    alpha: u64,
    beta: u64,
}

impl Determinant {
    fn string(&self, spin: Spin) -> u64 {
        match spin {
            Spin::Alpha => self.alpha,
            Spin::Beta => self.beta,
        }
    }

    fn with_string(&self, spin: Spin, string: u64) -> Self {
        match spin {
            Spin::Alpha => Determinant {
                alpha: string,
                beta: self.beta,
            },
            Spin::Beta => Determinant {
                alpha: self.alpha,
                beta: string,
            },
        }
    }

    /// (-1)^n with n the number of occupied spin orbitals in front of (p, spin)
    fn phase(&self, p: usize, spin: Spin) -> f64 {
        let below: u64 = (1u64 << p) - 1;
        let n: u32 = match spin {
            Spin::Alpha => (self.alpha & below).count_ones(),
            Spin::Beta => self.alpha.count_ones() + (self.beta & below).count_ones(),
        };
        if n % 2 == 0 {
            1.0
        } else {
            -1.0
        }
    }

    fn annihilate(&self, p: usize, spin: Spin) -> Option<(Self, f64)> {
        let bit: u64 = 1u64 << p;
        let string: u64 = self.string(spin);
        if string & bit == 0 {
            return None;
        }
        Some((self.with_string(spin, string ^ bit), self.phase(p, spin)))
    }

    fn create(&self, p: usize, spin: Spin) -> Option<(Self, f64)> {
        let bit: u64 = 1u64 << p;
        let string: u64 = self.string(spin);
        if string & bit != 0 {
            return None;
        }
        Some((self.with_string(spin, string | bit), self.phase(p, spin)))
    }

    /// a+_ps a_qs
    fn excite(&self, p: usize, q: usize, spin: Spin) -> Option<(Self, f64)> {
        let (det, sign_q) = self.annihilate(q, spin)?;
        let (det, sign_p) = det.create(p, spin)?;
        Some((det, sign_q * sign_p))
    }

    /// a+_ps a+_rt a_st a_qs
    fn double_excite(
        &self,
        (p, q, r, s): (usize, usize, usize, usize),
        spin_1: Spin,
        spin_2: Spin,
    ) -> Option<(Self, f64)> {
        let (det, sign_1) = self.annihilate(q, spin_1)?;
        let (det, sign_2) = det.annihilate(s, spin_2)?;
        let (det, sign_3) = det.create(r, spin_2)?;
        let (det, sign_4) = det.create(p, spin_1)?;
        Some((det, sign_1 * sign_2 * sign_3 * sign_4))
    }
}

/// All determinants with a fixed number of alpha and beta electrons.
struct DeterminantSpace {
    norb: usize,
    alpha: Vec<u64>,
    beta: Vec<u64>,
    alpha_addresses: HashMap<u64, usize>,
    beta_addresses: HashMap<u64, usize>,
}

impl DeterminantSpace {
    fn new(norb: usize, nelec: (usize, usize)) -> Self {
        let alpha: Vec<u64> = make_strings(norb, nelec.0);
        let beta: Vec<u64> = make_strings(norb, nelec.1);
        let alpha_addresses = string_addresses(&alpha);
        let beta_addresses = string_addresses(&beta);
        DeterminantSpace {
            norb,
            alpha,
            beta,
            alpha_addresses,
            beta_addresses,
        }
    }

    fn shape(&self) -> (usize, usize) {
        (self.alpha.len(), self.beta.len())
    }

    fn address(&self, det: &Determinant) -> Option<(usize, usize)> {
        Some((
            *self.alpha_addresses.get(&det.alpha)?,
            *self.beta_addresses.get(&det.beta)?,
        ))
    }

    fn iter(&self) -> impl Iterator<Item = (usize, usize, Determinant)> + '_ {
        self.alpha.iter().enumerate().flat_map(move |(ia, alpha)| {
            self.beta.iter().enumerate().map(move |(ib, beta)| {
                (
                    ia,
                    ib,
                    Determinant {
                        alpha: *alpha,
                        beta: *beta,
                    },
                )
            })
        })
    }

    /// Calls `f` for every non-vanishing a+_ps a_qs |det>.
    fn for_each_one_body<F>(&self, det: &Determinant, mut f: F)
    where
        F: FnMut(usize, usize, Spin, (usize, usize), f64),
    {
        for spin in SPINS.iter() {
            for p in 0..self.norb {
                for q in 0..self.norb {
                    if let Some((new, sign)) = det.excite(p, q, *spin) {
                        if let Some(address) = self.address(&new) {
                            f(p, q, *spin, address, sign);
                        }
                    }
                }
            }
        }
    }

    /// Calls `f` for every non-vanishing sum_st a+_ps a+_rt a_st a_qs |det>.
    fn for_each_two_body<F>(&self, det: &Determinant, mut f: F)
    where
        F: FnMut((usize, usize, usize, usize), (usize, usize), f64),
    {
        let n: usize = self.norb;
        for spin_1 in SPINS.iter() {
            for spin_2 in SPINS.iter() {
                for p in 0..n {
                    for q in 0..n {
                        for r in 0..n {
                            for s in 0..n {
                                if let Some((new, sign)) =
                                    det.double_excite((p, q, r, s), *spin_1, *spin_2)
                                {
                                    if let Some(address) = self.address(&new) {
                                        f((p, q, r, s), address, sign);
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// H = sum_pqs h1[s, p, q] a+_ps a_qs + 1/2 sum_pqrs (pq|rs) sum_st a+_ps a+_rt a_st a_qs
    fn hamiltonian(&self, h1s: ArrayView3<f64>, eri: ArrayView4<f64>) -> Array2<f64> {
        let (_, nb) = self.shape();
        let dim: usize = self.alpha.len() * nb;
        let mut h: Array2<f64> = Array2::zeros((dim, dim));
        for (ia, ib, det) in self.iter() {
            let column: usize = ia * nb + ib;
            self.for_each_one_body(&det, |p, q, spin, (ja, jb), sign| {
                h[[ja * nb + jb, column]] += sign * h1s[[spin.index(), p, q]];
            });
            self.for_each_two_body(&det, |idx, (ja, jb), sign| {
                h[[ja * nb + jb, column]] += 0.5 * sign * eri[idx];
            });
        }
        h
    }

    /// T[I, J] = det(u[occ(J), occ(I)]) for the strings of one spin.
    fn string_rotation(strings: &[u64], u: ArrayView2<f64>) -> Result<Array2<f64>, LasError> {
        let occupations: Vec<Vec<usize>> = strings.iter().map(|s| occupied_orbitals(*s)).collect();
        let n: usize = strings.len();
        let mut t: Array2<f64> = Array2::zeros((n, n));
        for (i, occ_i) in occupations.iter().enumerate() {
            for (j, occ_j) in occupations.iter().enumerate() {
                t[[i, j]] = if occ_i.is_empty() {
                    1.0
                } else {
                    let minor: Array2<f64> =
                        Array2::from_shape_fn((occ_i.len(), occ_i.len()), |(a, b)| {
                            u[[occ_j[a], occ_i[b]]]
                        });
                    minor.det()?
                };
            }
        }
        Ok(t)
    }
}

/// Reference fragment solver that diagonalizes the Hamiltonian in the complete space of
/// determinants. It is meant for the small fragments of tests and model calculations; the
/// target irrep is not enforced.
#[derive(Debug, Clone, Default)]
pub struct DenseFciBox {}

impl DenseFciBox {
    pub fn new() -> Self {
        DenseFciBox {}
    }

    fn check_shape(ci: ArrayView2<f64>, space: &DeterminantSpace) {
        debug_assert_eq!(
            ci.dim(),
            space.shape(),
            "CI vector does not match the determinant space"
        );
    }
}

impl FragmentCiBox for DenseFciBox {
    fn kernel(
        &self,
        h1s: ArrayView3<f64>,
        eri: ArrayView4<f64>,
        norb: usize,
        target: &CiTarget,
        _ci0: Option<ArrayView2<f64>>,
    ) -> Result<CiSolution, LasError> {
        let space = DeterminantSpace::new(norb, target.nelec);
        let (na, nb) = space.shape();
        if na * nb == 0 {
            return Err(LasError::Configuration(format!(
                "{:?} electrons do not fit into {} orbitals",
                target.nelec, norb
            )));
        }
        let h: Array2<f64> = space.hamiltonian(h1s, eri);
        let (energies, vectors) = h.eigh(UPLO::Lower)?;

        let spin: f64 = (target.smult as f64 - 1.0) / 2.0;
        let target_s2: f64 = spin * (spin + 1.0);
        let mut best: (usize, f64) = (0, f64::INFINITY);
        for (root, vector) in vectors.columns().into_iter().enumerate() {
            let ci: Array2<f64> = vector
                .to_owned()
                .into_shape((na, nb))
                .expect("an owned eigenvector is contiguous");
            let deviation: f64 = (self.spin_square(ci.view(), norb, target.nelec) - target_s2).abs();
            if deviation < best.1 {
                best = (root, deviation);
            }
            if deviation < SPIN_SQUARE_TOL {
                break;
            }
        }
        if best.1 >= SPIN_SQUARE_TOL {
            debug!(
                "No root with <S^2> = {:.4} found, taking root {} with deviation {:.4e}",
                target_s2, best.0, best.1
            );
        }
        let mut ci: Array2<f64> = vectors
            .column(best.0)
            .to_owned()
            .into_shape((na, nb))
            .expect("an owned eigenvector is contiguous");
        // the largest coefficient is chosen to be positive
        let largest: f64 = ci
            .iter()
            .fold(0.0, |acc: f64, x| if x.abs() > acc.abs() { *x } else { acc });
        if largest < 0.0 {
            ci.mapv_inplace(|x| -x);
        }
        Ok(CiSolution {
            energy: energies[best.0],
            ci,
            converged: true,
        })
    }

    fn make_rdm1s(&self, ci: ArrayView2<f64>, norb: usize, nelec: (usize, usize)) -> Array3<f64> {
        let space = DeterminantSpace::new(norb, nelec);
        Self::check_shape(ci, &space);
        let mut dm1s: Array3<f64> = Array3::zeros((2, norb, norb));
        for (ia, ib, det) in space.iter() {
            let c: f64 = ci[[ia, ib]];
            if c == 0.0 {
                continue;
            }
            space.for_each_one_body(&det, |p, q, spin, address, sign| {
                dm1s[[spin.index(), p, q]] += ci[address] * sign * c;
            });
        }
        dm1s
    }

    fn make_rdm12(
        &self,
        ci: ArrayView2<f64>,
        norb: usize,
        nelec: (usize, usize),
    ) -> (Array2<f64>, Array4<f64>) {
        let space = DeterminantSpace::new(norb, nelec);
        Self::check_shape(ci, &space);
        let mut dm2: Array4<f64> = Array4::zeros((norb, norb, norb, norb));
        for (ia, ib, det) in space.iter() {
            let c: f64 = ci[[ia, ib]];
            if c == 0.0 {
                continue;
            }
            space.for_each_two_body(&det, |idx, address, sign| {
                dm2[idx] += ci[address] * sign * c;
            });
        }
        let dm1s: Array3<f64> = self.make_rdm1s(ci, norb, nelec);
        (dm1s.sum_axis(Axis(0)), dm2)
    }

    fn contract_h(
        &self,
        h1s: ArrayView3<f64>,
        eri: ArrayView4<f64>,
        ci: ArrayView2<f64>,
        norb: usize,
        nelec: (usize, usize),
    ) -> Array2<f64> {
        let space = DeterminantSpace::new(norb, nelec);
        Self::check_shape(ci, &space);
        let h: Array2<f64> = space.hamiltonian(h1s, eri);
        let vector: Array1<f64> = Array1::from_iter(ci.iter().cloned());
        h.dot(&vector)
            .into_shape(space.shape())
            .expect("a matrix-vector product is contiguous")
    }

    fn transform_ci_for_orbital_rotation(
        &self,
        ci: ArrayView2<f64>,
        norb: usize,
        nelec: (usize, usize),
        u: ArrayView2<f64>,
    ) -> Result<Array2<f64>, LasError> {
        let space = DeterminantSpace::new(norb, nelec);
        if ci.dim() != space.shape() {
            return Err(LasError::StructuralInconsistency(format!(
                "CI vector of shape {:?} cannot describe {:?} electrons in {} orbitals",
                ci.dim(),
                nelec,
                norb
            )));
        }
        let t_alpha: Array2<f64> = DeterminantSpace::string_rotation(&space.alpha, u)?;
        let t_beta: Array2<f64> = DeterminantSpace::string_rotation(&space.beta, u)?;
        Ok(t_alpha.dot(&ci).dot(&t_beta.t()))
    }

    fn spin_square(&self, ci: ArrayView2<f64>, norb: usize, nelec: (usize, usize)) -> f64 {
        let space = DeterminantSpace::new(norb, nelec);
        // <S^2> = |S+ psi|^2 + Sz (Sz + 1)
        let mut raised: HashMap<Determinant, f64> = HashMap::new();
        for (ia, ib, det) in space.iter() {
            let c: f64 = ci[[ia, ib]];
            if c == 0.0 {
                continue;
            }
            for p in 0..norb {
                let new = det
                    .annihilate(p, Spin::Beta)
                    .and_then(|(d, s1)| d.create(p, Spin::Alpha).map(|(d, s2)| (d, s1 * s2)));
                if let Some((d, sign)) = new {
                    *raised.entry(d).or_insert(0.0) += sign * c;
                }
            }
        }
        let sz: f64 = (nelec.0 as f64 - nelec.1 as f64) / 2.0;
        raised.values().map(|x| x * x).sum::<f64>() + sz * (sz + 1.0)
    }
}
