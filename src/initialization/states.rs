use crate::errors::LasError;
use crate::fci::strings::num_strings;
use crate::fci::CiTarget;
use crate::initialization::Fragment;
use crate::io::StateAverageConfig;
use crate::las::CiVectors;
use itertools::Itertools;
use log::{info, warn};
use ndarray::prelude::*;

/// Quantum numbers of one fragment in one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuantumNumbers {
    /// charge relative to the neutral fragment
    pub charge: i32,
    /// 2 Ms = na - nb
    pub spin: i32,
    /// spin multiplicity 2S + 1
    pub smult: i32,
    pub wfnsym: i32,
}

impl QuantumNumbers {
    /// Electron counts (na, nb) of a fragment with `neutral` electrons in `norb` orbitals.
    pub fn nelec(&self, neutral: usize, norb: usize) -> Result<(usize, usize), LasError> {
        let total: i32 = neutral as i32 - self.charge;
        if total < 0 || (total + self.spin) % 2 != 0 || self.spin.abs() > total {
            return Err(LasError::Configuration(format!(
                "charge {} and spin {} cannot be realized with {} electrons",
                self.charge, self.spin, neutral
            )));
        }
        let na: usize = ((total + self.spin) / 2) as usize;
        let nb: usize = ((total - self.spin) / 2) as usize;
        if na > norb || nb > norb {
            return Err(LasError::Configuration(format!(
                "({}, {}) electrons do not fit into {} orbitals",
                na, nb, norb
            )));
        }
        if self.smult < self.spin.abs() + 1 || (self.smult - 1 - self.spin.abs()) % 2 != 0 {
            return Err(LasError::Configuration(format!(
                "multiplicity {} is incompatible with 2Ms = {}",
                self.smult, self.spin
            )));
        }
        Ok((na, nb))
    }
}

/// Quantum numbers of all states as (nroots, nfrags) tables.
#[derive(Debug, Clone, PartialEq)]
pub struct StateInfo {
    pub charges: Array2<i32>,
    pub spins: Array2<i32>,
    pub smults: Array2<i32>,
    pub wfnsyms: Array2<i32>,
}

/// Weighted ensemble of product states. Row `root` of the table holds the quantum numbers
/// of every fragment in that state.
#[derive(Debug, Clone)]
pub struct StateManifold {
    pub weights: Vec<f64>,
    pub table: Vec<Vec<QuantumNumbers>>,
    nelec: Vec<Vec<(usize, usize)>>,
}

impl StateManifold {
    /// Single state built from the reference settings of the fragments.
    pub fn single_state(fragments: &[Fragment]) -> Result<Self, LasError> {
        let row: Vec<QuantumNumbers> = fragments
            .iter()
            .map(|frag| QuantumNumbers {
                charge: 0,
                spin: frag.nelec.0 as i32 - frag.nelec.1 as i32,
                smult: frag.smult as i32,
                wfnsym: frag.wfnsym as i32,
            })
            .collect();
        Self::new(vec![1.0], vec![row], fragments)
    }

    pub fn new(
        weights: Vec<f64>,
        table: Vec<Vec<QuantumNumbers>>,
        fragments: &[Fragment],
    ) -> Result<Self, LasError> {
        if weights.is_empty() || weights.len() != table.len() {
            return Err(LasError::Configuration(format!(
                "{} weights given for {} states",
                weights.len(),
                table.len()
            )));
        }
        if weights.iter().any(|w| !(0.0..=1.0).contains(w))
            || (weights.iter().sum::<f64>() - 1.0).abs() > 1e-10
        {
            return Err(LasError::Configuration(format!(
                "the weights {:?} have to lie in [0, 1] and sum to one",
                weights
            )));
        }
        let mut nelec: Vec<Vec<(usize, usize)>> = Vec::with_capacity(table.len());
        for row in table.iter() {
            if row.len() != fragments.len() {
                return Err(LasError::Configuration(format!(
                    "a state lists {} fragments, but there are {}",
                    row.len(),
                    fragments.len()
                )));
            }
            nelec.push(
                row.iter()
                    .zip(fragments.iter())
                    .map(|(qn, frag)| qn.nelec(frag.n_elec(), frag.n_orbs))
                    .collect::<Result<Vec<(usize, usize)>, LasError>>()?,
            );
        }
        Ok(StateManifold {
            weights,
            table,
            nelec,
        })
    }

    /// Builds the manifold of a state-averaged calculation. Missing tables are filled with
    /// neutral fragments, the spin of the reference electron counts, the lowest multiplicity
    /// of that spin and the totally symmetric irrep.
    pub fn from_config(
        config: &StateAverageConfig,
        fragments: &[Fragment],
    ) -> Result<Self, LasError> {
        let nroots: usize = config.weights.len();
        let nfrags: usize = fragments.len();
        let check = |name: &str, table: &Option<Vec<Vec<i32>>>| -> Result<(), LasError> {
            match table {
                Some(rows) if rows.len() != nroots || rows.iter().any(|r| r.len() != nfrags) => {
                    Err(LasError::Configuration(format!(
                        "the {} table has to have {} rows of {} entries",
                        name, nroots, nfrags
                    )))
                }
                _ => Ok(()),
            }
        };
        check("charges", &config.charges)?;
        check("spins", &config.spins)?;
        check("smults", &config.smults)?;
        check("wfnsyms", &config.wfnsyms)?;

        let entry = |table: &Option<Vec<Vec<i32>>>, root: usize, frag: usize| -> Option<i32> {
            table.as_ref().map(|rows| rows[root][frag])
        };
        let table: Vec<Vec<QuantumNumbers>> = (0..nroots)
            .map(|root| {
                fragments
                    .iter()
                    .enumerate()
                    .map(|(f, frag)| {
                        let spin: i32 = entry(&config.spins, root, f)
                            .unwrap_or(frag.nelec.0 as i32 - frag.nelec.1 as i32);
                        QuantumNumbers {
                            charge: entry(&config.charges, root, f).unwrap_or(0),
                            spin,
                            smult: entry(&config.smults, root, f).unwrap_or(spin.abs() + 1),
                            wfnsym: entry(&config.wfnsyms, root, f).unwrap_or(0),
                        }
                    })
                    .collect()
            })
            .collect();
        let manifold = Self::new(config.weights.clone(), table, fragments)?;
        if config.assert_no_dupes {
            manifold.check_duplicates()?;
        }
        Ok(manifold)
    }

    pub fn nroots(&self) -> usize {
        self.weights.len()
    }

    pub fn nfrags(&self) -> usize {
        self.table.first().map_or(0, |row| row.len())
    }

    /// Electron counts (na, nb) of fragment `frag` in state `root`.
    pub fn nelec(&self, root: usize, frag: usize) -> (usize, usize) {
        self.nelec[root][frag]
    }

    /// Shape of the CI vector of fragment `frag` in state `root`.
    pub fn ci_shape(&self, root: usize, frag: &Fragment) -> (usize, usize) {
        let (na, nb) = self.nelec(root, frag.index);
        (num_strings(frag.n_orbs, na), num_strings(frag.n_orbs, nb))
    }

    pub fn target(&self, root: usize, frag: usize) -> CiTarget {
        let qn: &QuantumNumbers = &self.table[root][frag];
        CiTarget {
            nelec: self.nelec(root, frag),
            smult: qn.smult as usize,
            wfnsym: qn.wfnsym as usize,
        }
    }

    /// Irrep of the product state: the direct product of the fragment irreps, which is
    /// the bitwise XOR of the labels for abelian point groups.
    pub fn wfnsym(&self, root: usize) -> i32 {
        self.table[root].iter().fold(0, |acc, qn| acc ^ qn.wfnsym)
    }

    /// Groups of states that share all quantum numbers.
    pub fn duplicates(&self) -> Vec<Vec<usize>> {
        self.table
            .iter()
            .enumerate()
            .into_group_map_by(|(_, row)| (*row).clone())
            .into_values()
            .filter(|group| group.len() > 1)
            .map(|group| group.into_iter().map(|(root, _)| root).sorted().collect())
            .sorted()
            .collect()
    }

    pub fn check_duplicates(&self) -> Result<(), LasError> {
        let duplicates: Vec<Vec<usize>> = self.duplicates();
        if duplicates.is_empty() {
            return Ok(());
        }
        warn!("{:^80}", "Duplicate states specified");
        for group in duplicates.iter() {
            for root in group.iter() {
                warn!("{:>10} {:?}", root, self.table[*root]);
            }
        }
        Err(LasError::Configuration(format!(
            "duplicate states {:?}; disable the duplicate check to keep them",
            duplicates
        )))
    }

    pub fn get_state_info(&self) -> StateInfo {
        let (nroots, nfrags) = (self.nroots(), self.nfrags());
        let get = |f: fn(&QuantumNumbers) -> i32| {
            Array2::from_shape_fn((nroots, nfrags), |(root, frag)| f(&self.table[root][frag]))
        };
        StateInfo {
            charges: get(|qn| qn.charge),
            spins: get(|qn| qn.spin),
            smults: get(|qn| qn.smult),
            wfnsyms: get(|qn| qn.wfnsym),
        }
    }

    /// Distributes the CI vectors of this manifold over the states of `new`. A vector is
    /// carried over when its state matches exactly one new state.
    pub fn carry_over_ci(&self, new: &StateManifold, ci: &CiVectors) -> Result<CiVectors, LasError> {
        let nfrags: usize = new.nfrags();
        let mut carried: CiVectors = vec![vec![None; new.nroots()]; nfrags];
        for (old_root, row) in self.table.iter().enumerate() {
            let matches: Vec<usize> = new
                .table
                .iter()
                .positions(|new_row| new_row == row)
                .collect();
            match matches.len() {
                0 => {}
                1 => {
                    info!("state {} is carried over to state {}", old_root, matches[0]);
                    for frag in 0..nfrags {
                        carried[frag][matches[0]] = ci
                            .get(frag)
                            .and_then(|vectors| vectors.get(old_root))
                            .cloned()
                            .flatten();
                    }
                }
                _ => {
                    return Err(LasError::Configuration(format!(
                        "state {} matches the new states {:?}",
                        old_root, matches
                    )))
                }
            }
        }
        Ok(carried)
    }
}
