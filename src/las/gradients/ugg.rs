use crate::errors::LasError;
use crate::initialization::LasSystem;
use crate::las::CiVectors;
use ndarray::prelude::*;

/// Bookkeeping of the independent variables of a LAS wave function: the non-redundant orbital
/// rotations (lower triangle, between core, each fragment and the external orbitals) followed
/// by the CI coefficients of every fragment and state.
#[derive(Debug, Clone)]
pub struct UnitaryGroupGenerators {
    pub nmo: usize,
    /// mask[p, q] is true for p > q if the rotation between p and q changes the energy
    pub mask: Array2<bool>,
    /// number of CI coefficients per fragment and state
    pub ci_sizes: Vec<Vec<usize>>,
}

impl UnitaryGroupGenerators {
    pub fn new(system: &LasSystem, ci: &CiVectors) -> Self {
        // block label of every orbital: 0 core, 1..=nfrags fragments, nfrags + 1 external
        let mut block: Vec<usize> = vec![0; system.n_core];
        for frag in system.fragments.iter() {
            block.extend(std::iter::repeat(frag.index + 1).take(frag.n_orbs));
        }
        block.resize(system.n_mo, system.nfrags() + 1);
        let mask: Array2<bool> =
            Array2::from_shape_fn((system.n_mo, system.n_mo), |(p, q)| p > q && block[p] != block[q]);
        let ci_sizes: Vec<Vec<usize>> = ci
            .iter()
            .map(|vectors| {
                vectors
                    .iter()
                    .map(|c| c.as_ref().map_or(0, |c| c.len()))
                    .collect()
            })
            .collect();
        UnitaryGroupGenerators {
            nmo: system.n_mo,
            mask,
            ci_sizes,
        }
    }

    pub fn nvar_orb(&self) -> usize {
        self.mask.iter().filter(|m| **m).count()
    }

    pub fn nvar_ci(&self) -> usize {
        self.ci_sizes.iter().flatten().sum()
    }

    pub fn nvar_tot(&self) -> usize {
        self.nvar_orb() + self.nvar_ci()
    }

    /// Packs the non-redundant lower triangle of `kappa` and the flattened CI arrays into
    /// one vector.
    pub fn pack(&self, kappa: ArrayView2<f64>, ci: &CiVectors) -> Result<Array1<f64>, LasError> {
        let mut x: Vec<f64> = Vec::with_capacity(self.nvar_tot());
        x.extend(self.pack_orb(kappa).iter());
        for (sizes, vectors) in self.ci_sizes.iter().zip(ci.iter()) {
            for (size, c) in sizes.iter().zip(vectors.iter()) {
                match c {
                    Some(c) if c.len() == *size => x.extend(c.iter().cloned()),
                    None if *size == 0 => {}
                    _ => {
                        return Err(LasError::StructuralInconsistency(String::from(
                            "CI arrays do not match the variables of the wave function",
                        )))
                    }
                }
            }
        }
        Ok(Array1::from(x))
    }

    /// Non-redundant lower triangle of an (nmo, nmo) matrix.
    pub fn pack_orb(&self, kappa: ArrayView2<f64>) -> Array1<f64> {
        self.mask
            .iter()
            .zip(kappa.iter())
            .filter(|(m, _)| **m)
            .map(|(_, k)| *k)
            .collect()
    }

    /// Antisymmetric rotation generator from the orbital part of `x`.
    pub fn unpack_orb(&self, x: ArrayView1<f64>) -> Array2<f64> {
        let mut kappa: Array2<f64> = Array2::zeros((self.nmo, self.nmo));
        let mut values = x.iter();
        for ((p, q), m) in self.mask.indexed_iter() {
            if *m {
                if let Some(value) = values.next() {
                    kappa[[p, q]] = *value;
                    kappa[[q, p]] = -*value;
                }
            }
        }
        kappa
    }

    /// Splits `x` into the rotation generator and the CI arrays with the shapes of `ci`.
    pub fn unpack(
        &self,
        x: ArrayView1<f64>,
        ci: &CiVectors,
    ) -> Result<(Array2<f64>, CiVectors), LasError> {
        if x.len() != self.nvar_tot() {
            return Err(LasError::StructuralInconsistency(format!(
                "{} variables given for a wave function with {}",
                x.len(),
                self.nvar_tot()
            )));
        }
        let kappa: Array2<f64> = self.unpack_orb(x.slice(s![..self.nvar_orb()]));
        let mut offset: usize = self.nvar_orb();
        let mut ci_out: CiVectors = Vec::with_capacity(ci.len());
        for vectors in ci.iter() {
            let mut frag_out: Vec<Option<Array2<f64>>> = Vec::with_capacity(vectors.len());
            for c in vectors.iter() {
                frag_out.push(match c {
                    Some(c) => {
                        let values: Array1<f64> =
                            x.slice(s![offset..offset + c.len()]).to_owned();
                        offset += c.len();
                        Some(values.into_shape(c.raw_dim()).map_err(|err| {
                            LasError::StructuralInconsistency(err.to_string())
                        })?)
                    }
                    None => None,
                });
            }
            ci_out.push(frag_out);
        }
        Ok((kappa, ci_out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::tests::*;

    #[test]
    fn redundant_rotations_are_excluded() {
        let molecule = get_test_molecule();
        let system = get_test_system(&molecule);
        let ci = system.get_init_guess_ci(molecule.mo_coeff.view(), None).unwrap();
        let ugg = UnitaryGroupGenerators::new(&system, &ci);
        // 8 orbitals: 1 core, 2 + 2 active, 3 external
        assert_eq!(ugg.nvar_orb(), 28 - 1 - 1 - 3);
        assert!(ugg.mask[[1, 0]]);
        assert!(!ugg.mask[[2, 1]]);
        assert!(ugg.mask[[3, 2]]);
        assert!(!ugg.mask[[7, 6]]);
        assert_eq!(ugg.nvar_ci(), 8);
    }

    #[test]
    fn packing_of_rotations_and_ci_arrays() {
        let molecule = get_test_molecule();
        let system = get_two_state_system(&molecule);
        let ci = system.get_init_guess_ci(molecule.mo_coeff.view(), None).unwrap();
        let ugg = UnitaryGroupGenerators::new(&system, &ci);
        let x: Array1<f64> = Array1::linspace(0.1, 1.0, ugg.nvar_tot());
        let (kappa, ci_x) = ugg.unpack(x.view(), &ci).unwrap();
        assert!((&kappa + &kappa.t()).iter().all(|k| *k == 0.0));
        assert_eq!(ugg.pack(kappa.view(), &ci_x).unwrap(), x);
        assert!(ugg.unpack(x.slice(s![1..]), &ci).is_err());
    }
}
