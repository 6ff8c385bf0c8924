use crate::errors::LasError;
use crate::utils::argsort;
use itertools::Itertools;
use ndarray::prelude::*;
use ndarray_linalg::{Eigh, UPLO};

/// Assigns point-group irreps to molecular orbitals.
pub trait SymmetryLabeler: Send + Sync {
    fn label_orbitals(&self, mo_coeff: ArrayView2<f64>, ovlp: ArrayView2<f64>) -> Vec<usize>;
}

/// Diagonalizes a symmetric matrix without mixing orbitals of different irreps. Without
/// labels this is a plain eigendecomposition. The eigenvalues are returned in ascending
/// order together with the irrep of every eigenvector.
pub fn eig_by_symmetry(
    h: ArrayView2<f64>,
    orbsym: Option<&[usize]>,
) -> Result<(Array1<f64>, Array2<f64>, Option<Vec<usize>>), LasError> {
    let n: usize = h.nrows();
    let labels: &[usize] = match orbsym {
        Some(labels) => labels,
        None => {
            let (e, c) = h.eigh(UPLO::Lower)?;
            return Ok((e, c, None));
        }
    };
    let mut energies: Array1<f64> = Array1::zeros(n);
    let mut vectors: Array2<f64> = Array2::zeros((n, n));
    let mut irreps: Vec<usize> = vec![0; n];
    let mut column: usize = 0;
    for irrep in labels.iter().unique() {
        let idx: Vec<usize> = labels.iter().positions(|l| l == irrep).collect();
        let block: Array2<f64> = h.select(Axis(0), &idx).select(Axis(1), &idx);
        let (e, c) = block.eigh(UPLO::Lower)?;
        for k in 0..idx.len() {
            energies[column] = e[k];
            for (row, i) in idx.iter().enumerate() {
                vectors[[*i, column]] = c[[row, k]];
            }
            irreps[column] = *irrep;
            column += 1;
        }
    }
    let order: Vec<usize> = argsort(energies.view());
    Ok((
        energies.select(Axis(0), &order),
        vectors.select(Axis(1), &order),
        Some(order.iter().map(|k| irreps[*k]).collect()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::AbsDiffEq;

    #[test]
    fn symmetry_blocks_are_not_mixed() {
        let h: Array2<f64> = arr2(&[
            [1.0, 0.0, 0.3],
            [0.0, -2.0, 0.0],
            [0.3, 0.0, 0.5],
        ]);
        let labels: Vec<usize> = vec![0, 1, 0];
        let (e, c, irreps) = eig_by_symmetry(h.view(), Some(&labels)).unwrap();
        let (e_ref, _) = h.eigh(UPLO::Lower).unwrap();
        assert!(e.abs_diff_eq(&e_ref, 1e-12));
        assert_eq!(irreps, Some(vec![1, 0, 0]));
        assert!(c[[1, 0]].abs().abs_diff_eq(&1.0, 1e-12));
        assert_eq!(c[[0, 0]], 0.0);
    }
}
