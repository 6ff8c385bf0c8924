use ndarray::prelude::*;
use ndarray::{Data, Zip};
use std::cmp::Ordering;
use std::ops::Range;

pub fn argsort(v: ArrayView1<f64>) -> Vec<usize> {
    let mut idx = (0..v.len()).collect::<Vec<_>>();
    idx.sort_by(|&i, &j| v[i].partial_cmp(&v[j]).unwrap_or(Ordering::Equal));
    idx
}

/// Indices that sort `v` from the largest to the smallest value.
pub fn argsort_descending(v: ArrayView1<f64>) -> Vec<usize> {
    let mut idx = (0..v.len()).collect::<Vec<_>>();
    idx.sort_by(|&i, &j| v[j].partial_cmp(&v[i]).unwrap_or(Ordering::Equal));
    idx
}

/// Number of unique pairs (i >= j) of `n` indices.
pub fn npair(n: usize) -> usize {
    n * (n + 1) / 2
}

/// Compound index of the pair (i, j) in a lower triangle that is stored row by row.
pub fn tril_index(i: usize, j: usize) -> usize {
    if i >= j {
        i * (i + 1) / 2 + j
    } else {
        j * (j + 1) / 2 + i
    }
}

/// Packs the lower triangle of a symmetric matrix.
pub fn pack_tril(a: ArrayView2<f64>) -> Array1<f64> {
    let n: usize = a.nrows();
    let mut packed: Array1<f64> = Array1::zeros(npair(n));
    for i in 0..n {
        for j in 0..=i {
            packed[tril_index(i, j)] = a[[i, j]];
        }
    }
    packed
}

pub fn unpack_tril(packed: ArrayView1<f64>, n: usize) -> Array2<f64> {
    Array2::from_shape_fn((n, n), |(i, j)| packed[tril_index(i, j)])
}

/// Block diagonal matrix assembled from square blocks.
pub fn block_diag<S: Data<Elem = f64>>(blocks: &[ArrayBase<S, Ix2>]) -> Array2<f64> {
    let dim: usize = blocks.iter().map(|b| b.nrows()).sum();
    let mut out: Array2<f64> = Array2::zeros((dim, dim));
    let mut start: usize = 0;
    for block in blocks.iter() {
        let end: usize = start + block.nrows();
        out.slice_mut(s![start..end, start..end]).assign(block);
        start = end;
    }
    out
}

/// Consecutive index ranges of blocks with the given sizes.
pub fn block_ranges(sizes: &[usize]) -> Vec<Range<usize>> {
    let mut start: usize = 0;
    sizes
        .iter()
        .map(|n| {
            let range = start..start + n;
            start += n;
            range
        })
        .collect()
}

/// Outer product of two matrices: out[p, q, r, s] = a[p, q] * b[r, s]
pub fn outer_2d(a: ArrayView2<f64>, b: ArrayView2<f64>) -> Array4<f64> {
    let (n0, n1) = a.dim();
    let (n2, n3) = b.dim();
    Array4::from_shape_fn((n0, n1, n2, n3), |(p, q, r, s)| a[[p, q]] * b[[r, s]])
}

/// Exchange-type product: out[p, q, r, s] = a[p, s] * b[r, q]
pub fn outer_2d_exchange(a: ArrayView2<f64>, b: ArrayView2<f64>) -> Array4<f64> {
    let (n0, n3) = a.dim();
    let (n2, n1) = b.dim();
    Array4::from_shape_fn((n0, n1, n2, n3), |(p, q, r, s)| a[[p, s]] * b[[r, q]])
}

/// Full contraction of two arrays of the same shape.
pub fn contract_all<S1, S2, D>(a: &ArrayBase<S1, D>, b: &ArrayBase<S2, D>) -> f64
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    D: Dimension,
{
    Zip::from(a).and(b).fold(0.0, |acc, x, y| acc + x * y)
}

/// Flattens a four index array into a matrix. The first `split` axes form the rows.
/// The elements are copied in logical order, so permuted views are handled correctly.
pub fn to_matrix(a: ArrayView4<f64>, split: usize) -> Array2<f64> {
    let shape = a.shape();
    let rows: usize = shape[..split].iter().product();
    let cols: usize = shape[split..].iter().product();
    Array2::from_shape_vec((rows, cols), a.iter().cloned().collect())
        .expect("the row and column counts multiply to the element count")
}

/// Inverse of [to_matrix] for a matrix that holds a four index array in row-major order.
pub fn from_matrix(a: ArrayView2<f64>, shape: (usize, usize, usize, usize)) -> Array4<f64> {
    Array4::from_shape_vec(shape, a.iter().cloned().collect())
        .expect("the four-index shape holds as many elements as the matrix")
}

/// Transforms one axis of a four index array: out[.., p, ..] = sum_m u[m, p] a[.., m, ..]
pub fn transform_axis(a: ArrayView4<f64>, axis: usize, u: ArrayView2<f64>) -> Array4<f64> {
    // move the transformed axis to the front
    let mut order: Vec<usize> = vec![axis];
    order.extend((0..4).filter(|ax| *ax != axis));
    let moved = a.permuted_axes([order[0], order[1], order[2], order[3]]);
    let dims = moved.dim();
    let transformed: Array2<f64> = u.t().dot(&to_matrix(moved, 1));
    let result: Array4<f64> = from_matrix(transformed.view(), (u.ncols(), dims.1, dims.2, dims.3));
    // and back to its original position
    let mut inverse: [usize; 4] = [0; 4];
    for (new_position, old_axis) in order.iter().enumerate() {
        inverse[*old_axis] = new_position;
    }
    result
        .permuted_axes(inverse)
        .as_standard_layout()
        .into_owned()
}

/// Coulomb-type contraction: j[p, q] = sum_rs eri[p, q, r, s] dm[r, s]
pub fn contract_coulomb(eri: ArrayView4<f64>, dm: ArrayView2<f64>) -> Array2<f64> {
    let (n0, n1, _, _) = eri.dim();
    let dm_vec: Array1<f64> = Array1::from_iter(dm.iter().cloned());
    to_matrix(eri, 2)
        .dot(&dm_vec)
        .into_shape((n0, n1))
        .expect("a matrix-vector product is contiguous")
}

/// Exchange-type contraction: k[p, q] = sum_rs eri[p, s, r, q] dm[r, s]
pub fn contract_exchange(eri: ArrayView4<f64>, dm: ArrayView2<f64>) -> Array2<f64> {
    contract_coulomb(eri.permuted_axes([0, 3, 2, 1]), dm)
}

/// Contraction over the last three indices: out[p, x] = sum_bcd a[p, b, c, d] b[x, b, c, d]
pub fn contract_last3(a: ArrayView4<f64>, b: ArrayView4<f64>) -> Array2<f64> {
    to_matrix(a, 1).dot(&to_matrix(b, 1).t())
}

/// Frobenius norm of an arbitrary array.
pub fn frobenius_norm<S: Data<Elem = f64>, D: Dimension>(a: &ArrayBase<S, D>) -> f64 {
    a.iter().map(|x| x * x).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::AbsDiffEq;

    pub const EPSILON: f64 = 1e-14;

    #[test]
    fn packed_triangle_restores_symmetric_matrix() {
        let a: Array2<f64> = arr2(&[[1.0, 2.0, 4.0], [2.0, 3.0, 5.0], [4.0, 5.0, 6.0]]);
        let packed = pack_tril(a.view());
        assert_eq!(packed, arr1(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        assert_eq!(unpack_tril(packed.view(), 3), a);
    }

    #[test]
    fn transform_axis_matches_explicit_sum() {
        let a: Array4<f64> =
            Array4::from_shape_fn((2, 3, 2, 2), |(p, q, r, s)| (p + 2 * q + 3 * r + 5 * s) as f64);
        let u: Array2<f64> = arr2(&[[0.5, -1.0], [2.0, 0.25], [1.0, 1.5]]);
        let out = transform_axis(a.view(), 1, u.view());
        assert_eq!(out.dim(), (2, 2, 2, 2));
        let reference: Array4<f64> = Array4::from_shape_fn((2, 2, 2, 2), |(p, x, r, s)| {
            (0..3).map(|q| u[[q, x]] * a[[p, q, r, s]]).sum()
        });
        assert!(out.abs_diff_eq(&reference, EPSILON));
    }

    #[test]
    fn exchange_contraction_permutes_indices() {
        let eri: Array4<f64> =
            Array4::from_shape_fn((2, 2, 2, 2), |(p, q, r, s)| (1 + p + 3 * q + 7 * r + 11 * s) as f64);
        let dm: Array2<f64> = arr2(&[[1.0, 0.5], [-0.5, 2.0]]);
        let k = contract_exchange(eri.view(), dm.view());
        let reference: Array2<f64> = Array2::from_shape_fn((2, 2), |(p, q)| {
            let mut acc = 0.0;
            for r in 0..2 {
                for s in 0..2 {
                    acc += eri[[p, s, r, q]] * dm[[r, s]];
                }
            }
            acc
        });
        assert!(k.abs_diff_eq(&reference, EPSILON));
    }

    #[test]
    fn block_diagonal_assembly() {
        let a: Array2<f64> = Array2::eye(2);
        let b: Array2<f64> = arr2(&[[3.0]]);
        let m = block_diag(&[a.view(), b.view()]);
        assert_eq!(m.dim(), (3, 3));
        assert_eq!(m[[2, 2]], 3.0);
        assert_eq!(m[[0, 2]], 0.0);
        assert_eq!(block_ranges(&[2, 1]), vec![0..2, 2..3]);
    }
}
