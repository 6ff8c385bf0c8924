use crate::defaults::{CONV_TOL_GRAD, CONV_TOL_SELF, MAX_CYCLE_MACRO};
use crate::errors::LasError;
use crate::fci::strings::num_strings;
use crate::fci::{CiTarget, FragmentCiBox};
use crate::las::rdm::assemble_casdm2;
use crate::utils::{
    block_diag, block_ranges, contract_all, contract_coulomb, contract_exchange, frobenius_norm,
};
use log::trace;
use ndarray::prelude::*;
use std::ops::Range;

/// Result of the product-state iterations for one state.
#[derive(Debug, Clone)]
pub struct ProductState {
    /// energy of the active space, core contributions excluded
    pub energy: f64,
    pub ci: Vec<Array2<f64>>,
    pub converged: bool,
    pub n_iter: usize,
}

/// Solves the fragment CI problems of one product state self-consistently. Every fragment
/// sees the Coulomb and exchange field of the current densities of all other fragments.
pub struct ProductStateSolver<'a> {
    pub boxes: Vec<&'a dyn FragmentCiBox>,
    pub norbs: Vec<usize>,
    pub targets: Vec<CiTarget>,
    pub conv_tol_grad: f64,
    pub conv_tol_self: f64,
    pub max_cycle: usize,
    ranges: Vec<Range<usize>>,
}

impl<'a> ProductStateSolver<'a> {
    pub fn new(boxes: Vec<&'a dyn FragmentCiBox>, norbs: Vec<usize>, targets: Vec<CiTarget>) -> Self {
        let ranges = block_ranges(&norbs);
        ProductStateSolver {
            boxes,
            norbs,
            targets,
            conv_tol_grad: CONV_TOL_GRAD,
            conv_tol_self: CONV_TOL_SELF,
            max_cycle: MAX_CYCLE_MACRO,
            ranges,
        }
    }

    pub fn with_convergence(mut self, conv_tol_grad: f64, conv_tol_self: f64, max_cycle: usize) -> Self {
        self.conv_tol_grad = conv_tol_grad;
        self.conv_tol_self = conv_tol_self;
        self.max_cycle = max_cycle;
        self
    }

    fn ci_shape(&self, frag: usize) -> (usize, usize) {
        let n: usize = self.norbs[frag];
        let (na, nb) = self.targets[frag].nelec;
        (num_strings(n, na), num_strings(n, nb))
    }

    fn fragment_eri(&self, frag: usize, eri: ArrayView4<f64>) -> Array4<f64> {
        let r = self.ranges[frag].clone();
        eri.slice(s![r.clone(), r.clone(), r.clone(), r]).to_owned()
    }

    /// Spin-separated one-electron operator of fragment `frag` in the field of the others.
    pub fn fragment_h1(
        &self,
        frag: usize,
        h1: ArrayView2<f64>,
        eri: ArrayView4<f64>,
        dm1s: &[Array3<f64>],
    ) -> Array3<f64> {
        let ri = self.ranges[frag].clone();
        let n: usize = self.norbs[frag];
        let mut h1s: Array3<f64> = Array3::zeros((2, n, n));
        for mut h in h1s.outer_iter_mut() {
            h.assign(&h1.slice(s![ri.clone(), ri.clone()]));
        }
        for (other, rj) in self.ranges.iter().enumerate() {
            if other == frag {
                continue;
            }
            let dm: &Array3<f64> = &dm1s[other];
            let dm_total: Array2<f64> = dm.sum_axis(Axis(0));
            let vj: Array2<f64> = contract_coulomb(
                eri.slice(s![ri.clone(), ri.clone(), rj.clone(), rj.clone()]),
                dm_total.view(),
            );
            for (spin, mut h) in h1s.outer_iter_mut().enumerate() {
                let vk: Array2<f64> = contract_exchange(
                    eri.slice(s![ri.clone(), rj.clone(), rj.clone(), ri.clone()]),
                    dm.slice(s![spin, .., ..]),
                );
                h += &(&vj - &vk);
            }
        }
        h1s
    }

    /// Energy of the product state within the active space.
    pub fn energy(&self, h1: ArrayView2<f64>, eri: ArrayView4<f64>, ci: &[Array2<f64>]) -> f64 {
        let mut dm1s: Vec<Array3<f64>> = Vec::with_capacity(ci.len());
        let mut dm2: Vec<Array4<f64>> = Vec::with_capacity(ci.len());
        for (frag, c) in ci.iter().enumerate() {
            let nelec = self.targets[frag].nelec;
            dm1s.push(self.boxes[frag].make_rdm1s(c.view(), self.norbs[frag], nelec));
            dm2.push(self.boxes[frag].make_rdm12(c.view(), self.norbs[frag], nelec).1);
        }
        let casdm1: Array2<f64> = block_diag(
            &dm1s
                .iter()
                .map(|dm| dm.sum_axis(Axis(0)))
                .collect::<Vec<Array2<f64>>>(),
        );
        let casdm2: Array4<f64> = assemble_casdm2(&self.ranges, &dm1s, &dm2);
        contract_all(&h1, &casdm1) + 0.5 * contract_all(&eri, &casdm2)
    }

    /// Norms of the CI gradients 2 (H c - c <c|H|c>) of all fragments.
    pub fn residuals(&self, h1: ArrayView2<f64>, eri: ArrayView4<f64>, ci: &[Array2<f64>]) -> Vec<f64> {
        let dm1s: Vec<Array3<f64>> = self.fragment_dm1s(ci);
        (0..ci.len())
            .map(|frag| {
                let h1s: Array3<f64> = self.fragment_h1(frag, h1, eri, &dm1s);
                let eri_sub: Array4<f64> = self.fragment_eri(frag, eri);
                let hc: Array2<f64> = self.boxes[frag].contract_h(
                    h1s.view(),
                    eri_sub.view(),
                    ci[frag].view(),
                    self.norbs[frag],
                    self.targets[frag].nelec,
                );
                let chc: f64 = contract_all(&ci[frag], &hc);
                frobenius_norm(&((&hc - &(&ci[frag] * chc)) * 2.0))
            })
            .collect()
    }

    fn fragment_dm1s(&self, ci: &[Array2<f64>]) -> Vec<Array3<f64>> {
        ci.iter()
            .enumerate()
            .map(|(frag, c)| {
                self.boxes[frag].make_rdm1s(c.view(), self.norbs[frag], self.targets[frag].nelec)
            })
            .collect()
    }

    /// Runs the product-state iterations from the starting vectors `ci0`. Missing starting
    /// vectors, or vectors of the wrong shape, are replaced by the initial guess of the
    /// fragment solver in the bare one-electron field.
    pub fn kernel(
        &self,
        h1: ArrayView2<f64>,
        eri: ArrayView4<f64>,
        ci0: Vec<Option<Array2<f64>>>,
    ) -> Result<ProductState, LasError> {
        let nfrags: usize = self.boxes.len();
        let eri_sub: Vec<Array4<f64>> = (0..nfrags).map(|f| self.fragment_eri(f, eri)).collect();
        let mut ci: Vec<Array2<f64>> = Vec::with_capacity(nfrags);
        for (frag, guess) in ci0.into_iter().enumerate() {
            match guess {
                Some(c) if c.dim() == self.ci_shape(frag) => ci.push(c),
                _ => {
                    let r = self.ranges[frag].clone();
                    let h1_block = h1.slice(s![r.clone(), r]);
                    let h1s: Array3<f64> = ndarray::stack![Axis(0), h1_block, h1_block];
                    ci.push(self.boxes[frag].init_guess(
                        h1s.view(),
                        eri_sub[frag].view(),
                        self.norbs[frag],
                        &self.targets[frag],
                    )?);
                }
            }
        }
        let mut dm1s: Vec<Array3<f64>> = self.fragment_dm1s(&ci);
        let mut e_last: f64 = self.energy(h1, eri, &ci);
        let mut converged: bool = false;
        let mut n_iter: usize = 0;
        let mut energy: f64 = e_last;

        for iter in 0..self.max_cycle {
            n_iter = iter + 1;
            for frag in 0..nfrags {
                let h1s: Array3<f64> = self.fragment_h1(frag, h1, eri, &dm1s);
                let solution = self.boxes[frag].kernel(
                    h1s.view(),
                    eri_sub[frag].view(),
                    self.norbs[frag],
                    &self.targets[frag],
                    Some(ci[frag].view()),
                )?;
                dm1s[frag] = self.boxes[frag].make_rdm1s(
                    solution.ci.view(),
                    self.norbs[frag],
                    self.targets[frag].nelec,
                );
                ci[frag] = solution.ci;
            }
            energy = self.energy(h1, eri, &ci);
            let grad: f64 = self
                .residuals(h1, eri, &ci)
                .into_iter()
                .fold(0.0, f64::max);
            trace!(
                "product state iteration {:>3}: E = {:>18.12}  dE = {:>10.3e}  |g| = {:>10.3e}",
                n_iter,
                energy,
                energy - e_last,
                grad
            );
            if (energy - e_last).abs() < self.conv_tol_self && grad < self.conv_tol_grad {
                converged = true;
                break;
            }
            e_last = energy;
        }
        Ok(ProductState {
            energy,
            ci,
            converged,
            n_iter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fci::DenseFciBox;
    use crate::utils::tests::*;
    use approx::AbsDiffEq;

    fn two_fragment_solver(cibox: &DenseFciBox) -> ProductStateSolver<'_> {
        let target = CiTarget {
            nelec: (1, 1),
            smult: 1,
            wfnsym: 0,
        };
        let boxes: Vec<&dyn FragmentCiBox> = vec![cibox, cibox];
        ProductStateSolver::new(boxes, vec![2, 2], vec![target, target])
            .with_convergence(1e-9, 1e-12, 200)
    }

    #[test]
    fn product_state_converges_to_stationary_point() {
        let (h1, eri) = random_active_hamiltonian(4, 41);
        let cibox = DenseFciBox::new();
        let solver = two_fragment_solver(&cibox);
        let state = solver.kernel(h1.view(), eri.view(), vec![None, None]).unwrap();
        assert!(state.converged);
        for norm in solver.residuals(h1.view(), eri.view(), &state.ci) {
            assert!(norm < 1e-8, "residual {}", norm);
        }
        assert!(state
            .energy
            .abs_diff_eq(&solver.energy(h1.view(), eri.view(), &state.ci), 1e-12));
    }

    #[test]
    fn product_state_energy_is_variational() {
        let (h1, eri) = random_active_hamiltonian(4, 43);
        let cibox = DenseFciBox::new();
        let solver = two_fragment_solver(&cibox);
        let state = solver.kernel(h1.view(), eri.view(), vec![None, None]).unwrap();
        // a product of unrelaxed fragment ground states cannot be lower in energy
        let guess = two_fragment_solver(&cibox)
            .with_convergence(1e-9, 1e-12, 0)
            .kernel(h1.view(), eri.view(), vec![None, None])
            .unwrap();
        assert!(state.energy <= guess.energy + 1e-12);
    }
}
