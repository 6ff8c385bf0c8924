use crate::fci::{DenseFciBox, FragmentCiBox};
use std::ops::Range;
use std::sync::Arc;

/// A fragment owns a contiguous block of the active orbitals and its own CI problem.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub index: usize,
    pub n_orbs: usize,
    /// (alpha, beta) electrons of the reference state of the fragment
    pub nelec: (usize, usize),
    pub smult: usize,
    pub wfnsym: usize,
    /// position of the first orbital relative to the start of the active space
    pub offset: usize,
    pub cibox: Arc<dyn FragmentCiBox>,
}

impl Fragment {
    pub fn new(index: usize, n_orbs: usize, nelec: (usize, usize), offset: usize) -> Self {
        let smult: usize = nelec.0.abs_diff(nelec.1) + 1;
        Fragment {
            index,
            n_orbs,
            nelec,
            smult,
            wfnsym: 0,
            offset,
            cibox: Arc::new(DenseFciBox::new()),
        }
    }

    /// Active orbitals of the fragment, counted from the first active orbital.
    pub fn cas_range(&self) -> Range<usize> {
        self.offset..self.offset + self.n_orbs
    }

    /// Orbitals of the fragment in the full list of molecular orbitals.
    pub fn mo_range(&self, ncore: usize) -> Range<usize> {
        ncore + self.offset..ncore + self.offset + self.n_orbs
    }

    /// Number of electrons of the neutral fragment.
    pub fn n_elec(&self) -> usize {
        self.nelec.0 + self.nelec.1
    }
}
