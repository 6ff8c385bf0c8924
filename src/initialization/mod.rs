pub use fragment::Fragment;
pub use states::{QuantumNumbers, StateInfo, StateManifold};
pub use symmetry::{eig_by_symmetry, SymmetryLabeler};
pub use system::*;

mod fragment;
mod input_check;
mod states;
mod symmetry;
pub mod system;
