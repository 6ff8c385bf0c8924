use crate::integrals::H2Eff;
use enum_as_inner::EnumAsInner;
use ndarray::prelude::*;

/// A `Property` is a piece of data that can be cached on a LAS system.
/// The functionality of the `Property` enum is expanded by the use of the `EnumAsInner` macro.
/// This allows to get direct access to the inner values of the enum without doing
/// case matching, e.g. with `as_array1()` or `into_h2_eff()`.
#[derive(Debug, Clone, EnumAsInner)]
pub enum Property {
    /// Boolean property
    Bool(bool),
    /// Floating point property
    Double(f64),
    /// Vector property of usize type
    VecUsize(Vec<usize>),
    /// Arraybase<f64, Ix1> property
    Array1(Array1<f64>),
    /// Arraybase<f64, Ix3> property
    Array3(Array3<f64>),
    /// Packed (p u|v w) integrals of the current orbitals
    H2Eff(H2Eff),
}

impl Default for Property {
    fn default() -> Self {
        Property::Bool(false)
    }
}
