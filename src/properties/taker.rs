use crate::integrals::H2Eff;
use crate::properties::property::Property;
use crate::properties::Properties;
use ndarray::prelude::*;

impl Properties {
    /// Takes the cached (p u|v w) integrals
    pub fn take_h2eff_sub(&mut self) -> Result<H2Eff, Property> {
        match self.take("h2eff_sub") {
            Some(value) => value.into_h2_eff(),
            _ => Err(Property::default()),
        }
    }

    /// Takes the spin-separated effective potential
    pub fn take_veff(&mut self) -> Result<Array3<f64>, Property> {
        match self.take("veff") {
            Some(value) => value.into_array3(),
            _ => Err(Property::default()),
        }
    }
}
