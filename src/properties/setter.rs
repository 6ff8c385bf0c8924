use crate::integrals::H2Eff;
use crate::properties::property::Property;
use crate::properties::Properties;
use ndarray::prelude::*;

impl Properties {
    pub fn set_h2eff_sub(&mut self, h2eff: H2Eff) {
        self.set("h2eff_sub", Property::H2Eff(h2eff))
    }

    pub fn set_veff(&mut self, veff: Array3<f64>) {
        self.set("veff", Property::Array3(veff))
    }

    pub fn set_mo_energy(&mut self, mo_energy: Array1<f64>) {
        self.set("mo_energy", Property::Array1(mo_energy))
    }

    pub fn set_mo_occ(&mut self, mo_occ: Array1<f64>) {
        self.set("mo_occ", Property::Array1(mo_occ))
    }

    pub fn set_e_states(&mut self, e_states: Array1<f64>) {
        self.set("e_states", Property::Array1(e_states))
    }

    pub fn set_e_tot(&mut self, e_tot: f64) {
        self.set("e_tot", Property::Double(e_tot))
    }

    pub fn set_orbsym(&mut self, orbsym: Vec<usize>) {
        self.set("orbsym", Property::VecUsize(orbsym))
    }

    pub fn set_converged(&mut self, converged: bool) {
        self.set("converged", Property::Bool(converged))
    }
}
