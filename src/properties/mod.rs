use hashbrown::HashMap;
pub use property::Property;

mod getter;
pub mod property;
mod setter;
mod taker;

/// Cache of quantities that are derived from the current orbitals. Every entry is keyed
/// by a static name, following the scheme of the other `Property` containers.
#[derive(Debug, Clone)]
pub struct Properties {
    map: HashMap<&'static str, Property>,
}

impl Properties {
    pub fn new() -> Self {
        Properties {
            map: HashMap::new(),
        }
    }

    /// Removes everything that depends on the molecular orbitals. This has to be
    /// called whenever the orbitals are replaced.
    pub fn reset(&mut self) {
        let orbital_data = [
            "h2eff_sub",
            "veff",
            "mo_energy",
            "mo_occ",
            "e_states",
            "e_tot",
        ];
        for data_name in orbital_data.iter() {
            self.map.remove(*data_name);
        }
    }

    pub fn get(&self, name: &'static str) -> Option<&Property> {
        self.map.get(name)
    }

    /// Returns the Property without a reference and removes it from the dict
    pub fn take(&mut self, name: &'static str) -> Option<Property> {
        self.map.remove(name)
    }

    pub fn set(&mut self, name: &'static str, value: Property) {
        self.map.insert(name, value);
    }
}

impl Default for Properties {
    fn default() -> Self {
        Self::new()
    }
}
