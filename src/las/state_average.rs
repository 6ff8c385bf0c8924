use crate::errors::LasError;
use crate::initialization::{LasSystem, StateInfo, StateManifold};
use crate::io::StateAverageConfig;
use crate::las::logging::print_states;
use ndarray::prelude::*;

impl<'a> LasSystem<'a> {
    /// New system with the orbitals of this one and the state-averaged ensemble `sa`. CI
    /// vectors of states that reappear in the new ensemble are carried over as starting
    /// vectors; all other states start without CI vectors.
    pub fn state_average(&self, sa: &StateAverageConfig) -> Result<LasSystem<'a>, LasError> {
        let states: StateManifold = StateManifold::from_config(sa, &self.fragments)?;
        let mut averaged: LasSystem<'a> = self.clone();
        averaged.ci = match &self.ci {
            Some(ci) => Some(self.states.carry_over_ci(&states, ci)?),
            None => None,
        };
        averaged.config.state_average = Some(sa.clone());
        averaged.states = states;
        averaged.properties.reset();
        print_states(&averaged);
        Ok(averaged)
    }

    /// In-place version of [state_average](LasSystem::state_average).
    pub fn state_average_(&mut self, sa: &StateAverageConfig) -> Result<(), LasError> {
        *self = self.state_average(sa)?;
        Ok(())
    }

    /// Quantum numbers of all states as (nroots, nfrags) tables.
    pub fn get_state_info(&self) -> StateInfo {
        self.states.get_state_info()
    }

    /// Weights of the states as an array.
    pub fn weights_array(&self) -> Array1<f64> {
        Array1::from(self.weights().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::tests::*;

    #[test]
    fn ci_vectors_of_matching_states_are_carried_over() {
        let molecule = get_test_molecule();
        let mut system = get_test_system(&molecule);
        system.ci = Some(system.get_init_guess_ci(molecule.mo_coeff.view(), None).unwrap());
        let averaged = system.state_average(&get_two_state_config()).unwrap();
        assert_eq!(averaged.nroots(), 2);
        let ci = averaged.ci.as_ref().unwrap();
        let old = system.ci.as_ref().unwrap();
        for frag in 0..averaged.nfrags() {
            assert_eq!(ci[frag][0], old[frag][0]);
            assert!(ci[frag][1].is_none());
        }
        // the original system is left untouched
        assert_eq!(system.nroots(), 1);
    }

    #[test]
    fn ambiguous_carry_over_is_rejected() {
        let molecule = get_test_molecule();
        let mut system = get_test_system(&molecule);
        system.ci = Some(system.get_init_guess_ci(molecule.mo_coeff.view(), None).unwrap());
        let twice = StateAverageConfig {
            weights: vec![0.5, 0.5],
            assert_no_dupes: false,
            ..Default::default()
        };
        assert!(matches!(
            system.state_average_(&twice),
            Err(LasError::Configuration(_))
        ));
        assert_eq!(system.nroots(), 1);
        let checked = StateAverageConfig {
            assert_no_dupes: true,
            ..twice
        };
        assert!(matches!(
            system.state_average(&checked),
            Err(LasError::Configuration(_))
        ));
    }

    #[test]
    fn state_information_tables() {
        let molecule = get_test_molecule();
        let mut system = get_test_system(&molecule);
        system.state_average_(&get_two_state_config()).unwrap();
        let info = system.get_state_info();
        assert_eq!(info.spins, arr2(&[[0, 0], [2, 0]]));
        assert_eq!(system.weights_array(), arr1(&[0.5, 0.5]));
        assert_eq!(system.states.wfnsym(1), 0);
    }
}
