//! User-supplied force laws.

use crate::accum::ForceAccumulators;
use crate::error::ForceResult;
use crate::traits::ForceElement;
use core::any::Any;
use mb_core::Real;
use mb_matter::Matter;
use mb_state::State;

/// The part of a force element a user writes.
///
/// Same contract as `ForceElement`: forces and energy are computed from
/// the state without modifying its variables. Errors are returned to the
/// caller unchanged; wrap foreign errors with `ForceError::custom`.
pub trait CustomForce: Any + Send + Sync {
    fn calc_force(
        &self,
        state: &State,
        matter: &dyn Matter,
        forces: &mut ForceAccumulators,
    ) -> ForceResult<()>;

    fn calc_potential_energy(&self, _state: &State, _matter: &dyn Matter) -> ForceResult<Real> {
        Ok(0.0)
    }

    fn realize_topology(&self, _state: &mut State, _matter: &dyn Matter) -> ForceResult<()> {
        Ok(())
    }

    fn realize_model(&self, _state: &mut State, _matter: &dyn Matter) -> ForceResult<()> {
        Ok(())
    }

    fn realize_velocity(&self, _state: &mut State, _matter: &dyn Matter) -> ForceResult<()> {
        Ok(())
    }

    fn realize_dynamics(&self, _state: &mut State, _matter: &dyn Matter) -> ForceResult<()> {
        Ok(())
    }
}

/// Adapts a `CustomForce` into a named force element.
#[derive(Debug)]
pub struct Custom<T> {
    name: String,
    implementation: T,
}

impl<T: CustomForce> Custom<T> {
    pub fn new(name: impl Into<String>, implementation: T) -> Self {
        Self {
            name: name.into(),
            implementation,
        }
    }

    pub fn implementation(&self) -> &T {
        &self.implementation
    }

    pub fn implementation_mut(&mut self) -> &mut T {
        &mut self.implementation
    }

    pub fn into_inner(self) -> T {
        self.implementation
    }
}

impl<T: CustomForce> ForceElement for Custom<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn realize_topology(&self, state: &mut State, matter: &dyn Matter) -> ForceResult<()> {
        self.implementation.realize_topology(state, matter)
    }

    fn realize_model(&self, state: &mut State, matter: &dyn Matter) -> ForceResult<()> {
        self.implementation.realize_model(state, matter)
    }

    fn realize_velocity(&self, state: &mut State, matter: &dyn Matter) -> ForceResult<()> {
        self.implementation.realize_velocity(state, matter)
    }

    fn realize_dynamics(&self, state: &mut State, matter: &dyn Matter) -> ForceResult<()> {
        self.implementation.realize_dynamics(state, matter)
    }

    fn calc_force(&self, state: &State, matter: &dyn Matter, forces: &mut ForceAccumulators) -> ForceResult<()> {
        self.implementation.calc_force(state, matter, forces)
    }

    fn calc_potential_energy(&self, state: &State, matter: &dyn Matter) -> ForceResult<Real> {
        self.implementation.calc_potential_energy(state, matter)
    }
}
