//! A matter provider and its forces, realized together.

use crate::accum::ForceAccumulators;
use crate::error::{ForceError, ForceResult};
use crate::handle::ForceHandle;
use crate::subsystem::ForceSubsystem;
use crate::traits::ForceElement;
use mb_core::Real;
use mb_matter::Matter;
use mb_state::{Stage, State, realize_through};

/// Matter plus force elements.
///
/// Each stage is realized for the matter first and then for every force
/// element, so element hooks can read the kinematics of the stage being
/// realized.
pub struct MultibodySystem<M> {
    matter: M,
    forces: ForceSubsystem,
}

impl<M: Matter> MultibodySystem<M> {
    pub fn new(matter: M) -> Self {
        Self {
            matter,
            forces: ForceSubsystem::new(),
        }
    }

    pub fn matter(&self) -> &M {
        &self.matter
    }

    /// Structural changes require states to be realized again from
    /// Topology.
    pub fn matter_mut(&mut self) -> &mut M {
        &mut self.matter
    }

    pub fn forces_subsystem(&self) -> &ForceSubsystem {
        &self.forces
    }

    pub fn adopt<T: ForceElement>(&mut self, element: T) -> ForceHandle<T> {
        self.forces.adopt(element)
    }

    pub fn get<T: ForceElement>(&self, handle: ForceHandle<T>) -> ForceResult<&T> {
        self.forces.get(handle)
    }

    pub fn get_mut<T: ForceElement>(&mut self, handle: ForceHandle<T>) -> ForceResult<&mut T> {
        self.forces.get_mut(handle)
    }

    /// A fresh state realized through Topology.
    pub fn realize_topology(&self) -> ForceResult<State> {
        let mut state = State::new();
        self.realize(&mut state, Stage::Topology)?;
        Ok(state)
    }

    /// Realize `state` through `stage`, one stage at a time.
    pub fn realize(&self, state: &mut State, stage: Stage) -> ForceResult<()> {
        realize_through::<ForceError, _>(state, stage, |s, next| {
            self.matter.realize(s, next)?;
            self.forces.realize(s, &self.matter, next)
        })
    }

    /// Total forces of every element; requires Dynamics.
    pub fn forces<'s>(&self, state: &'s State) -> ForceResult<&'s ForceAccumulators> {
        self.forces.total_forces(state)
    }

    pub fn potential_energy(&self, state: &State) -> ForceResult<Real> {
        state.require_stage(Stage::Position, "potential energy")?;
        self.forces.calc_potential_energy(state, &self.matter)
    }

    /// `½ uᵀ M u`.
    pub fn kinetic_energy(&self, state: &State) -> ForceResult<Real> {
        state.require_stage(Stage::Velocity, "kinetic energy")?;
        let mu = self.matter.calc_mv(state, state.u())?;
        Ok(0.5 * state.u().dot(&mu))
    }
}
