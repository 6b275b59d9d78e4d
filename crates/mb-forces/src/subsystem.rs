//! Ownership of force elements and dispatch to them.

use crate::accum::ForceAccumulators;
use crate::common::{bind_slots, bound_slots};
use crate::error::{ForceError, ForceResult};
use crate::handle::ForceHandle;
use crate::traits::ForceElement;
use core::any::{Any, type_name};
use mb_core::{ForceId, Real};
use mb_matter::Matter;
use mb_state::{CacheTier, Stage, State};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::sync::OnceLock;

/// Owns force elements and evaluates them as a group.
///
/// Elements are adopted once and addressed by the index they were given.
/// The subsystem caches the summed forces of all elements in each state
/// while the state is realized through Dynamics.
#[derive(Default)]
pub struct ForceSubsystem {
    elements: Vec<Box<dyn ForceElement>>,
    total: OnceLock<CacheTier<ForceAccumulators>>,
}

impl ForceSubsystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of an element and return a typed handle to it.
    ///
    /// States realized before the element was adopted do not know about it
    /// and must be realized again from Topology.
    pub fn adopt<T: ForceElement>(&mut self, element: T) -> ForceHandle<T> {
        let id = ForceId::from_usize(self.elements.len());
        tracing::debug!(%id, name = element.name(), "adopted force element");
        self.elements.push(Box::new(element));
        self.total = OnceLock::new();
        ForceHandle::new(id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, id: ForceId) -> ForceResult<&dyn ForceElement> {
        self.elements
            .get(id.idx())
            .map(|e| e.as_ref())
            .ok_or(ForceError::UnknownElement { id })
    }

    pub fn iter(&self) -> impl Iterator<Item = (ForceId, &dyn ForceElement)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, e)| (ForceId::from_usize(i), e.as_ref()))
    }

    pub fn get<T: ForceElement>(&self, handle: ForceHandle<T>) -> ForceResult<&T> {
        let id = handle.id();
        let any: &dyn Any = self.element(id)?;
        any.downcast_ref::<T>().ok_or(ForceError::WrongElementType {
            id,
            expected: type_name::<T>(),
        })
    }

    /// Mutable access for parameter setters.
    ///
    /// Cached totals in states realized before this call may depend on the
    /// old parameters, so those states report `StageTooLow` from
    /// [`ForceSubsystem::total_forces`] until they are realized again from
    /// Topology.
    pub fn get_mut<T: ForceElement>(&mut self, handle: ForceHandle<T>) -> ForceResult<&mut T> {
        let id = handle.id();
        let element = self
            .elements
            .get_mut(id.idx())
            .ok_or(ForceError::UnknownElement { id })?;
        self.total = OnceLock::new();
        let any: &mut dyn Any = element.as_mut();
        any.downcast_mut::<T>().ok_or(ForceError::WrongElementType {
            id,
            expected: type_name::<T>(),
        })
    }

    /// Run every element's hook for `stage`.
    pub fn realize(&self, state: &mut State, matter: &dyn Matter, stage: Stage) -> ForceResult<()> {
        match stage {
            Stage::Topology => {
                let tier = CacheTier::allocate(state, "total forces", Stage::Dynamics);
                bind_slots(
                    &self.total,
                    tier,
                    "force subsystem cache allocated at a different index in another state",
                )?;
                for e in &self.elements {
                    e.realize_topology(state, matter)?;
                }
            }
            Stage::Model => {
                for e in &self.elements {
                    e.realize_model(state, matter)?;
                }
            }
            Stage::Velocity => {
                for e in &self.elements {
                    e.realize_velocity(state, matter)?;
                }
            }
            Stage::Dynamics => {
                for e in &self.elements {
                    e.realize_dynamics(state, matter)?;
                }
                let total = self.calc_forces(state, matter)?;
                self.total_tier(state)?.update(state, total)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Evaluate every element into fresh accumulators, one after another.
    pub fn calc_forces(&self, state: &State, matter: &dyn Matter) -> ForceResult<ForceAccumulators> {
        let mut forces = ForceAccumulators::for_matter(matter);
        for e in &self.elements {
            e.calc_force(state, matter, &mut forces)?;
        }
        Ok(forces)
    }

    /// Evaluate elements on the rayon pool, each worker into private
    /// accumulators, then sum the partial results.
    pub fn calc_forces_parallel(&self, state: &State, matter: &dyn Matter) -> ForceResult<ForceAccumulators> {
        self.elements
            .par_iter()
            .try_fold(
                || ForceAccumulators::for_matter(matter),
                |mut acc, e| {
                    e.calc_force(state, matter, &mut acc)?;
                    Ok::<_, ForceError>(acc)
                },
            )
            .try_reduce(
                || ForceAccumulators::for_matter(matter),
                |mut a, b| {
                    a.merge(&b)?;
                    Ok(a)
                },
            )
    }

    /// Sum of every element's potential energy.
    pub fn calc_potential_energy(&self, state: &State, matter: &dyn Matter) -> ForceResult<Real> {
        self.elements
            .iter()
            .try_fold(0.0, |pe, e| Ok(pe + e.calc_potential_energy(state, matter)?))
    }

    /// Forces summed while realizing Dynamics.
    pub fn total_forces<'s>(&self, state: &'s State) -> ForceResult<&'s ForceAccumulators> {
        Ok(self.total_tier(state)?.get(state)?)
    }

    fn total_tier(&self, state: &State) -> ForceResult<CacheTier<ForceAccumulators>> {
        bound_slots(&self.total, state, "force subsystem topology")
    }
}
