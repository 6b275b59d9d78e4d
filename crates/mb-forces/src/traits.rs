//! The force element capability set.

use crate::accum::ForceAccumulators;
use crate::error::ForceResult;
use core::any::Any;
use mb_core::Real;
use mb_matter::Matter;
use mb_state::State;

/// A pluggable source of forces.
///
/// Elements are deterministic functions of the state and their parameters.
/// They may memoize intermediate results in cache entries of the state, but
/// never modify its variables while computing forces or energy, so a single
/// element can be evaluated against several states from several threads.
///
/// The realization hooks run once per stage while the state is realized.
/// Hooks receive the state before it reports the stage being realized.
pub trait ForceElement: Any + Send + Sync {
    /// Element name for debugging and identification.
    fn name(&self) -> &str;

    /// Allocate per-state resources (discrete variables, cache entries).
    fn realize_topology(&self, _state: &mut State, _matter: &dyn Matter) -> ForceResult<()> {
        Ok(())
    }

    /// Allocate resources whose size depends on model-stage variables.
    fn realize_model(&self, _state: &mut State, _matter: &dyn Matter) -> ForceResult<()> {
        Ok(())
    }

    /// Precompute velocity-dependent quantities.
    fn realize_velocity(&self, _state: &mut State, _matter: &dyn Matter) -> ForceResult<()> {
        Ok(())
    }

    /// Compute auxiliary state derivatives.
    fn realize_dynamics(&self, _state: &mut State, _matter: &dyn Matter) -> ForceResult<()> {
        Ok(())
    }

    /// Add this element's contribution to the accumulators.
    ///
    /// Requires the state to be realized through Velocity.
    fn calc_force(
        &self,
        state: &State,
        matter: &dyn Matter,
        forces: &mut ForceAccumulators,
    ) -> ForceResult<()>;

    /// Potential energy stored in this element. Non-conservative elements
    /// return exactly zero.
    ///
    /// Requires the state to be realized through Position.
    fn calc_potential_energy(&self, _state: &State, _matter: &dyn Matter) -> ForceResult<Real> {
        Ok(0.0)
    }
}
