//! The kinematics interface consumed by force elements.

use crate::error::MatterResult;
use crate::mass::MassProperties;
use mb_core::{BodyId, Real, SpatialVec, Transform, Vec3, origin};
use mb_state::{Stage, State};
use nalgebra::DVector;

/// Kinematics and mass-property provider.
///
/// Poses require the state to be realized through `Stage::Position`,
/// velocities through `Stage::Velocity`. All ground-frame quantities are
/// measured from the Ground origin; spatial velocities are taken at the
/// body origin.
///
/// Implementations are deterministic functions of the state and must be
/// safe to query from several threads at once.
pub trait Matter: Send + Sync {
    /// Number of bodies including Ground (body 0).
    fn num_bodies(&self) -> usize;

    fn num_particles(&self) -> usize;

    /// Total number of generalized speeds.
    fn num_mobilities(&self) -> usize;

    /// Number of acceleration-level constraint equations.
    fn num_acceleration_constraints(&self) -> usize;

    /// Perform this subsystem's work for `stage`. Called while the state
    /// still reports the stage before `stage`.
    fn realize(&self, state: &mut State, stage: Stage) -> MatterResult<()>;

    /// `X_GB`: pose of a body frame in Ground.
    fn body_transform(&self, state: &State, body: BodyId) -> MatterResult<Transform>;

    /// `V_GB`: spatial velocity of a body in Ground, at the body origin.
    fn body_velocity(&self, state: &State, body: BodyId) -> MatterResult<SpatialVec>;

    /// Ground-frame velocity of a body-fixed station.
    fn station_velocity_in_ground(&self, state: &State, body: BodyId, station: &Vec3) -> MatterResult<Vec3> {
        let x_gb = self.body_transform(state, body)?;
        let v_gb = self.body_velocity(state, body)?;
        Ok(v_gb.velocity_shifted(&(x_gb.rotation * station)).linear)
    }

    /// Ground-frame location of a body-fixed station.
    fn station_location_in_ground(&self, state: &State, body: BodyId, station: &Vec3) -> MatterResult<Vec3> {
        let x_gb = self.body_transform(state, body)?;
        Ok(origin(&x_gb) + x_gb.rotation * station)
    }

    fn body_mass_properties(&self, body: BodyId) -> MatterResult<MassProperties>;

    fn particle_mass(&self, particle: usize) -> MatterResult<Real>;

    fn particle_location(&self, state: &State, particle: usize) -> MatterResult<Vec3>;

    /// One generalized coordinate of a body's mobilizer.
    fn one_q(&self, state: &State, body: BodyId, which: usize) -> MatterResult<Real>;

    /// One generalized speed of a body's mobilizer.
    fn one_u(&self, state: &State, body: BodyId, which: usize) -> MatterResult<Real>;

    /// Add `force` to the mobility-force slot of one of a body's speeds.
    fn apply_one_mobility_force(
        &self,
        state: &State,
        body: BodyId,
        which: usize,
        force: Real,
        mobility_forces: &mut DVector<Real>,
    ) -> MatterResult<()>;

    /// Mass-matrix product `M v` for a vector `v` in generalized-speed space.
    fn calc_mv(&self, state: &State, v: &DVector<Real>) -> MatterResult<DVector<Real>>;
}
