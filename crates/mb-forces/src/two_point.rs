//! Forces acting along the line between two body-fixed stations.
//!
//! Each element applies equal and opposite forces at the two stations, so
//! the pair exerts no net force and no net moment. Coincident stations have
//! no line of action and are reported as degenerate geometry.

use crate::accum::ForceAccumulators;
use crate::common::StationPair;
use crate::error::ForceResult;
use crate::traits::ForceElement;
use mb_core::{BodyId, Real, Vec3, ensure_finite, ensure_non_negative};
use mb_matter::Matter;
use mb_state::State;

/// Linear spring between two stations: tension `k (d - x0)`.
#[derive(Clone, Debug)]
pub struct TwoPointLinearSpring {
    body1: BodyId,
    station1: Vec3,
    body2: BodyId,
    station2: Vec3,
    k: Real,
    x0: Real,
}

impl TwoPointLinearSpring {
    pub fn new(body1: BodyId, station1: Vec3, body2: BodyId, station2: Vec3, k: Real, x0: Real) -> ForceResult<Self> {
        Ok(Self {
            body1,
            station1,
            body2,
            station2,
            k: ensure_finite(k, "spring stiffness")?,
            x0: ensure_finite(x0, "spring rest length")?,
        })
    }

    pub fn stiffness(&self) -> Real {
        self.k
    }

    pub fn set_stiffness(&mut self, k: Real) -> ForceResult<()> {
        self.k = ensure_finite(k, "spring stiffness")?;
        Ok(())
    }

    pub fn rest_length(&self) -> Real {
        self.x0
    }

    pub fn set_rest_length(&mut self, x0: Real) -> ForceResult<()> {
        self.x0 = ensure_finite(x0, "spring rest length")?;
        Ok(())
    }

    fn stations(&self, state: &State, matter: &dyn Matter) -> ForceResult<StationPair> {
        StationPair::locate(state, matter, (self.body1, &self.station1), (self.body2, &self.station2))
    }
}

impl ForceElement for TwoPointLinearSpring {
    fn name(&self) -> &str {
        "two-point linear spring"
    }

    fn calc_force(&self, state: &State, matter: &dyn Matter, forces: &mut ForceAccumulators) -> ForceResult<()> {
        let pair = self.stations(state, matter)?;
        let (d, dir) = pair.direction("two-point spring stations coincide")?;
        // Positive when stretched: pulls station 1 toward station 2.
        let f1_g = dir * (self.k * (d - self.x0));
        forces.add_body_force(self.body1, pair.on_body1(f1_g))?;
        forces.add_body_force(self.body2, pair.on_body2(-f1_g))?;
        Ok(())
    }

    fn calc_potential_energy(&self, state: &State, matter: &dyn Matter) -> ForceResult<Real> {
        let stretch = self.stations(state, matter)?.distance() - self.x0;
        Ok(0.5 * self.k * stretch * stretch)
    }
}

/// Linear damper between two stations: tension `c (v_rel · d̂)`.
#[derive(Clone, Debug)]
pub struct TwoPointLinearDamper {
    body1: BodyId,
    station1: Vec3,
    body2: BodyId,
    station2: Vec3,
    damping: Real,
}

impl TwoPointLinearDamper {
    pub fn new(body1: BodyId, station1: Vec3, body2: BodyId, station2: Vec3, damping: Real) -> ForceResult<Self> {
        Ok(Self {
            body1,
            station1,
            body2,
            station2,
            damping: checked_damping(damping)?,
        })
    }

    pub fn damping(&self) -> Real {
        self.damping
    }

    pub fn set_damping(&mut self, damping: Real) -> ForceResult<()> {
        self.damping = checked_damping(damping)?;
        Ok(())
    }
}

impl ForceElement for TwoPointLinearDamper {
    fn name(&self) -> &str {
        "two-point linear damper"
    }

    fn calc_force(&self, state: &State, matter: &dyn Matter, forces: &mut ForceAccumulators) -> ForceResult<()> {
        let pair = StationPair::locate(state, matter, (self.body1, &self.station1), (self.body2, &self.station2))?;
        let (_, dir) = pair.direction("two-point damper stations coincide")?;
        let v1_g = matter.station_velocity_in_ground(state, self.body1, &self.station1)?;
        let v2_g = matter.station_velocity_in_ground(state, self.body2, &self.station2)?;
        let f1_g = dir * (self.damping * (v2_g - v1_g).dot(&dir));
        forces.add_body_force(self.body1, pair.on_body1(f1_g))?;
        forces.add_body_force(self.body2, pair.on_body2(-f1_g))?;
        Ok(())
    }
}

/// Constant-magnitude force along the line between two stations. Positive
/// values push the stations apart.
#[derive(Clone, Debug)]
pub struct TwoPointConstantForce {
    body1: BodyId,
    station1: Vec3,
    body2: BodyId,
    station2: Vec3,
    force: Real,
}

impl TwoPointConstantForce {
    pub fn new(body1: BodyId, station1: Vec3, body2: BodyId, station2: Vec3, force: Real) -> ForceResult<Self> {
        Ok(Self {
            body1,
            station1,
            body2,
            station2,
            force: ensure_finite(force, "two-point force")?,
        })
    }

    pub fn force(&self) -> Real {
        self.force
    }

    pub fn set_force(&mut self, force: Real) -> ForceResult<()> {
        self.force = ensure_finite(force, "two-point force")?;
        Ok(())
    }
}

impl ForceElement for TwoPointConstantForce {
    fn name(&self) -> &str {
        "two-point constant force"
    }

    fn calc_force(&self, state: &State, matter: &dyn Matter, forces: &mut ForceAccumulators) -> ForceResult<()> {
        let pair = StationPair::locate(state, matter, (self.body1, &self.station1), (self.body2, &self.station2))?;
        let (_, dir) = pair.direction("two-point force stations coincide")?;
        let f2_g = dir * self.force;
        forces.add_body_force(self.body1, pair.on_body1(-f2_g))?;
        forces.add_body_force(self.body2, pair.on_body2(f2_g))?;
        Ok(())
    }
}

pub(crate) fn checked_damping(damping: Real) -> ForceResult<Real> {
    ensure_finite(damping, "damping")?;
    Ok(ensure_non_negative(damping, "damping")?)
}
