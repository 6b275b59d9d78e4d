//! Fixed Ground-frame loads on a single body.

use crate::accum::ForceAccumulators;
use crate::error::ForceResult;
use crate::traits::ForceElement;
use mb_core::{BodyId, MbError, SpatialVec, Vec3};
use mb_matter::Matter;
use mb_state::State;

/// A constant Ground-frame force applied at a body-fixed station.
#[derive(Clone, Debug)]
pub struct ConstantForce {
    body: BodyId,
    station: Vec3,
    force: Vec3,
}

impl ConstantForce {
    pub fn new(body: BodyId, station: Vec3, force: Vec3) -> ForceResult<Self> {
        Ok(Self {
            body,
            station,
            force: finite_vec(force, "constant force")?,
        })
    }

    pub fn force(&self) -> Vec3 {
        self.force
    }

    pub fn set_force(&mut self, force: Vec3) -> ForceResult<()> {
        self.force = finite_vec(force, "constant force")?;
        Ok(())
    }

    pub fn station(&self) -> Vec3 {
        self.station
    }
}

impl ForceElement for ConstantForce {
    fn name(&self) -> &str {
        "constant force"
    }

    fn calc_force(&self, state: &State, matter: &dyn Matter, forces: &mut ForceAccumulators) -> ForceResult<()> {
        let x_gb = matter.body_transform(state, self.body)?;
        let station_g = x_gb.rotation * self.station;
        forces.add_body_force(self.body, SpatialVec::new(station_g.cross(&self.force), self.force))
    }
}

/// A constant Ground-frame torque on a body.
#[derive(Clone, Debug)]
pub struct ConstantTorque {
    body: BodyId,
    torque: Vec3,
}

impl ConstantTorque {
    pub fn new(body: BodyId, torque: Vec3) -> ForceResult<Self> {
        Ok(Self {
            body,
            torque: finite_vec(torque, "constant torque")?,
        })
    }

    pub fn torque(&self) -> Vec3 {
        self.torque
    }

    pub fn set_torque(&mut self, torque: Vec3) -> ForceResult<()> {
        self.torque = finite_vec(torque, "constant torque")?;
        Ok(())
    }
}

impl ForceElement for ConstantTorque {
    fn name(&self) -> &str {
        "constant torque"
    }

    fn calc_force(&self, _state: &State, _matter: &dyn Matter, forces: &mut ForceAccumulators) -> ForceResult<()> {
        forces.add_body_force(self.body, SpatialVec::angular(self.torque))
    }
}

fn finite_vec(v: Vec3, what: &'static str) -> ForceResult<Vec3> {
    if v.iter().all(|c| c.is_finite()) {
        Ok(v)
    } else {
        Err(MbError::InvalidArg { what }.into())
    }
}
