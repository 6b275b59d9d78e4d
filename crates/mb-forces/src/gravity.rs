//! Uniform gravitational field.

use crate::accum::ForceAccumulators;
use crate::error::ForceResult;
use crate::traits::ForceElement;
use mb_core::{BodyId, MbError, Real, SpatialVec, Vec3, ensure_finite, origin};
use mb_matter::Matter;
use mb_state::State;

/// Gravity `g` acting on every body (except Ground) and every particle.
///
/// Potential energy is `-Σ m (g·x + zero_height)` over body mass centers
/// and particle locations, so `zero_height` is measured in the same units
/// as `g·x`.
#[derive(Clone, Debug)]
pub struct UniformGravity {
    g: Vec3,
    zero_height: Real,
}

impl UniformGravity {
    pub fn new(g: Vec3, zero_height: Real) -> ForceResult<Self> {
        Ok(Self {
            g: checked_gravity(g)?,
            zero_height: ensure_finite(zero_height, "zero height")?,
        })
    }

    pub fn gravity(&self) -> Vec3 {
        self.g
    }

    pub fn set_gravity(&mut self, g: Vec3) -> ForceResult<()> {
        self.g = checked_gravity(g)?;
        Ok(())
    }

    pub fn zero_height(&self) -> Real {
        self.zero_height
    }

    pub fn set_zero_height(&mut self, height: Real) -> ForceResult<()> {
        self.zero_height = ensure_finite(height, "zero height")?;
        Ok(())
    }
}

impl ForceElement for UniformGravity {
    fn name(&self) -> &str {
        "uniform gravity"
    }

    fn calc_force(&self, state: &State, matter: &dyn Matter, forces: &mut ForceAccumulators) -> ForceResult<()> {
        for p in 0..matter.num_particles() {
            forces.add_particle_force(p, self.g * matter.particle_mass(p)?)?;
        }

        // Ground is skipped.
        for i in 1..matter.num_bodies() {
            let body = BodyId::from_usize(i);
            let mass = matter.body_mass_properties(body)?;
            let x_gb = matter.body_transform(state, body)?;
            let com_g = x_gb.rotation * mass.com;
            let f_g = self.g * mass.mass;
            forces.add_body_force(body, SpatialVec::new(com_g.cross(&f_g), f_g))?;
        }
        Ok(())
    }

    fn calc_potential_energy(&self, state: &State, matter: &dyn Matter) -> ForceResult<Real> {
        let mut pe = 0.0;
        for p in 0..matter.num_particles() {
            let loc = matter.particle_location(state, p)?;
            pe -= matter.particle_mass(p)? * (self.g.dot(&loc) + self.zero_height);
        }
        for i in 1..matter.num_bodies() {
            let body = BodyId::from_usize(i);
            let mass = matter.body_mass_properties(body)?;
            let x_gb = matter.body_transform(state, body)?;
            let com_g = origin(&x_gb) + x_gb.rotation * mass.com;
            pe -= mass.mass * (self.g.dot(&com_g) + self.zero_height);
        }
        Ok(pe)
    }
}

fn checked_gravity(g: Vec3) -> ForceResult<Vec3> {
    if g.iter().all(|c| c.is_finite()) {
        Ok(g)
    } else {
        Err(MbError::InvalidArg {
            what: "gravity must be finite",
        }
        .into())
    }
}
