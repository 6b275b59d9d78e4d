//! Additive force accumulators.

use crate::error::{ForceError, ForceResult};
use mb_core::{BodyId, MbError, Real, SpatialVec, Vec3};
use mb_matter::Matter;
use nalgebra::DVector;

/// Running sums of every element's contribution.
///
/// Body forces are spatial forces in Ground, with the moment taken about the
/// body origin. Particle forces are in Ground. Mobility forces are
/// generalized forces, one per generalized speed. Elements only ever add.
#[derive(Clone, Debug, PartialEq)]
pub struct ForceAccumulators {
    body: Vec<SpatialVec>,
    particle: Vec<Vec3>,
    mobility: DVector<Real>,
}

impl ForceAccumulators {
    pub fn new(num_bodies: usize, num_particles: usize, num_mobilities: usize) -> Self {
        Self {
            body: vec![SpatialVec::zero(); num_bodies],
            particle: vec![Vec3::zeros(); num_particles],
            mobility: DVector::zeros(num_mobilities),
        }
    }

    /// Zeroed accumulators sized for `matter`.
    pub fn for_matter(matter: &dyn Matter) -> Self {
        Self::new(
            matter.num_bodies(),
            matter.num_particles(),
            matter.num_mobilities(),
        )
    }

    pub fn body_forces(&self) -> &[SpatialVec] {
        &self.body
    }

    pub fn particle_forces(&self) -> &[Vec3] {
        &self.particle
    }

    pub fn mobility_forces(&self) -> &DVector<Real> {
        &self.mobility
    }

    /// Direct access for matter-side helpers that add into one slot.
    pub fn mobility_forces_mut(&mut self) -> &mut DVector<Real> {
        &mut self.mobility
    }

    pub fn add_body_force(&mut self, body: BodyId, f: SpatialVec) -> ForceResult<()> {
        let len = self.body.len();
        let slot = self.body.get_mut(body.idx()).ok_or(MbError::IndexOob {
            what: "body force",
            index: body.idx(),
            len,
        })?;
        *slot += f;
        Ok(())
    }

    pub fn add_particle_force(&mut self, particle: usize, f: Vec3) -> ForceResult<()> {
        let len = self.particle.len();
        let slot = self.particle.get_mut(particle).ok_or(MbError::IndexOob {
            what: "particle force",
            index: particle,
            len,
        })?;
        *slot += f;
        Ok(())
    }

    pub fn add_mobility_force(&mut self, mobility: usize, f: Real) -> ForceResult<()> {
        let len = self.mobility.len();
        let slot = self.mobility.get_mut(mobility).ok_or(MbError::IndexOob {
            what: "mobility force",
            index: mobility,
            len,
        })?;
        *slot += f;
        Ok(())
    }

    /// Add a whole generalized-force vector.
    pub fn add_mobility_forces(&mut self, f: &DVector<Real>) -> ForceResult<()> {
        if f.len() != self.mobility.len() {
            return Err(ForceError::LengthMismatch {
                what: "mobility forces",
                expected: self.mobility.len(),
                actual: f.len(),
            });
        }
        self.mobility += f;
        Ok(())
    }

    /// Add everything from `other`, which must have the same shape.
    pub fn merge(&mut self, other: &ForceAccumulators) -> ForceResult<()> {
        check_shape("body forces", self.body.len(), other.body.len())?;
        check_shape("particle forces", self.particle.len(), other.particle.len())?;
        self.add_mobility_forces(&other.mobility)?;
        for (a, b) in self.body.iter_mut().zip(&other.body) {
            *a += *b;
        }
        for (a, b) in self.particle.iter_mut().zip(&other.particle) {
            *a += *b;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.body.iter_mut().for_each(|f| *f = SpatialVec::zero());
        self.particle.iter_mut().for_each(|f| *f = Vec3::zeros());
        self.mobility.fill(0.0);
    }

    /// Net spatial force of all body forces, with moments taken about the
    /// Ground origin. `origins` gives each body's origin in Ground.
    pub fn net_body_force(&self, origins: &[Vec3]) -> ForceResult<SpatialVec> {
        check_shape("body origins", self.body.len(), origins.len())?;
        Ok(self
            .body
            .iter()
            .zip(origins)
            .fold(SpatialVec::zero(), |acc, (f, o)| acc + f.force_shifted(o)))
    }
}

fn check_shape(what: &'static str, expected: usize, actual: usize) -> ForceResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(ForceError::LengthMismatch {
            what,
            expected,
            actual,
        })
    }
}
