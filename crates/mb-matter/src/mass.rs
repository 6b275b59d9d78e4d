//! Rigid-body mass properties.

use mb_core::{
    Mat33, MbError, MbResult, Real, Rotation, SpatialVec, Tolerances, Vec3, ensure_finite, ensure_non_negative,
    nearly_equal,
};

/// Mass, center of mass and inertia of a rigid body.
///
/// `com` is the body-frame station of the center of mass; `inertia` is the
/// central inertia expressed in the body frame.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MassProperties {
    pub mass: Real,
    pub com: Vec3,
    pub inertia: Mat33,
}

impl MassProperties {
    pub fn new(mass: Real, com: Vec3, inertia: Mat33) -> MbResult<Self> {
        ensure_non_negative(mass, "mass")?;
        ensure_finite(mass, "mass")?;
        if !com.iter().all(|c| c.is_finite()) {
            return Err(MbError::InvalidArg {
                what: "center of mass must be finite",
            });
        }
        if !inertia.iter().all(|c| c.is_finite()) || !is_symmetric(&inertia, Tolerances::default()) {
            return Err(MbError::InvalidArg {
                what: "inertia must be finite and symmetric",
            });
        }
        Ok(Self { mass, com, inertia })
    }

    /// A point mass located at `com`.
    pub fn point_mass(mass: Real, com: Vec3) -> MbResult<Self> {
        Self::new(mass, com, Mat33::zeros())
    }

    /// Uniform-density sphere centered at the body origin.
    pub fn sphere(mass: Real, radius: Real) -> MbResult<Self> {
        let i = 0.4 * mass * radius * radius;
        Self::new(mass, Vec3::zeros(), Mat33::from_diagonal_element(i))
    }

    /// Properties carried by Ground, which has no mass of its own.
    pub fn massless() -> Self {
        Self {
            mass: 0.0,
            com: Vec3::zeros(),
            inertia: Mat33::zeros(),
        }
    }

    /// Inertia about the body origin, in the body frame.
    pub fn inertia_about_origin(&self) -> Mat33 {
        let c = self.com;
        self.inertia + (Mat33::identity() * c.norm_squared() - c * c.transpose()) * self.mass
    }

    /// Spatial momentum about the body origin for spatial velocity `v`
    /// (angular velocity and velocity of the body origin), everything
    /// expressed in the frame `r_gb` maps body vectors into.
    pub fn spatial_momentum(&self, r_gb: &Rotation, v: &SpatialVec) -> SpatialVec {
        let c = r_gb * self.com;
        let i_o = r_gb.matrix() * self.inertia_about_origin() * r_gb.matrix().transpose();
        let angular = i_o * v.angular + c.cross(&v.linear) * self.mass;
        let linear = (v.linear + v.angular.cross(&c)) * self.mass;
        SpatialVec::new(angular, linear)
    }
}

fn is_symmetric(m: &Mat33, tol: Tolerances) -> bool {
    [(0, 1), (0, 2), (1, 2)]
        .iter()
        .all(|&(i, j)| nearly_equal(m[(i, j)], m[(j, i)], tol))
}
