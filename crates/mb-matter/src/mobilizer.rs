//! Joints connecting a body to Ground.

use mb_core::{MbError, MbResult, Real, Rotation, SpatialVec, Transform, Vec3, transform};
use nalgebra::{Quaternion, Unit, UnitQuaternion};

/// How a body moves relative to its inboard frame F (fixed in Ground).
///
/// The body frame B coincides with the mobilizer's outboard frame M, so the
/// body pose is `X_GB = X_GF * X_FM(q)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mobilizer {
    /// No relative motion.
    Weld,
    /// Rotation by `q` about `axis` through the F origin.
    Pin { axis: Unit<Vec3> },
    /// Translation by `q` along `axis`.
    Slider { axis: Unit<Vec3> },
    /// Six dof. `q = [w, x, y, z, px, py, pz]` (orientation quaternion then
    /// position of the M origin in F); `u = [ω, v]` expressed in F.
    Free,
}

impl Mobilizer {
    pub fn pin(axis: Vec3) -> MbResult<Self> {
        Ok(Self::Pin {
            axis: unit_axis(axis)?,
        })
    }

    pub fn slider(axis: Vec3) -> MbResult<Self> {
        Ok(Self::Slider {
            axis: unit_axis(axis)?,
        })
    }

    pub fn nq(&self) -> usize {
        match self {
            Mobilizer::Weld => 0,
            Mobilizer::Pin { .. } | Mobilizer::Slider { .. } => 1,
            Mobilizer::Free => 7,
        }
    }

    pub fn nu(&self) -> usize {
        match self {
            Mobilizer::Weld => 0,
            Mobilizer::Pin { .. } | Mobilizer::Slider { .. } => 1,
            Mobilizer::Free => 6,
        }
    }

    /// Coordinates of the reference configuration (`X_FM` = identity).
    pub fn default_q(&self) -> Vec<Real> {
        match self {
            Mobilizer::Free => vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            _ => vec![0.0; self.nq()],
        }
    }

    /// Free-mobilizer coordinates that place M at `x_fm`.
    pub fn free_q(x_fm: &Transform) -> [Real; 7] {
        let quat = UnitQuaternion::from_rotation_matrix(&x_fm.rotation);
        let p = x_fm.translation.vector;
        [quat.w, quat.i, quat.j, quat.k, p.x, p.y, p.z]
    }

    /// Free-mobilizer speeds for a relative spatial velocity expressed in F.
    pub fn free_u(v_fm: &SpatialVec) -> [Real; 6] {
        let (w, v) = (v_fm.angular, v_fm.linear);
        [w.x, w.y, w.z, v.x, v.y, v.z]
    }

    /// `X_FM` for this mobilizer's slice of q.
    pub fn x_fm(&self, q: &[Real]) -> MbResult<Transform> {
        check_len(q.len(), self.nq())?;
        Ok(match self {
            Mobilizer::Weld => Transform::identity(),
            Mobilizer::Pin { axis } => transform(Rotation::from_axis_angle(axis, q[0]), Vec3::zeros()),
            Mobilizer::Slider { axis } => transform(Rotation::identity(), axis.into_inner() * q[0]),
            Mobilizer::Free => {
                let raw = Quaternion::new(q[0], q[1], q[2], q[3]);
                if !(raw.norm() > 0.0) {
                    return Err(MbError::InvalidArg {
                        what: "free mobilizer quaternion must be nonzero",
                    });
                }
                let rotation = UnitQuaternion::from_quaternion(raw).to_rotation_matrix();
                transform(rotation, Vec3::new(q[4], q[5], q[6]))
            }
        })
    }

    /// Relative spatial velocity `V_FM` (in F, at the M origin) for this
    /// mobilizer's slice of u.
    pub fn v_fm(&self, u: &[Real]) -> MbResult<SpatialVec> {
        check_len(u.len(), self.nu())?;
        Ok(match self {
            Mobilizer::Weld => SpatialVec::zero(),
            Mobilizer::Pin { axis } => SpatialVec::angular(axis.into_inner() * u[0]),
            Mobilizer::Slider { axis } => SpatialVec::new(Vec3::zeros(), axis.into_inner() * u[0]),
            Mobilizer::Free => SpatialVec::new(Vec3::new(u[0], u[1], u[2]), Vec3::new(u[3], u[4], u[5])),
        })
    }

    /// Generalized force conjugate to u for a spatial force `f` (in F, about
    /// the M origin): `Hᵀ f`.
    pub fn project_force(&self, f: &SpatialVec) -> Vec<Real> {
        match self {
            Mobilizer::Weld => Vec::new(),
            Mobilizer::Pin { axis } => vec![axis.dot(&f.angular)],
            Mobilizer::Slider { axis } => vec![axis.dot(&f.linear)],
            Mobilizer::Free => {
                let (t, l) = (f.angular, f.linear);
                vec![t.x, t.y, t.z, l.x, l.y, l.z]
            }
        }
    }
}

fn unit_axis(axis: Vec3) -> MbResult<Unit<Vec3>> {
    Unit::try_new(axis, 1e-12).ok_or(MbError::InvalidArg {
        what: "mobilizer axis must be nonzero",
    })
}

fn check_len(actual: usize, expected: usize) -> MbResult<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(MbError::IndexOob {
            what: "mobilizer coordinates",
            index: actual,
            len: expected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn pin_rotates_about_axis() {
        let pin = Mobilizer::pin(Vec3::z()).unwrap();
        let x = pin.x_fm(&[FRAC_PI_2]).unwrap();
        let p = x.rotation * Vec3::x();
        assert!((p - Vec3::y()).norm() < 1e-15);
        assert_eq!(pin.v_fm(&[2.0]).unwrap().angular, Vec3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn zero_axis_rejected() {
        assert!(Mobilizer::slider(Vec3::zeros()).is_err());
    }

    #[test]
    fn free_coordinates_round_trip() {
        let x = transform(
            Rotation::from_axis_angle(&Vec3::y_axis(), 0.7),
            Vec3::new(1.0, -2.0, 0.5),
        );
        let q = Mobilizer::free_q(&x);
        let back = Mobilizer::Free.x_fm(&q).unwrap();
        assert!((back.rotation.matrix() - x.rotation.matrix()).norm() < 1e-14);
        assert!((back.translation.vector - x.translation.vector).norm() < 1e-15);
    }

    #[test]
    fn default_is_identity() {
        for m in [Mobilizer::Weld, Mobilizer::Free, Mobilizer::pin(Vec3::x()).unwrap()] {
            let x = m.x_fm(&m.default_q()).unwrap();
            assert!((x.to_homogeneous() - Transform::identity().to_homogeneous()).norm() < 1e-15);
        }
    }

    #[test]
    fn wrong_length_rejected() {
        assert!(Mobilizer::Free.x_fm(&[1.0, 0.0]).is_err());
    }
}
