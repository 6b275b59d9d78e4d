//! Spatial algebra on top of nalgebra.
//!
//! Frames are `Transform` values (rotation + translation) named after the
//! frames they relate: `x_gb` maps body-frame coordinates into Ground. A
//! `SpatialVec` pairs an angular and a linear part:
//!
//! ```text
//! velocity: [ω, v]  (angular velocity, linear velocity of a point)
//! force:    [τ, f]  (moment about a point, force)
//! ```

use crate::Real;
use core::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use nalgebra::{IsometryMatrix3, Matrix3, Rotation3, Translation3, Vector3, Vector6};

pub type Vec3 = Vector3<Real>;
pub type Vec6 = Vector6<Real>;
pub type Mat33 = Matrix3<Real>;
pub type Rotation = Rotation3<Real>;
pub type Transform = IsometryMatrix3<Real>;

/// Build a transform from a rotation and the origin offset.
pub fn transform(rotation: Rotation, origin: Vec3) -> Transform {
    Transform::from_parts(Translation3::from(origin), rotation)
}

/// Origin of a frame, measured in its parent.
#[inline]
pub fn origin(x: &Transform) -> Vec3 {
    x.translation.vector
}

/// Angular/linear pair used for both spatial velocities and spatial forces.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpatialVec {
    pub angular: Vec3,
    pub linear: Vec3,
}

impl SpatialVec {
    pub fn new(angular: Vec3, linear: Vec3) -> Self {
        Self { angular, linear }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Pure moment (or pure rotation rate).
    pub fn angular(angular: Vec3) -> Self {
        Self::new(angular, Vec3::zeros())
    }

    /// Pack as `[angular, linear]`.
    pub fn to_vec6(&self) -> Vec6 {
        Vec6::new(
            self.angular.x,
            self.angular.y,
            self.angular.z,
            self.linear.x,
            self.linear.y,
            self.linear.z,
        )
    }

    pub fn from_vec6(v: &Vec6) -> Self {
        Self::new(
            Vec3::new(v[0], v[1], v[2]),
            Vec3::new(v[3], v[4], v[5]),
        )
    }

    /// Re-reference a spatial force whose moment is taken about point P so
    /// that the moment is about point O, where `r` points from O to P.
    pub fn force_shifted(&self, r: &Vec3) -> Self {
        Self::new(self.angular + r.cross(&self.linear), self.linear)
    }

    /// Rigidly shift a spatial velocity from point O to point P, where `r`
    /// points from O to P.
    pub fn velocity_shifted(&self, r: &Vec3) -> Self {
        Self::new(self.angular, self.linear + self.angular.cross(r))
    }

    /// Re-express both parts in another frame.
    pub fn rotated(&self, r: &Rotation) -> Self {
        Self::new(r * self.angular, r * self.linear)
    }

    /// Power-like pairing: `ω·τ + v·f`.
    pub fn dot(&self, other: &Self) -> Real {
        self.angular.dot(&other.angular) + self.linear.dot(&other.linear)
    }

    pub fn norm(&self) -> Real {
        self.to_vec6().norm()
    }
}

impl Add for SpatialVec {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.angular + rhs.angular, self.linear + rhs.linear)
    }
}

impl Sub for SpatialVec {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.angular - rhs.angular, self.linear - rhs.linear)
    }
}

impl Neg for SpatialVec {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.angular, -self.linear)
    }
}

impl Mul<Real> for SpatialVec {
    type Output = Self;
    fn mul(self, s: Real) -> Self {
        Self::new(self.angular * s, self.linear * s)
    }
}

impl AddAssign for SpatialVec {
    fn add_assign(&mut self, rhs: Self) {
        self.angular += rhs.angular;
        self.linear += rhs.linear;
    }
}

impl SubAssign for SpatialVec {
    fn sub_assign(&mut self, rhs: Self) {
        self.angular -= rhs.angular;
        self.linear -= rhs.linear;
    }
}

/// Body-fixed 1-2-3 rotation: `R = Rx(q0) * Ry(q1) * Rz(q2)`.
pub fn rotation_from_body_fixed_xyz(q: &Vec3) -> Rotation {
    Rotation::from_axis_angle(&Vec3::x_axis(), q[0])
        * Rotation::from_axis_angle(&Vec3::y_axis(), q[1])
        * Rotation::from_axis_angle(&Vec3::z_axis(), q[2])
}

/// Recover body-fixed 1-2-3 angles from a rotation.
///
/// The middle angle lies in `[-π/2, π/2]`; the sequence is singular when it
/// reaches either end.
pub fn body_fixed_xyz_from_rotation(r: &Rotation) -> Vec3 {
    let m = r.matrix();
    let q1 = m[(0, 2)].atan2((m[(0, 0)] * m[(0, 0)] + m[(0, 1)] * m[(0, 1)]).sqrt());
    let q0 = (-m[(1, 2)]).atan2(m[(2, 2)]);
    let q2 = (-m[(0, 1)]).atan2(m[(0, 0)]);
    Vec3::new(q0, q1, q2)
}

/// Kinematic N matrix for body-fixed XYZ angles: `qdot = N(q) * w_M`, where
/// `w_M` is the angular velocity expressed in the rotated (outboard) frame.
///
/// Its transpose maps a generalized force in angle space back to a real
/// moment expressed in that same frame.
pub fn n_body_xyz_in_body_frame(q: &Vec3) -> Mat33 {
    let (s1, c1) = q[1].sin_cos();
    let (s2, c2) = q[2].sin_cos();
    let ooc1 = 1.0 / c1;
    Mat33::new(
        c2 * ooc1,
        -s2 * ooc1,
        0.0,
        s2,
        c2,
        0.0,
        -s1 * c2 * ooc1,
        s1 * s2 * ooc1,
        1.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_force_adds_moment_arm() {
        let f = SpatialVec::new(Vec3::zeros(), Vec3::new(0.0, 0.0, 2.0));
        let shifted = f.force_shifted(&Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(shifted.angular, Vec3::new(0.0, -2.0, 0.0));
        assert_eq!(shifted.linear, f.linear);
    }

    #[test]
    fn shift_velocity_adds_tangential_part() {
        let v = SpatialVec::angular(Vec3::new(0.0, 0.0, 1.0));
        let at_p = v.velocity_shifted(&Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(at_p.linear, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn spatial_vec_arithmetic() {
        let a = SpatialVec::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0));
        let b = a * 2.0;
        assert_eq!(b - a, a);
        assert_eq!(a + (-a), SpatialVec::zero());
        assert_eq!(SpatialVec::from_vec6(&a.to_vec6()), a);
        assert_eq!(a.dot(&SpatialVec::zero()), 0.0);
    }

    #[test]
    fn identity_has_zero_angles() {
        let q = body_fixed_xyz_from_rotation(&Rotation::identity());
        assert!(q.norm() < 1e-15);
    }

    #[test]
    fn single_axis_angles() {
        let q = body_fixed_xyz_from_rotation(&Rotation::from_axis_angle(&Vec3::y_axis(), 0.3));
        assert!((q - Vec3::new(0.0, 0.3, 0.0)).norm() < 1e-14);
        let q = body_fixed_xyz_from_rotation(&Rotation::from_axis_angle(&Vec3::z_axis(), -1.1));
        assert!((q - Vec3::new(0.0, 0.0, -1.1)).norm() < 1e-14);
    }

    #[test]
    fn n_matrix_is_identity_at_zero() {
        let n = n_body_xyz_in_body_frame(&Vec3::zeros());
        assert!((n - Mat33::identity()).norm() < 1e-15);
    }
}
