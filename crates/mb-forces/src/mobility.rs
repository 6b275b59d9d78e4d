//! Scalar generalized forces on a single mobility.
//!
//! `coordinate` selects both the generalized coordinate read and the
//! generalized speed receiving the force, so these elements suit
//! mobilizers whose coordinates and speeds correspond one to one.

use crate::accum::ForceAccumulators;
use crate::error::ForceResult;
use crate::traits::ForceElement;
use crate::two_point::checked_damping;
use mb_core::{BodyId, Real, ensure_finite};
use mb_matter::Matter;
use mb_state::State;

/// `f = -k (q - x0)` on one mobility.
#[derive(Clone, Debug)]
pub struct MobilityLinearSpring {
    body: BodyId,
    coordinate: usize,
    k: Real,
    x0: Real,
}

impl MobilityLinearSpring {
    pub fn new(body: BodyId, coordinate: usize, k: Real, x0: Real) -> ForceResult<Self> {
        Ok(Self {
            body,
            coordinate,
            k: ensure_finite(k, "mobility spring stiffness")?,
            x0: ensure_finite(x0, "mobility spring rest position")?,
        })
    }

    pub fn stiffness(&self) -> Real {
        self.k
    }

    pub fn set_stiffness(&mut self, k: Real) -> ForceResult<()> {
        self.k = ensure_finite(k, "mobility spring stiffness")?;
        Ok(())
    }

    pub fn rest_position(&self) -> Real {
        self.x0
    }

    pub fn set_rest_position(&mut self, x0: Real) -> ForceResult<()> {
        self.x0 = ensure_finite(x0, "mobility spring rest position")?;
        Ok(())
    }
}

impl ForceElement for MobilityLinearSpring {
    fn name(&self) -> &str {
        "mobility linear spring"
    }

    fn calc_force(&self, state: &State, matter: &dyn Matter, forces: &mut ForceAccumulators) -> ForceResult<()> {
        let q = matter.one_q(state, self.body, self.coordinate)?;
        let f = -self.k * (q - self.x0);
        matter.apply_one_mobility_force(state, self.body, self.coordinate, f, forces.mobility_forces_mut())?;
        Ok(())
    }

    fn calc_potential_energy(&self, state: &State, matter: &dyn Matter) -> ForceResult<Real> {
        let dq = matter.one_q(state, self.body, self.coordinate)? - self.x0;
        Ok(0.5 * self.k * dq * dq)
    }
}

/// `f = -c u` on one mobility.
#[derive(Clone, Debug)]
pub struct MobilityLinearDamper {
    body: BodyId,
    coordinate: usize,
    damping: Real,
}

impl MobilityLinearDamper {
    pub fn new(body: BodyId, coordinate: usize, damping: Real) -> ForceResult<Self> {
        Ok(Self {
            body,
            coordinate,
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

impl ForceElement for MobilityLinearDamper {
    fn name(&self) -> &str {
        "mobility linear damper"
    }

    fn calc_force(&self, state: &State, matter: &dyn Matter, forces: &mut ForceAccumulators) -> ForceResult<()> {
        let u = matter.one_u(state, self.body, self.coordinate)?;
        matter.apply_one_mobility_force(state, self.body, self.coordinate, -self.damping * u, forces.mobility_forces_mut())?;
        Ok(())
    }
}

/// A fixed generalized force on one mobility.
#[derive(Clone, Debug)]
pub struct MobilityConstantForce {
    body: BodyId,
    coordinate: usize,
    force: Real,
}

impl MobilityConstantForce {
    pub fn new(body: BodyId, coordinate: usize, force: Real) -> ForceResult<Self> {
        Ok(Self {
            body,
            coordinate,
            force: ensure_finite(force, "mobility force")?,
        })
    }

    pub fn force(&self) -> Real {
        self.force
    }

    pub fn set_force(&mut self, force: Real) -> ForceResult<()> {
        self.force = ensure_finite(force, "mobility force")?;
        Ok(())
    }
}

impl ForceElement for MobilityConstantForce {
    fn name(&self) -> &str {
        "mobility constant force"
    }

    fn calc_force(&self, state: &State, matter: &dyn Matter, forces: &mut ForceAccumulators) -> ForceResult<()> {
        matter.apply_one_mobility_force(state, self.body, self.coordinate, self.force, forces.mobility_forces_mut())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForceError;
    use mb_core::{Transform, Vec3};
    use mb_matter::{MassProperties, MatterError, Mobilizer, RigidBodySystem};
    use mb_state::{Stage, realize_through};

    fn pin_and_slider() -> (RigidBodySystem, BodyId, BodyId) {
        let mut sys = RigidBodySystem::new();
        let mp = MassProperties::point_mass(1.0, Vec3::x()).unwrap();
        let pin = sys.add_body("pin", mp, Mobilizer::pin(Vec3::z()).unwrap(), Transform::identity());
        let slider = sys.add_body("slider", mp, Mobilizer::slider(Vec3::y()).unwrap(), Transform::identity());
        (sys, pin, slider)
    }

    fn state(sys: &RigidBodySystem, q: &[Real], u: &[Real]) -> State {
        let mut state = State::new();
        realize_through::<MatterError, _>(&mut state, Stage::Topology, |s, st| sys.realize(s, st)).unwrap();
        state.set_q(q).unwrap();
        state.set_u(u).unwrap();
        realize_through::<MatterError, _>(&mut state, Stage::Velocity, |s, st| sys.realize(s, st)).unwrap();
        state
    }

    #[test]
    fn spring_restores_toward_rest_position() {
        let (sys, _, slider) = pin_and_slider();
        let s = state(&sys, &[0.0, 0.75], &[0.0, 0.0]);
        let spring = MobilityLinearSpring::new(slider, 0, 4.0, 0.25).unwrap();
        let mut forces = ForceAccumulators::for_matter(&sys);
        spring.calc_force(&s, &sys, &mut forces).unwrap();
        assert_eq!(forces.mobility_forces().as_slice(), &[0.0, -2.0]);
        assert_eq!(spring.calc_potential_energy(&s, &sys).unwrap(), 0.5);
    }

    #[test]
    fn damper_opposes_speed_and_stores_nothing() {
        let (sys, pin, _) = pin_and_slider();
        let s = state(&sys, &[0.3, 0.0], &[-2.0, 5.0]);
        let damper = MobilityLinearDamper::new(pin, 0, 1.5).unwrap();
        let mut forces = ForceAccumulators::for_matter(&sys);
        damper.calc_force(&s, &sys, &mut forces).unwrap();
        assert_eq!(forces.mobility_forces().as_slice(), &[3.0, 0.0]);
        assert_eq!(damper.calc_potential_energy(&s, &sys).unwrap(), 0.0);
    }

    #[test]
    fn constant_force_adds() {
        let (sys, pin, _) = pin_and_slider();
        let s = state(&sys, &[0.0, 0.0], &[0.0, 0.0]);
        let f = MobilityConstantForce::new(pin, 0, 2.5).unwrap();
        let mut forces = ForceAccumulators::for_matter(&sys);
        f.calc_force(&s, &sys, &mut forces).unwrap();
        f.calc_force(&s, &sys, &mut forces).unwrap();
        assert_eq!(forces.mobility_forces()[0], 5.0);
    }

    #[test]
    fn bad_coordinate_reported() {
        let (sys, pin, _) = pin_and_slider();
        let s = state(&sys, &[0.0, 0.0], &[0.0, 0.0]);
        let spring = MobilityLinearSpring::new(pin, 1, 1.0, 0.0).unwrap();
        let mut forces = ForceAccumulators::for_matter(&sys);
        assert!(matches!(
            spring.calc_force(&s, &sys, &mut forces),
            Err(ForceError::Matter(MatterError::MobilityOob { .. }))
        ));
    }

    #[test]
    fn damping_validated() {
        assert!(MobilityLinearDamper::new(BodyId::from_index(1), 0, -2.0).is_err());
        assert!(MobilityLinearDamper::new(BodyId::from_index(1), 0, 0.0).is_ok());
    }
}
