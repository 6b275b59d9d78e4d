//! Damping on every mobility at once.

use crate::accum::ForceAccumulators;
use crate::error::ForceResult;
use crate::traits::ForceElement;
use crate::two_point::checked_damping;
use mb_core::Real;
use mb_matter::Matter;
use mb_state::{Stage, State};

/// `f = -c u` across all generalized speeds.
#[derive(Clone, Debug)]
pub struct GlobalDamper {
    damping: Real,
}

impl GlobalDamper {
    pub fn new(damping: Real) -> ForceResult<Self> {
        Ok(Self {
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

impl ForceElement for GlobalDamper {
    fn name(&self) -> &str {
        "global damper"
    }

    fn calc_force(&self, state: &State, _matter: &dyn Matter, forces: &mut ForceAccumulators) -> ForceResult<()> {
        state.require_stage(Stage::Velocity, "global damper speeds")?;
        forces.add_mobility_forces(&(state.u() * -self.damping))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{free_pair, placed};
    use mb_core::{SpatialVec, Vec3};

    #[test]
    fn damps_all_speeds() {
        let (sys, a, b) = free_pair();
        let va = SpatialVec::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0));
        let vb = SpatialVec::new(Vec3::zeros(), Vec3::new(0.0, 0.0, -4.0));
        let state = placed(&sys, &[], &[(a, va), (b, vb)], Stage::Velocity);
        let damper = GlobalDamper::new(0.5).unwrap();
        let mut forces = ForceAccumulators::for_matter(&sys);
        damper.calc_force(&state, &sys, &mut forces).unwrap();
        let expected = [-0.5, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0];
        assert_eq!(forces.mobility_forces().as_slice(), &expected);
        assert_eq!(damper.calc_potential_energy(&state, &sys).unwrap(), 0.0);
    }

    #[test]
    fn needs_velocity_stage() {
        let (sys, _, _) = free_pair();
        let state = placed(&sys, &[], &[], Stage::Position);
        let mut forces = ForceAccumulators::for_matter(&sys);
        assert!(GlobalDamper::new(1.0).unwrap().calc_force(&state, &sys, &mut forces).is_err());
    }

    #[test]
    fn rejects_negative_damping() {
        assert!(GlobalDamper::new(-1e-9).is_err());
        let mut d = GlobalDamper::new(0.0).unwrap();
        assert!(d.set_damping(f64::INFINITY).is_err());
    }
}
