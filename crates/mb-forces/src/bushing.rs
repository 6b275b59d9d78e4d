//! Six-degree-of-freedom linear bushing between two body-fixed frames.
//!
//! The bushing measures frame M on body B relative to frame F on body A
//! with body-fixed XYZ angles followed by the F-to-M translation expressed
//! in F:
//!
//! ```text
//! q    = [θx, θy, θz, px, py, pz]
//! f    = -(k ⊙ q + c ⊙ qdot)
//! PE   = ½ Σ k_i q_i²
//! ```
//!
//! The generalized force is mapped back to a real moment through the
//! transpose of the angle-rate matrix, then applied to B at M's origin and,
//! equal and opposite, to A at the same point.
//!
//! Intermediate results live in four cache tiers per state:
//!
//! | tier             | valid from | needs              |
//! |------------------|------------|--------------------|
//! | position         | Position   |                    |
//! | velocity         | Velocity   | position           |
//! | force            | Velocity   | position, velocity |
//! | potential energy | Position   | (force byproduct)  |
//!
//! Each tier is computed at most once per realization, on first use.

use crate::accum::ForceAccumulators;
use crate::common::{bind_slots, bound_slots};
use crate::error::{ForceError, ForceResult};
use crate::traits::ForceElement;
use mb_core::{
    BodyId, MbError, Real, SpatialVec, Transform, Vec3, Vec6, body_fixed_xyz_from_rotation, n_body_xyz_in_body_frame,
    origin,
};
use mb_matter::Matter;
use mb_state::{CacheTier, Stage, StagedCache, State, ensure_tier};
use std::sync::OnceLock;

/// Diagonal stiffness and damping, ordered `[rx, ry, rz, tx, ty, tz]`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BushingParams {
    pub stiffness: Vec6,
    pub damping: Vec6,
}

impl Default for BushingParams {
    fn default() -> Self {
        Self {
            stiffness: Vec6::zeros(),
            damping: Vec6::zeros(),
        }
    }
}

impl BushingParams {
    pub fn new(stiffness: Vec6, damping: Vec6) -> ForceResult<Self> {
        let params = Self { stiffness, damping };
        params.validate()?;
        Ok(params)
    }

    /// Stiffness must be finite; damping must also be non-negative.
    pub fn validate(&self) -> ForceResult<()> {
        if !self.stiffness.iter().all(|k| k.is_finite()) {
            return Err(MbError::InvalidArg {
                what: "bushing stiffness must be finite",
            }
            .into());
        }
        if let Some(&c) = self.damping.iter().find(|c| !(c.is_finite() && **c >= 0.0)) {
            return Err(MbError::IllegalValue {
                what: "bushing damping",
                value: c,
                rule: ">= 0",
            }
            .into());
        }
        Ok(())
    }
}

/// Frame geometry of one configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct BushingPosition {
    pub x_gf: Transform,
    pub x_gm: Transform,
    pub x_fm: Transform,
    /// A's origin to F's origin, in Ground.
    pub p_af_g: Vec3,
    /// B's origin to M's origin, in Ground.
    pub p_bm_g: Vec3,
    /// F's origin to M's origin, in Ground.
    pub p_fm_g: Vec3,
    pub q: Vec6,
}

/// Relative motion of M in F.
#[derive(Clone, Debug, PartialEq)]
pub struct BushingVelocity {
    pub v_gf: SpatialVec,
    pub v_gm: SpatialVec,
    /// Velocity of M in F, expressed in F.
    pub v_fm: SpatialVec,
    pub qdot: Vec6,
}

/// Generalized and spatial forces.
#[derive(Clone, Debug, PartialEq)]
pub struct BushingForce {
    /// Generalized force, ordered like `q`.
    pub f: Vec6,
    /// Force on F at M's origin, in Ground.
    pub f_gf: SpatialVec,
    /// Force on M at M's origin, in Ground.
    pub f_gm: SpatialVec,
    /// `f_gf` shifted to A's origin.
    pub f_ga: SpatialVec,
    /// `f_gm` shifted to B's origin.
    pub f_gb: SpatialVec,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BushingTier {
    Position,
    Velocity,
    Force,
    PotentialEnergy,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Slots {
    position: CacheTier<BushingPosition>,
    velocity: CacheTier<BushingVelocity>,
    force: CacheTier<BushingForce>,
    energy: CacheTier<Real>,
}

/// Linear bushing connecting frame F (fixed on body A) to frame M (fixed on
/// body B).
#[derive(Debug)]
pub struct Bushing {
    body_a: BodyId,
    x_af: Transform,
    body_b: BodyId,
    x_bm: Transform,
    params: BushingParams,
    slots: OnceLock<Slots>,
}

impl Bushing {
    pub fn new(
        body_a: BodyId,
        x_af: Transform,
        body_b: BodyId,
        x_bm: Transform,
        params: BushingParams,
    ) -> ForceResult<Self> {
        params.validate()?;
        Ok(Self {
            body_a,
            x_af,
            body_b,
            x_bm,
            params,
            slots: OnceLock::new(),
        })
    }

    /// Bushing whose frames coincide with the body frames.
    pub fn between_bodies(body_a: BodyId, body_b: BodyId, params: BushingParams) -> ForceResult<Self> {
        Self::new(body_a, Transform::identity(), body_b, Transform::identity(), params)
    }

    pub fn body_a(&self) -> BodyId {
        self.body_a
    }

    pub fn body_b(&self) -> BodyId {
        self.body_b
    }

    pub fn frame_on_a(&self) -> Transform {
        self.x_af
    }

    pub fn frame_on_b(&self) -> Transform {
        self.x_bm
    }

    pub fn params(&self) -> &BushingParams {
        &self.params
    }

    /// Replace both parameter sets. States must be realized again from
    /// Topology before the bushing is evaluated against them.
    pub fn set_params(&mut self, params: BushingParams) -> ForceResult<()> {
        params.validate()?;
        self.params = params;
        self.slots = OnceLock::new();
        Ok(())
    }

    pub fn set_stiffness(&mut self, stiffness: Vec6) -> ForceResult<()> {
        self.set_params(BushingParams {
            stiffness,
            ..self.params
        })
    }

    pub fn set_damping(&mut self, damping: Vec6) -> ForceResult<()> {
        self.set_params(BushingParams {
            damping,
            ..self.params
        })
    }

    // ------------------------------------------------------------- accessors

    pub fn position<'s>(&self, state: &'s State, matter: &dyn Matter) -> ForceResult<&'s BushingPosition> {
        let slots = self.ensure(state, matter, BushingTier::Position)?;
        Ok(slots.position.get(state)?)
    }

    pub fn velocity<'s>(&self, state: &'s State, matter: &dyn Matter) -> ForceResult<&'s BushingVelocity> {
        let slots = self.ensure(state, matter, BushingTier::Velocity)?;
        Ok(slots.velocity.get(state)?)
    }

    pub fn force<'s>(&self, state: &'s State, matter: &dyn Matter) -> ForceResult<&'s BushingForce> {
        let slots = self.ensure(state, matter, BushingTier::Force)?;
        Ok(slots.force.get(state)?)
    }

    pub fn q(&self, state: &State, matter: &dyn Matter) -> ForceResult<Vec6> {
        Ok(self.position(state, matter)?.q)
    }

    pub fn x_fm(&self, state: &State, matter: &dyn Matter) -> ForceResult<Transform> {
        Ok(self.position(state, matter)?.x_fm)
    }

    pub fn qdot(&self, state: &State, matter: &dyn Matter) -> ForceResult<Vec6> {
        Ok(self.velocity(state, matter)?.qdot)
    }

    pub fn v_fm(&self, state: &State, matter: &dyn Matter) -> ForceResult<SpatialVec> {
        Ok(self.velocity(state, matter)?.v_fm)
    }

    pub fn f(&self, state: &State, matter: &dyn Matter) -> ForceResult<Vec6> {
        Ok(self.force(state, matter)?.f)
    }

    pub fn f_gf(&self, state: &State, matter: &dyn Matter) -> ForceResult<SpatialVec> {
        Ok(self.force(state, matter)?.f_gf)
    }

    pub fn f_gm(&self, state: &State, matter: &dyn Matter) -> ForceResult<SpatialVec> {
        Ok(self.force(state, matter)?.f_gm)
    }

    pub fn f_ga(&self, state: &State, matter: &dyn Matter) -> ForceResult<SpatialVec> {
        Ok(self.force(state, matter)?.f_ga)
    }

    pub fn f_gb(&self, state: &State, matter: &dyn Matter) -> ForceResult<SpatialVec> {
        Ok(self.force(state, matter)?.f_gb)
    }

    pub fn potential_energy(&self, state: &State, matter: &dyn Matter) -> ForceResult<Real> {
        let slots = self.ensure(state, matter, BushingTier::PotentialEnergy)?;
        Ok(*slots.energy.get(state)?)
    }

    /// How often `tier` has been computed in `state`.
    pub fn fill_count(&self, state: &State, tier: BushingTier) -> ForceResult<usize> {
        let slots = self.slots(state)?;
        let count = match tier {
            BushingTier::Position => slots.position.fill_count(state)?,
            BushingTier::Velocity => slots.velocity.fill_count(state)?,
            BushingTier::Force => slots.force.fill_count(state)?,
            BushingTier::PotentialEnergy => slots.energy.fill_count(state)?,
        };
        Ok(count)
    }

    fn slots(&self, state: &State) -> ForceResult<Slots> {
        bound_slots(&self.slots, state, "bushing topology")
    }

    fn ensure(&self, state: &State, matter: &dyn Matter, tier: BushingTier) -> ForceResult<Slots> {
        let slots = self.slots(state)?;
        let eval = Eval {
            bushing: self,
            matter,
            slots,
        };
        ensure_tier(&eval, state, tier)?;
        Ok(slots)
    }
}

impl ForceElement for Bushing {
    fn name(&self) -> &str {
        "linear bushing"
    }

    fn realize_topology(&self, state: &mut State, _matter: &dyn Matter) -> ForceResult<()> {
        let slots = Slots {
            position: CacheTier::allocate(state, "bushing position", Stage::Position),
            velocity: CacheTier::allocate(state, "bushing velocity", Stage::Velocity),
            force: CacheTier::allocate(state, "bushing force", Stage::Velocity),
            energy: CacheTier::allocate(state, "bushing potential energy", Stage::Position),
        };
        bind_slots(&self.slots, slots, "bushing cache allocated at a different index in another state")
    }

    fn calc_force(&self, state: &State, matter: &dyn Matter, forces: &mut ForceAccumulators) -> ForceResult<()> {
        let fc = self.force(state, matter)?;
        forces.add_body_force(self.body_b, fc.f_gb)?;
        forces.add_body_force(self.body_a, fc.f_ga)
    }

    fn calc_potential_energy(&self, state: &State, matter: &dyn Matter) -> ForceResult<Real> {
        self.potential_energy(state, matter)
    }
}

/// One bushing evaluated against one matter provider.
struct Eval<'a> {
    bushing: &'a Bushing,
    matter: &'a dyn Matter,
    slots: Slots,
}

impl StagedCache for Eval<'_> {
    type Tier = BushingTier;
    type Error = ForceError;

    fn dependencies(&self, tier: BushingTier) -> &'static [BushingTier] {
        match tier {
            BushingTier::Position => &[],
            BushingTier::Velocity => &[BushingTier::Position],
            BushingTier::Force => &[BushingTier::Position, BushingTier::Velocity],
            BushingTier::PotentialEnergy => &[BushingTier::Position],
        }
    }

    fn is_tier_valid(&self, state: &State, tier: BushingTier) -> bool {
        match tier {
            BushingTier::Position => self.slots.position.is_valid(state),
            BushingTier::Velocity => self.slots.velocity.is_valid(state),
            BushingTier::Force => self.slots.force.is_valid(state),
            BushingTier::PotentialEnergy => self.slots.energy.is_valid(state),
        }
    }

    fn compute_tier(&self, state: &State, tier: BushingTier) -> ForceResult<()> {
        match tier {
            BushingTier::Position => {
                self.slots.position.offer(state, self.calc_position(state)?)?;
            }
            BushingTier::Velocity => {
                let pc = self.slots.position.get(state)?;
                self.slots.velocity.offer(state, self.calc_velocity(state, pc)?)?;
            }
            BushingTier::Force => {
                let pc = self.slots.position.get(state)?;
                let vc = self.slots.velocity.get(state)?;
                let k = &self.bushing.params.stiffness;
                let fk = k.component_mul(&pc.q);
                self.slots.energy.offer(state, 0.5 * fk.dot(&pc.q))?;
                self.slots.force.offer(state, self.calc_force(pc, vc, fk))?;
            }
            BushingTier::PotentialEnergy => {
                let pc = self.slots.position.get(state)?;
                let fk = self.bushing.params.stiffness.component_mul(&pc.q);
                self.slots.energy.offer(state, 0.5 * fk.dot(&pc.q))?;
            }
        }
        Ok(())
    }
}

impl Eval<'_> {
    fn calc_position(&self, state: &State) -> ForceResult<BushingPosition> {
        let b = self.bushing;
        let x_ga = self.matter.body_transform(state, b.body_a)?;
        let x_gb = self.matter.body_transform(state, b.body_b)?;
        let x_gf = x_ga * b.x_af;
        let x_gm = x_gb * b.x_bm;
        let x_fm = x_gf.inverse() * x_gm;

        let angles = body_fixed_xyz_from_rotation(&x_fm.rotation);
        Ok(BushingPosition {
            p_af_g: x_ga.rotation * origin(&b.x_af),
            p_bm_g: x_gb.rotation * origin(&b.x_bm),
            p_fm_g: x_gf.rotation * origin(&x_fm),
            q: SpatialVec::new(angles, origin(&x_fm)).to_vec6(),
            x_gf,
            x_gm,
            x_fm,
        })
    }

    fn calc_velocity(&self, state: &State, pc: &BushingPosition) -> ForceResult<BushingVelocity> {
        let b = self.bushing;
        let v_ga = self.matter.body_velocity(state, b.body_a)?;
        let v_gb = self.matter.body_velocity(state, b.body_b)?;
        let v_gf = v_ga.velocity_shifted(&pc.p_af_g);
        let v_gm = v_gb.velocity_shifted(&pc.p_bm_g);

        // Differentiate p_FM in F rather than in Ground.
        let v_fm_g = v_gm - v_gf;
        let v_fm = SpatialVec::new(v_fm_g.angular, v_fm_g.linear - v_gf.angular.cross(&pc.p_fm_g))
            .rotated(&pc.x_gf.rotation.inverse());

        let w_fm_m = pc.x_fm.rotation.inverse() * v_fm.angular;
        let n = n_body_xyz_in_body_frame(&angles_of(&pc.q));
        Ok(BushingVelocity {
            qdot: SpatialVec::new(n * w_fm_m, v_fm.linear).to_vec6(),
            v_gf,
            v_gm,
            v_fm,
        })
    }

    fn calc_force(&self, pc: &BushingPosition, vc: &BushingVelocity, fk: Vec6) -> BushingForce {
        let fv = self.bushing.params.damping.component_mul(&vc.qdot);
        let f = -(fk + fv);
        let generalized = SpatialVec::from_vec6(&f);

        let n = n_body_xyz_in_body_frame(&angles_of(&pc.q));
        let m_g = pc.x_gm.rotation * (n.transpose() * generalized.angular);
        let f_g = pc.x_gf.rotation * generalized.linear;
        let f_gm = SpatialVec::new(m_g, f_g);
        let f_gf = -f_gm;

        BushingForce {
            f,
            f_gb: f_gm.force_shifted(&pc.p_bm_g),
            f_ga: f_gf.force_shifted(&(pc.p_af_g + pc.p_fm_g)),
            f_gf,
            f_gm,
        }
    }
}

fn angles_of(q: &Vec6) -> Vec3 {
    Vec3::new(q[0], q[1], q[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MultibodySystem;
    use crate::test_support::free_pair;
    use mb_core::{Rotation, transform};
    use mb_matter::{Mobilizer, RigidBodySystem};

    pub(super) fn stiff(k: Real, c: Real) -> BushingParams {
        BushingParams::new(Vec6::repeat(k), Vec6::repeat(c)).unwrap()
    }

    pub(super) fn system_with(bushing: Bushing) -> (MultibodySystem<RigidBodySystem>, BodyId, BodyId) {
        let (sys, a, b) = free_pair();
        let mut system = MultibodySystem::new(sys);
        system.adopt(bushing);
        (system, a, b)
    }

    pub(super) fn pose(
        system: &MultibodySystem<RigidBodySystem>,
        poses: &[(BodyId, Transform)],
        velocities: &[(BodyId, SpatialVec)],
        stage: Stage,
    ) -> State {
        let mut state = system.realize_topology().unwrap();
        for (body, x) in poses {
            system.matter().set_body_q(&mut state, *body, &Mobilizer::free_q(x)).unwrap();
        }
        for (body, v) in velocities {
            system.matter().set_body_u(&mut state, *body, &Mobilizer::free_u(v)).unwrap();
        }
        system.realize(&mut state, stage).unwrap();
        state
    }

    pub(super) fn only_bushing(system: &MultibodySystem<RigidBodySystem>) -> &Bushing {
        let (_, e) = system.forces_subsystem().iter().next().unwrap();
        let any: &dyn core::any::Any = e;
        any.downcast_ref::<Bushing>().unwrap()
    }

    #[test]
    fn coincident_frames_produce_nothing() {
        let (_, a, b) = free_pair();
        let (system, _, _) = system_with(Bushing::between_bodies(a, b, stiff(100.0, 3.0)).unwrap());
        let state = pose(&system, &[], &[], Stage::Velocity);
        let bushing = only_bushing(&system);

        assert_eq!(bushing.q(&state, system.matter()).unwrap(), Vec6::zeros());
        assert_eq!(bushing.qdot(&state, system.matter()).unwrap(), Vec6::zeros());
        assert_eq!(bushing.f(&state, system.matter()).unwrap(), Vec6::zeros());
        assert_eq!(bushing.potential_energy(&state, system.matter()).unwrap(), 0.0);
    }

    #[test]
    fn pure_translation_behaves_like_springs() {
        let (_, a, b) = free_pair();
        let params = BushingParams::new(
            Vec6::new(0.0, 0.0, 0.0, 10.0, 20.0, 30.0),
            Vec6::zeros(),
        )
        .unwrap();
        let (system, _, _) = system_with(Bushing::between_bodies(a, b, params).unwrap());
        let x = transform(Rotation::identity(), Vec3::new(0.1, -0.2, 0.3));
        let state = pose(&system, &[(b, x)], &[], Stage::Velocity);
        let bushing = only_bushing(&system);
        let matter = system.matter();

        let q = bushing.q(&state, matter).unwrap();
        assert!((q - Vec6::new(0.0, 0.0, 0.0, 0.1, -0.2, 0.3)).norm() < 1e-15);
        let f_gb = bushing.f_gb(&state, matter).unwrap();
        assert!((f_gb.linear - Vec3::new(-1.0, 4.0, -9.0)).norm() < 1e-12);
        assert!(f_gb.angular.norm() < 1e-12);
        let pe = bushing.potential_energy(&state, matter).unwrap();
        assert!((pe - 0.5 * (10.0 * 0.01 + 20.0 * 0.04 + 30.0 * 0.09)).abs() < 1e-12);
    }

    #[test]
    fn damping_opposes_relative_motion() {
        let (_, a, b) = free_pair();
        let (system, _, _) = system_with(Bushing::between_bodies(a, b, stiff(0.0, 2.0)).unwrap());
        let vb = SpatialVec::new(Vec3::zeros(), Vec3::new(0.0, 0.5, 0.0));
        let state = pose(&system, &[], &[(b, vb)], Stage::Velocity);
        let bushing = only_bushing(&system);

        let qdot = bushing.qdot(&state, system.matter()).unwrap();
        assert!((qdot - Vec6::new(0.0, 0.0, 0.0, 0.0, 0.5, 0.0)).norm() < 1e-15);
        let f_gb = bushing.f_gb(&state, system.matter()).unwrap();
        assert!((f_gb.linear - Vec3::new(0.0, -1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn tiers_are_computed_once() {
        let (_, a, b) = free_pair();
        let (system, _, _) = system_with(Bushing::between_bodies(a, b, stiff(5.0, 1.0)).unwrap());
        let x = transform(Rotation::from_axis_angle(&Vec3::z_axis(), 0.2), Vec3::new(0.3, 0.0, 0.0));
        let state = pose(&system, &[(b, x)], &[], Stage::Dynamics);
        let bushing = only_bushing(&system);
        let matter = system.matter();

        // Realizing Dynamics computed the force, which also stored PE.
        for tier in [
            BushingTier::Position,
            BushingTier::Velocity,
            BushingTier::Force,
            BushingTier::PotentialEnergy,
        ] {
            assert_eq!(bushing.fill_count(&state, tier).unwrap(), 1, "{tier:?}");
        }

        bushing.f_ga(&state, matter).unwrap();
        bushing.potential_energy(&state, matter).unwrap();
        bushing.q(&state, matter).unwrap();
        assert_eq!(bushing.fill_count(&state, BushingTier::Force).unwrap(), 1);
        assert_eq!(bushing.fill_count(&state, BushingTier::PotentialEnergy).unwrap(), 1);
        assert_eq!(bushing.fill_count(&state, BushingTier::Position).unwrap(), 1);
    }

    #[test]
    fn energy_alone_skips_velocity() {
        let (_, a, b) = free_pair();
        let (system, _, _) = system_with(Bushing::between_bodies(a, b, stiff(5.0, 1.0)).unwrap());
        let x = transform(Rotation::identity(), Vec3::new(0.0, 0.0, 2.0));
        let state = pose(&system, &[(b, x)], &[], Stage::Position);
        let bushing = only_bushing(&system);

        assert!((bushing.potential_energy(&state, system.matter()).unwrap() - 10.0).abs() < 1e-12);
        assert_eq!(bushing.fill_count(&state, BushingTier::Velocity).unwrap(), 0);
        // Forces need speeds.
        assert!(bushing.f(&state, system.matter()).is_err());
    }

    #[test]
    fn changing_q_recomputes() {
        let (_, a, b) = free_pair();
        let (system, _, _) = system_with(Bushing::between_bodies(a, b, stiff(1.0, 0.0)).unwrap());
        let mut state = pose(&system, &[], &[], Stage::Velocity);
        let bushing = only_bushing(&system);
        assert_eq!(bushing.q(&state, system.matter()).unwrap(), Vec6::zeros());

        let x = transform(Rotation::identity(), Vec3::new(1.0, 0.0, 0.0));
        system.matter().set_body_q(&mut state, b, &Mobilizer::free_q(&x)).unwrap();
        assert!(bushing.q(&state, system.matter()).is_err());
        system.realize(&mut state, Stage::Position).unwrap();
        assert_eq!(bushing.q(&state, system.matter()).unwrap()[3], 1.0);
        assert_eq!(bushing.fill_count(&state, BushingTier::Position).unwrap(), 2);
    }

    #[test]
    fn needs_topology() {
        let (sys, a, b) = free_pair();
        let bushing = Bushing::between_bodies(a, b, stiff(1.0, 1.0)).unwrap();
        let state = State::new();
        assert!(matches!(
            bushing.q(&state, &sys),
            Err(ForceError::State(mb_state::StateError::StageTooLow { .. }))
        ));
    }

    #[test]
    fn rejects_negative_damping() {
        let bad = Vec6::new(1.0, 1.0, 1.0, -1.0, 1.0, 1.0);
        assert!(BushingParams::new(Vec6::zeros(), bad).is_err());
        let mut bushing = Bushing::between_bodies(mb_core::GROUND, BodyId::from_index(1), BushingParams::default()).unwrap();
        assert!(bushing.set_damping(bad).is_err());
        assert!(bushing.set_stiffness(Vec6::repeat(f64::NAN)).is_err());
        bushing.set_stiffness(Vec6::repeat(-2.0)).unwrap();
        assert_eq!(bushing.params().stiffness, Vec6::repeat(-2.0));
    }
}
