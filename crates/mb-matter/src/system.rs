//! A concrete matter provider: bodies hung directly from Ground.

use crate::error::{MatterError, MatterResult};
use crate::mass::MassProperties;
use crate::mobilizer::Mobilizer;
use crate::traits::Matter;
use mb_core::{BodyId, Id, MbError, MbResult, Real, SpatialVec, Transform, Vec3, ensure_finite, ensure_non_negative};
use mb_state::{CacheTier, Stage, State, StateError};
use nalgebra::DVector;
use std::sync::OnceLock;

#[derive(Clone, Debug)]
struct Body {
    name: String,
    mass: MassProperties,
    mobilizer: Mobilizer,
    x_gf: Transform,
    q_offset: usize,
    u_offset: usize,
}

#[derive(Clone, Copy, Debug)]
struct Particle {
    mass: Real,
    location: Vec3,
}

/// Per-state resources allocated while realizing Topology.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Slots {
    q_start: usize,
    u_start: usize,
    poses: CacheTier<Vec<Transform>>,
    velocities: CacheTier<Vec<SpatialVec>>,
}

/// Rigid bodies, each mobilized directly from Ground through a fixed
/// inboard frame, plus particles resting at fixed Ground locations.
///
/// The mass matrix is block diagonal, one block per body. Body poses and
/// velocities are computed once per state while realizing Position and
/// Velocity and cached in the state.
#[derive(Clone, Debug)]
pub struct RigidBodySystem {
    bodies: Vec<Body>,
    particles: Vec<Particle>,
    nq: usize,
    nu: usize,
    num_acceleration_constraints: usize,
    slots: OnceLock<Slots>,
}

impl Default for RigidBodySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl RigidBodySystem {
    /// A system containing only Ground.
    pub fn new() -> Self {
        Self {
            bodies: vec![Body {
                name: "ground".to_string(),
                mass: MassProperties::massless(),
                mobilizer: Mobilizer::Weld,
                x_gf: Transform::identity(),
                q_offset: 0,
                u_offset: 0,
            }],
            particles: Vec::new(),
            nq: 0,
            nu: 0,
            num_acceleration_constraints: 0,
            slots: OnceLock::new(),
        }
    }

    /// Add a body whose inboard frame F sits at `x_gf` in Ground.
    pub fn add_body(
        &mut self,
        name: impl Into<String>,
        mass: MassProperties,
        mobilizer: Mobilizer,
        x_gf: Transform,
    ) -> BodyId {
        let id = Id::from_usize(self.bodies.len());
        self.bodies.push(Body {
            name: name.into(),
            mass,
            mobilizer,
            x_gf,
            q_offset: self.nq,
            u_offset: self.nu,
        });
        self.nq += mobilizer.nq();
        self.nu += mobilizer.nu();
        self.slots = OnceLock::new();
        id
    }

    /// Add a particle; returns its index.
    pub fn add_particle(&mut self, mass: Real, location: Vec3) -> MbResult<usize> {
        ensure_non_negative(mass, "particle mass")?;
        for c in location.iter() {
            ensure_finite(*c, "particle location")?;
        }
        self.particles.push(Particle { mass, location });
        Ok(self.particles.len() - 1)
    }

    pub fn set_num_acceleration_constraints(&mut self, n: usize) {
        self.num_acceleration_constraints = n;
    }

    pub fn body_name(&self, body: BodyId) -> MatterResult<&str> {
        Ok(&self.body(body)?.name)
    }

    pub fn mobilizer(&self, body: BodyId) -> MatterResult<Mobilizer> {
        Ok(self.body(body)?.mobilizer)
    }

    /// Overwrite one body's generalized coordinates.
    pub fn set_body_q(&self, state: &mut State, body: BodyId, q: &[Real]) -> MatterResult<()> {
        let b = self.body(body)?;
        check_len("body coordinates", b.mobilizer.nq(), q.len())?;
        let start = self.slots(state)?.q_start + b.q_offset;
        state.q_mut().as_mut_slice()[start..start + q.len()].copy_from_slice(q);
        Ok(())
    }

    /// Overwrite one body's generalized speeds.
    pub fn set_body_u(&self, state: &mut State, body: BodyId, u: &[Real]) -> MatterResult<()> {
        let b = self.body(body)?;
        check_len("body speeds", b.mobilizer.nu(), u.len())?;
        let start = self.slots(state)?.u_start + b.u_offset;
        state.u_mut().as_mut_slice()[start..start + u.len()].copy_from_slice(u);
        Ok(())
    }

    fn body(&self, body: BodyId) -> MatterResult<&Body> {
        self.bodies
            .get(body.idx())
            .ok_or(MatterError::UnknownBody { body })
    }

    fn particle(&self, index: usize) -> MatterResult<&Particle> {
        self.particles.get(index).ok_or(MatterError::UnknownParticle {
            index,
            len: self.particles.len(),
        })
    }

    fn slots(&self, state: &State) -> MatterResult<Slots> {
        self.slots.get().copied().ok_or_else(|| {
            StateError::StageTooLow {
                what: "matter topology",
                required: Stage::Topology,
                current: state.stage(),
            }
            .into()
        })
    }

    fn realize_topology(&self, state: &mut State) -> MatterResult<()> {
        let mut q_start = None;
        let mut u_start = None;
        for b in &self.bodies {
            let qs = state.allocate_q(&b.mobilizer.default_q());
            let us = state.allocate_u(&vec![0.0; b.mobilizer.nu()]);
            q_start.get_or_insert(qs);
            u_start.get_or_insert(us);
        }
        let slots = Slots {
            q_start: q_start.unwrap_or(state.nq()),
            u_start: u_start.unwrap_or(state.nu()),
            poses: CacheTier::allocate(state, "body poses", Stage::Position),
            velocities: CacheTier::allocate(state, "body velocities", Stage::Velocity),
        };
        match self.slots.get() {
            Some(existing) if *existing != slots => Err(MbError::Invariant {
                what: "matter resources allocated at different indices in another state",
            }
            .into()),
            Some(_) => Ok(()),
            None => {
                let _ = self.slots.set(slots);
                tracing::debug!(bodies = self.bodies.len(), nq = self.nq, nu = self.nu, "matter topology realized");
                Ok(())
            }
        }
    }

    fn q_slice<'s>(&self, state: &'s State, slots: &Slots, b: &Body) -> &'s [Real] {
        let start = slots.q_start + b.q_offset;
        &state.q().as_slice()[start..start + b.mobilizer.nq()]
    }

    fn u_slice<'v>(v: &'v DVector<Real>, slots: &Slots, b: &Body) -> &'v [Real] {
        let start = slots.u_start + b.u_offset;
        &v.as_slice()[start..start + b.mobilizer.nu()]
    }

    fn calc_poses(&self, state: &State, slots: &Slots) -> MatterResult<Vec<Transform>> {
        self.bodies
            .iter()
            .map(|b| {
                let x_fm = b.mobilizer.x_fm(self.q_slice(state, slots, b))?;
                Ok(b.x_gf * x_fm)
            })
            .collect()
    }

    fn calc_velocities(&self, state: &State, slots: &Slots) -> MatterResult<Vec<SpatialVec>> {
        self.bodies
            .iter()
            .map(|b| {
                let v_fm = b.mobilizer.v_fm(Self::u_slice(state.u(), slots, b))?;
                Ok(v_fm.rotated(&b.x_gf.rotation))
            })
            .collect()
    }

    fn check_mobility(&self, body: BodyId, b: &Body, which: usize) -> MatterResult<()> {
        let nu = b.mobilizer.nu();
        if which < nu {
            Ok(())
        } else {
            Err(MatterError::MobilityOob { body, which, nu })
        }
    }
}

impl Matter for RigidBodySystem {
    fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    fn num_particles(&self) -> usize {
        self.particles.len()
    }

    fn num_mobilities(&self) -> usize {
        self.nu
    }

    fn num_acceleration_constraints(&self) -> usize {
        self.num_acceleration_constraints
    }

    fn realize(&self, state: &mut State, stage: Stage) -> MatterResult<()> {
        match stage {
            Stage::Topology => self.realize_topology(state),
            Stage::Position => {
                let slots = self.slots(state)?;
                let poses = self.calc_poses(state, &slots)?;
                slots.poses.update(state, poses)?;
                Ok(())
            }
            Stage::Velocity => {
                let slots = self.slots(state)?;
                let velocities = self.calc_velocities(state, &slots)?;
                slots.velocities.update(state, velocities)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn body_transform(&self, state: &State, body: BodyId) -> MatterResult<Transform> {
        self.body(body)?;
        let poses = self.slots(state)?.poses.get(state)?;
        Ok(poses[body.idx()])
    }

    fn body_velocity(&self, state: &State, body: BodyId) -> MatterResult<SpatialVec> {
        self.body(body)?;
        let velocities = self.slots(state)?.velocities.get(state)?;
        Ok(velocities[body.idx()])
    }

    fn body_mass_properties(&self, body: BodyId) -> MatterResult<MassProperties> {
        Ok(self.body(body)?.mass)
    }

    fn particle_mass(&self, particle: usize) -> MatterResult<Real> {
        Ok(self.particle(particle)?.mass)
    }

    fn particle_location(&self, state: &State, particle: usize) -> MatterResult<Vec3> {
        state.require_stage(Stage::Position, "particle location")?;
        Ok(self.particle(particle)?.location)
    }

    fn one_q(&self, state: &State, body: BodyId, which: usize) -> MatterResult<Real> {
        let b = self.body(body)?;
        if which >= b.mobilizer.nq() {
            return Err(MatterError::MobilityOob {
                body,
                which,
                nu: b.mobilizer.nq(),
            });
        }
        state.require_stage(Stage::Position, "generalized coordinate")?;
        let slots = self.slots(state)?;
        Ok(self.q_slice(state, &slots, b)[which])
    }

    fn one_u(&self, state: &State, body: BodyId, which: usize) -> MatterResult<Real> {
        let b = self.body(body)?;
        self.check_mobility(body, b, which)?;
        state.require_stage(Stage::Velocity, "generalized speed")?;
        let slots = self.slots(state)?;
        Ok(Self::u_slice(state.u(), &slots, b)[which])
    }

    fn apply_one_mobility_force(
        &self,
        state: &State,
        body: BodyId,
        which: usize,
        force: Real,
        mobility_forces: &mut DVector<Real>,
    ) -> MatterResult<()> {
        let b = self.body(body)?;
        self.check_mobility(body, b, which)?;
        check_len("mobility forces", state.nu(), mobility_forces.len())?;
        let slots = self.slots(state)?;
        mobility_forces[slots.u_start + b.u_offset + which] += force;
        Ok(())
    }

    fn calc_mv(&self, state: &State, v: &DVector<Real>) -> MatterResult<DVector<Real>> {
        check_len("mass matrix operand", state.nu(), v.len())?;
        let slots = self.slots(state)?;
        let poses = slots.poses.get(state)?;
        let mut mv = DVector::zeros(v.len());
        for (b, x_gb) in self.bodies.iter().zip(poses.iter()).skip(1) {
            let nu = b.mobilizer.nu();
            if nu == 0 {
                continue;
            }
            let r_gf = b.x_gf.rotation;
            let v_g = b.mobilizer.v_fm(Self::u_slice(v, &slots, b))?.rotated(&r_gf);
            let h_g = b.mass.spatial_momentum(&x_gb.rotation, &v_g);
            let start = slots.u_start + b.u_offset;
            for (i, f) in b.mobilizer.project_force(&h_g.rotated(&r_gf.inverse())).into_iter().enumerate() {
                mv[start + i] += f;
            }
        }
        Ok(mv)
    }
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> MatterResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(MatterError::LengthMismatch {
            what,
            expected,
            actual,
        })
    }
}
