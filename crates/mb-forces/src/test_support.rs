//! Small fixtures shared by the unit tests.

use mb_core::{BodyId, Mat33, SpatialVec, Transform, Vec3};
use mb_matter::{MassProperties, Matter, MatterError, Mobilizer, RigidBodySystem};
use mb_state::{Stage, State, realize_through};

/// Two free bodies with unit mass at their origins.
pub(crate) fn free_pair() -> (RigidBodySystem, BodyId, BodyId) {
    let mut sys = RigidBodySystem::new();
    let mp = MassProperties::new(1.0, Vec3::zeros(), Mat33::identity() * 0.1).unwrap();
    let a = sys.add_body("a", mp, Mobilizer::Free, Transform::identity());
    let b = sys.add_body("b", mp, Mobilizer::Free, Transform::identity());
    (sys, a, b)
}

/// A state with free bodies placed at `poses` and moving with `velocities`
/// (Ground-frame spatial velocities at the body origins), realized through
/// `stage` on the matter side only.
pub(crate) fn placed(
    sys: &RigidBodySystem,
    poses: &[(BodyId, Transform)],
    velocities: &[(BodyId, SpatialVec)],
    stage: Stage,
) -> State {
    let mut state = State::new();
    realize_through::<MatterError, _>(&mut state, Stage::Topology, |s, st| sys.realize(s, st)).unwrap();
    for (body, x) in poses {
        sys.set_body_q(&mut state, *body, &Mobilizer::free_q(x)).unwrap();
    }
    for (body, v) in velocities {
        sys.set_body_u(&mut state, *body, &Mobilizer::free_u(v)).unwrap();
    }
    realize_through::<MatterError, _>(&mut state, stage, |s, st| sys.realize(s, st)).unwrap();
    state
}

pub(crate) fn at(x: f64, y: f64, z: f64) -> Transform {
    mb_core::transform(mb_core::Rotation::identity(), Vec3::new(x, y, z))
}
