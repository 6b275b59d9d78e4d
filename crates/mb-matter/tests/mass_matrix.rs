//! Mass-matrix properties of the reference matter provider.

use mb_core::{Mat33, Rotation, Transform, Vec3, transform};
use mb_matter::{MassProperties, Matter, MatterError, Mobilizer, RigidBodySystem};
use mb_state::{Stage, State, realize_through};
use nalgebra::DVector;
use proptest::prelude::*;

fn mixed_system() -> RigidBodySystem {
    let mut sys = RigidBodySystem::new();
    let inertia = Mat33::from_diagonal(&Vec3::new(0.2, 0.3, 0.4));
    sys.add_body(
        "free",
        MassProperties::new(1.5, Vec3::new(0.1, -0.2, 0.3), inertia).unwrap(),
        Mobilizer::Free,
        transform(Rotation::from_axis_angle(&Vec3::z_axis(), 0.3), Vec3::new(1.0, 0.0, 0.0)),
    );
    sys.add_body(
        "pin",
        MassProperties::point_mass(2.0, Vec3::new(0.0, 1.0, 0.0)).unwrap(),
        Mobilizer::pin(Vec3::new(1.0, 1.0, 0.0)).unwrap(),
        Transform::identity(),
    );
    sys.add_body(
        "weld",
        MassProperties::sphere(5.0, 1.0).unwrap(),
        Mobilizer::Weld,
        Transform::identity(),
    );
    sys.add_body(
        "slider",
        MassProperties::point_mass(0.5, Vec3::zeros()).unwrap(),
        Mobilizer::slider(Vec3::y()).unwrap(),
        Transform::identity(),
    );
    sys
}

fn positioned(sys: &RigidBodySystem, q_free: [f64; 7]) -> State {
    let mut state = State::new();
    realize_through::<MatterError, _>(&mut state, Stage::Topology, |s, st| sys.realize(s, st)).unwrap();
    sys.set_body_q(&mut state, mb_core::Id::from_index(1), &q_free).unwrap();
    realize_through::<MatterError, _>(&mut state, Stage::Position, |s, st| sys.realize(s, st)).unwrap();
    state
}

#[test]
fn counts() {
    let sys = mixed_system();
    assert_eq!(sys.num_bodies(), 5);
    assert_eq!(sys.num_mobilities(), 8);
    let state = positioned(&sys, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    assert_eq!(state.nq(), 9);
    assert_eq!(state.nu(), 8);
}

#[test]
fn wrong_operand_length() {
    let sys = mixed_system();
    let state = positioned(&sys, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    let err = sys.calc_mv(&state, &DVector::zeros(3)).unwrap_err();
    assert!(matches!(err, MatterError::LengthMismatch { expected: 8, actual: 3, .. }));
}

proptest! {
    #[test]
    fn mass_matrix_is_symmetric_positive(
        quat in prop::array::uniform4(-1.0_f64..1.0),
        a in prop::collection::vec(-2.0_f64..2.0, 8),
        b in prop::collection::vec(-2.0_f64..2.0, 8),
    ) {
        prop_assume!(quat.iter().map(|x| x * x).sum::<f64>() > 1e-2);
        let sys = mixed_system();
        let state = positioned(&sys, [quat[0], quat[1], quat[2], quat[3], 0.5, -0.5, 0.2]);
        let a = DVector::from_vec(a);
        let b = DVector::from_vec(b);
        let ma = sys.calc_mv(&state, &a).unwrap();
        let mb = sys.calc_mv(&state, &b).unwrap();
        prop_assert!((b.dot(&ma) - a.dot(&mb)).abs() < 1e-10);
        prop_assert!(a.dot(&ma) >= -1e-12);
    }
}
