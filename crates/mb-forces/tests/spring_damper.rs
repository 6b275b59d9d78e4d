//! End-to-end force evaluation on small systems.

use mb_core::{GROUND, Mat33, SpatialVec, Transform, Vec3};
use mb_forces::{
    ConstantTorque, ForceError, MobilityLinearSpring, MultibodySystem, TwoPointConstantForce, TwoPointLinearDamper,
    TwoPointLinearSpring, UniformGravity,
};
use mb_matter::{MassProperties, Mobilizer, RigidBodySystem};
use mb_state::Stage;

/// A point mass that slides along Ground's x axis.
fn slider() -> MultibodySystem<RigidBodySystem> {
    let mut matter = RigidBodySystem::new();
    matter.add_body(
        "bob",
        MassProperties::point_mass(1.0, Vec3::zeros()).expect("valid mass"),
        Mobilizer::slider(Vec3::x()).expect("valid axis"),
        Transform::identity(),
    );
    MultibodySystem::new(matter)
}

#[test]
fn stretched_spring_pulls_back() {
    let mut system = slider();
    let bob = mb_core::BodyId::from_index(1);
    system.adopt(TwoPointLinearSpring::new(GROUND, Vec3::zeros(), bob, Vec3::zeros(), 100.0, 1.0).expect("spring"));
    system.adopt(TwoPointLinearDamper::new(GROUND, Vec3::zeros(), bob, Vec3::zeros(), 5.0).expect("damper"));

    let mut state = system.realize_topology().expect("topology");
    state.set_q(&[1.5]).expect("q");
    system.realize(&mut state, Stage::Dynamics).expect("dynamics");

    let forces = system.forces(&state).expect("forces");
    // Tension k (d - x0) = 50; the damper sees no stretch rate.
    assert_eq!(forces.body_forces()[1].linear, Vec3::new(-50.0, 0.0, 0.0));
    assert_eq!(forces.body_forces()[0].linear, Vec3::new(50.0, 0.0, 0.0));
    assert!((system.potential_energy(&state).expect("pe") - 12.5).abs() < 1e-12);

    // Moving apart at 2 m/s adds 10 N of damping on top.
    state.set_u(&[2.0]).expect("u");
    system.realize(&mut state, Stage::Dynamics).expect("dynamics");
    let forces = system.forces(&state).expect("forces");
    assert!((forces.body_forces()[1].linear - Vec3::new(-60.0, 0.0, 0.0)).norm() < 1e-12);
}

#[test]
fn pair_forces_cancel() {
    let mut matter = RigidBodySystem::new();
    let mp = MassProperties::new(1.0, Vec3::zeros(), Mat33::identity()).expect("mass");
    let a = matter.add_body("a", mp, Mobilizer::Free, Transform::identity());
    let b = matter.add_body("b", mp, Mobilizer::Free, Transform::identity());
    let mut system = MultibodySystem::new(matter);
    system.adopt(TwoPointLinearSpring::new(a, Vec3::new(0.1, 0.0, 0.0), b, Vec3::new(0.0, 0.2, 0.0), 30.0, 0.5).expect("spring"));
    system.adopt(TwoPointLinearDamper::new(a, Vec3::zeros(), b, Vec3::new(0.0, 0.0, 0.3), 2.0).expect("damper"));

    let mut state = system.realize_topology().expect("topology");
    let x_gb = mb_core::transform(mb_core::Rotation::from_axis_angle(&Vec3::y_axis(), 0.3), Vec3::new(1.0, 0.5, -0.2));
    system.matter().set_body_q(&mut state, b, &Mobilizer::free_q(&x_gb)).expect("q");
    let v_b = SpatialVec::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.3, 0.0, -0.4));
    system.matter().set_body_u(&mut state, b, &Mobilizer::free_u(&v_b)).expect("u");
    system.realize(&mut state, Stage::Dynamics).expect("dynamics");

    let origins = [Vec3::zeros(), Vec3::zeros(), mb_core::origin(&x_gb)];
    let net = system.forces(&state).expect("forces").net_body_force(&origins).expect("shape");
    assert!(net.norm() < 1e-12, "net = {net:?}");
}

#[test]
fn stiffness_change_requires_new_topology() {
    let mut system = slider();
    let bob = mb_core::BodyId::from_index(1);
    let spring = system.adopt(TwoPointLinearSpring::new(GROUND, Vec3::zeros(), bob, Vec3::zeros(), 100.0, 1.0).expect("spring"));
    let mut state = system.realize_topology().expect("topology");
    state.set_q(&[1.5]).expect("q");
    system.realize(&mut state, Stage::Dynamics).expect("dynamics");
    assert_eq!(system.forces(&state).expect("forces").body_forces()[1].linear, Vec3::new(-50.0, 0.0, 0.0));

    system.get_mut(spring).expect("handle").set_stiffness(200.0).expect("stiffness");

    // The total cached under k = 100 is no longer reachable.
    assert_eq!(state.stage(), Stage::Dynamics);
    assert!(system.forces(&state).is_err());

    state.invalidate_all(Stage::Topology);
    system.realize(&mut state, Stage::Topology).expect("topology");
    state.set_q(&[1.5]).expect("q");
    system.realize(&mut state, Stage::Dynamics).expect("dynamics");
    assert_eq!(system.forces(&state).expect("forces").body_forces()[1].linear, Vec3::new(-100.0, 0.0, 0.0));
    assert!((system.potential_energy(&state).expect("pe") - 25.0).abs() < 1e-12);

    let mut fresh = system.realize_topology().expect("topology");
    fresh.set_q(&[1.5]).expect("q");
    system.realize(&mut fresh, Stage::Dynamics).expect("dynamics");
    assert_eq!(system.forces(&fresh).expect("forces"), system.forces(&state).expect("forces"));
}

#[test]
fn constant_pair_force_with_offset_stations_balances() {
    let mut matter = RigidBodySystem::new();
    let mp = MassProperties::new(1.0, Vec3::zeros(), Mat33::identity()).expect("mass");
    let a = matter.add_body("a", mp, Mobilizer::Free, Transform::identity());
    let b = matter.add_body("b", mp, Mobilizer::Free, Transform::identity());
    let mut system = MultibodySystem::new(matter);
    system.adopt(
        TwoPointConstantForce::new(a, Vec3::new(0.2, -0.1, 0.0), b, Vec3::new(0.0, 0.3, 0.4), 3.0).expect("force"),
    );

    let mut state = system.realize_topology().expect("topology");
    let x_ga = mb_core::transform(mb_core::Rotation::from_axis_angle(&Vec3::x_axis(), -0.4), Vec3::new(-0.5, 0.2, 0.1));
    let x_gb = mb_core::transform(mb_core::Rotation::from_axis_angle(&Vec3::z_axis(), 0.7), Vec3::new(1.0, 1.5, -0.3));
    system.matter().set_body_q(&mut state, a, &Mobilizer::free_q(&x_ga)).expect("q");
    system.matter().set_body_q(&mut state, b, &Mobilizer::free_q(&x_gb)).expect("q");
    system.realize(&mut state, Stage::Dynamics).expect("dynamics");

    let forces = system.forces(&state).expect("forces");
    assert!((forces.body_forces()[b.idx()].linear.norm() - 3.0).abs() < 1e-12);
    assert!(forces.body_forces()[b.idx()].angular.norm() > 0.1);

    let origins = [Vec3::zeros(), mb_core::origin(&x_ga), mb_core::origin(&x_gb)];
    let net = forces.net_body_force(&origins).expect("shape");
    assert!(net.norm() < 1e-12, "net = {net:?}");
}

#[test]
fn coincident_stations_fail_loudly() {
    let mut system = slider();
    let bob = mb_core::BodyId::from_index(1);
    system.adopt(TwoPointLinearSpring::new(GROUND, Vec3::zeros(), bob, Vec3::zeros(), 100.0, 1.0).expect("spring"));
    let mut state = system.realize_topology().expect("topology");

    let err = system.realize(&mut state, Stage::Dynamics).unwrap_err();
    assert!(matches!(err, ForceError::DegenerateGeometry { .. }));
    assert_eq!(state.stage(), Stage::Velocity);
    // Energy needs no direction.
    assert!((system.potential_energy(&state).expect("pe") - 50.0).abs() < 1e-12);
}

#[test]
fn mixed_elements_sum() {
    let mut system = slider();
    let bob = mb_core::BodyId::from_index(1);
    system.adopt(MobilityLinearSpring::new(bob, 0, 4.0, 0.25).expect("spring"));
    system.adopt(ConstantTorque::new(bob, Vec3::z()).expect("torque"));
    system.adopt(UniformGravity::new(Vec3::new(-1.0, 0.0, 0.0), 0.0).expect("gravity"));

    let mut state = system.realize_topology().expect("topology");
    state.set_q(&[0.75]).expect("q");
    system.realize(&mut state, Stage::Dynamics).expect("dynamics");

    let forces = system.forces(&state).expect("forces");
    assert_eq!(forces.mobility_forces()[0], -2.0);
    assert_eq!(forces.body_forces()[1], SpatialVec::new(Vec3::z(), Vec3::new(-1.0, 0.0, 0.0)));
    // ½·4·0.5² from the spring plus 0.75 from gravity.
    assert!((system.potential_energy(&state).expect("pe") - 1.25).abs() < 1e-12);
}
