//! mb-forces: force elements for multibody systems.
//!
//! Provides:
//! - `ForceAccumulators`: per-body, per-particle and per-mobility force sums
//! - `ForceElement`: the force/potential-energy capability every element
//!   implements, with optional per-stage realization hooks
//! - Built-in elements: two-point spring/damper/constant force, mobility
//!   spring/damper/constant force, constant force and torque, global damper,
//!   uniform gravity, linear bushing and Nosé–Hoover chain thermostat
//! - `Custom`: adapter for user-supplied `CustomForce` implementations
//! - `ForceSubsystem`: owns elements and dispatches to them
//! - `MultibodySystem`: drives matter and forces through the stages
//!
//! # Example
//!
//! ```no_run
//! use mb_core::{Transform, Vec3};
//! use mb_forces::{MultibodySystem, TwoPointLinearSpring};
//! use mb_matter::{MassProperties, Mobilizer, RigidBodySystem};
//! use mb_state::Stage;
//!
//! let mut matter = RigidBodySystem::new();
//! let body = matter.add_body(
//!     "bob",
//!     MassProperties::point_mass(1.0, Vec3::zeros()).unwrap(),
//!     Mobilizer::slider(Vec3::x()).unwrap(),
//!     Transform::identity(),
//! );
//!
//! let mut system = MultibodySystem::new(matter);
//! system.adopt(
//!     TwoPointLinearSpring::new(mb_core::GROUND, Vec3::zeros(), body, Vec3::zeros(), 100.0, 1.0).unwrap(),
//! );
//!
//! let mut state = system.realize_topology().unwrap();
//! state.set_q(&[1.5]).unwrap();
//! system.realize(&mut state, Stage::Dynamics).unwrap();
//! let forces = system.forces(&state).unwrap();
//! println!("force on bob: {:?}", forces.body_forces()[1].linear);
//! ```

pub mod accum;
pub mod bushing;
pub mod common;
pub mod constant;
pub mod custom;
pub mod error;
pub mod global_damper;
pub mod gravity;
pub mod handle;
pub mod mobility;
pub mod subsystem;
pub mod system;
pub mod thermostat;
pub mod traits;
pub mod two_point;

#[cfg(test)]
mod test_support;

// Re-exports
pub use accum::ForceAccumulators;
pub use bushing::{Bushing, BushingParams};
pub use constant::{ConstantForce, ConstantTorque};
pub use custom::{Custom, CustomForce};
pub use error::{ForceError, ForceResult};
pub use global_damper::GlobalDamper;
pub use gravity::UniformGravity;
pub use handle::ForceHandle;
pub use mobility::{MobilityConstantForce, MobilityLinearDamper, MobilityLinearSpring};
pub use subsystem::ForceSubsystem;
pub use system::MultibodySystem;
pub use thermostat::{Thermostat, ThermostatDefaults};
pub use traits::ForceElement;
pub use two_point::{TwoPointConstantForce, TwoPointLinearDamper, TwoPointLinearSpring};
