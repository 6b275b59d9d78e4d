//! mb-matter: kinematics and mass properties consumed by force elements.
//!
//! Provides:
//! - `Matter`: the query/apply interface force elements use to read body
//!   poses, velocities, generalized coordinates and mass properties
//! - `MassProperties`: mass, center of mass and central inertia of a body
//! - `RigidBodySystem`: a concrete matter provider with bodies mobilized
//!   directly from Ground plus static particles

pub mod error;
pub mod mass;
pub mod mobilizer;
pub mod system;
pub mod traits;

pub use error::{MatterError, MatterResult};
pub use mass::MassProperties;
pub use mobilizer::Mobilizer;
pub use system::RigidBodySystem;
pub use traits::Matter;
