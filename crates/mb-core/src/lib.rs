//! mb-core: stable foundation for the multibody force library.
//!
//! Contains:
//! - numeric (Real + tolerances + float and argument checks)
//! - ids (stable compact IDs for bodies, forces, state resources)
//! - spatial (nalgebra-backed frames, spatial vectors, XYZ Euler angles)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod spatial;

// Re-exports: nice ergonomics for downstream crates
pub use error::{MbError, MbResult};
pub use ids::*;
pub use numeric::*;
pub use spatial::*;
