//! Staged simulation state for the multibody force library.
//!
//! Provides:
//! - `Stage`: the monotonic realization order (Topology .. Report)
//! - `State`: continuous q/u/z pools, discrete variables and stage-scoped
//!   cache entries, with invalidation driven by the stage bookkeeping
//! - `CacheTier` / `StagedCache` / `ensure_tier`: the lazy cache engine used
//!   by force elements that derive several tiers of intermediate data
//! - `realize_through`: the stage-by-stage realization driver

pub mod cache;
pub mod error;
pub mod stage;
pub mod state;
pub mod value;

pub use cache::{CacheTier, StagedCache, ensure_tier};
pub use error::{StateError, StateResult};
pub use stage::{Stage, realize_through};
pub use state::{State, ZIndex};
pub use value::StateValue;
