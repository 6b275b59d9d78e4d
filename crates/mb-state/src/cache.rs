//! Typed cache slots and the dependency-driven tier evaluator.
//!
//! A component that derives several layers of intermediate data (say a
//! position layer, a velocity layer built on it, and a force layer built on
//! both) describes the layers as *tiers*. Each tier lives in a `CacheTier`
//! slot of the state, and `ensure_tier` computes whatever is missing, in
//! dependency order, exactly once per realization.

use crate::error::StateResult;
use crate::stage::Stage;
use crate::state::State;
use crate::value::StateValue;
use core::fmt::Debug;
use core::marker::PhantomData;
use mb_core::CacheId;

/// Typed handle to one cache entry in a `State`.
pub struct CacheTier<T> {
    id: CacheId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for CacheTier<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for CacheTier<T> {}

impl<T> PartialEq for CacheTier<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for CacheTier<T> {}

impl<T> Debug for CacheTier<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("CacheTier").field(&self.id).finish()
    }
}

impl<T: StateValue> CacheTier<T> {
    /// Allocate a fresh, empty entry valid while `state` is realized through
    /// `depends_on`.
    pub fn allocate(state: &mut State, name: &'static str, depends_on: Stage) -> Self {
        Self {
            id: state.allocate_cache_entry(name, depends_on),
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> CacheId {
        self.id
    }

    pub fn is_valid(&self, state: &State) -> bool {
        state.is_cache_valid(self.id)
    }

    pub fn get<'s>(&self, state: &'s State) -> StateResult<&'s T> {
        state.cache_value::<T>(self.id)
    }

    pub fn get_or_compute<'s, E, F>(&self, state: &'s State, compute: F) -> Result<&'s T, E>
    where
        E: From<crate::error::StateError>,
        F: FnOnce() -> Result<T, E>,
    {
        state.cache_get_or_compute(self.id, compute)
    }

    /// Store a byproduct value unless the tier is already valid.
    pub fn offer(&self, state: &State, value: T) -> StateResult<bool> {
        state.cache_offer(self.id, value)
    }

    pub fn update(&self, state: &mut State, value: T) -> StateResult<()> {
        state.cache_update(self.id, value)
    }

    pub fn fill_count(&self, state: &State) -> StateResult<usize> {
        state.cache_fill_count(self.id)
    }
}

/// A set of cache tiers with declared dependencies between them.
pub trait StagedCache {
    type Tier: Copy + Debug + 'static;
    type Error: From<crate::error::StateError>;

    /// Tiers that must be valid before `tier` can be computed.
    fn dependencies(&self, tier: Self::Tier) -> &'static [Self::Tier];

    fn is_tier_valid(&self, state: &State, tier: Self::Tier) -> bool;

    /// Compute `tier` and store it (plus any byproducts) in `state`. Called
    /// only once every dependency is valid.
    fn compute_tier(&self, state: &State, tier: Self::Tier) -> Result<(), Self::Error>;
}

/// Make `tier` valid, computing its dependencies first.
///
/// A dependency may store later tiers as byproducts; validity is checked
/// again after the dependencies so those are not computed twice.
pub fn ensure_tier<C>(cache: &C, state: &State, tier: C::Tier) -> Result<(), C::Error>
where
    C: StagedCache + ?Sized,
{
    if cache.is_tier_valid(state, tier) {
        return Ok(());
    }
    for &dep in cache.dependencies(tier) {
        ensure_tier(cache, state, dep)?;
    }
    if cache.is_tier_valid(state, tier) {
        return Ok(());
    }
    tracing::trace!(?tier, stage = %state.stage(), "computing cache tier");
    cache.compute_tier(state, tier)
}
