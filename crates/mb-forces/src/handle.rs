//! Typed handles returned when an element is adopted.

use core::fmt;
use core::marker::PhantomData;
use mb_core::ForceId;

/// Stable reference to an adopted element of type `T`.
///
/// Handles are plain indices: they stay valid for the lifetime of the
/// subsystem that issued them and say nothing about any state.
pub struct ForceHandle<T> {
    id: ForceId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ForceHandle<T> {
    pub(crate) fn new(id: ForceId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> ForceId {
        self.id
    }
}

impl<T> Clone for ForceHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ForceHandle<T> {}

impl<T> PartialEq for ForceHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for ForceHandle<T> {}

impl<T> fmt::Debug for ForceHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ForceHandle({})", self.id)
    }
}
