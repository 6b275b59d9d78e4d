//! Type-erased values stored in discrete variables and cache entries.

use core::any::Any;
use core::fmt::Debug;

/// Anything that can live in a state slot.
///
/// Values must be clonable so that copying a `State` produces an
/// independent snapshot with its own cache storage.
pub trait StateValue: Any + Send + Sync + Debug {
    fn clone_boxed(&self) -> Box<dyn StateValue>;
}

impl<T: Any + Clone + Send + Sync + Debug> StateValue for T {
    fn clone_boxed(&self) -> Box<dyn StateValue> {
        Box::new(self.clone())
    }
}

pub(crate) fn downcast_ref<T: Any>(value: &dyn StateValue) -> Option<&T> {
    let any: &dyn Any = value;
    any.downcast_ref::<T>()
}

pub(crate) fn downcast_mut<T: Any>(value: &mut dyn StateValue) -> Option<&mut T> {
    let any: &mut dyn Any = value;
    any.downcast_mut::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxed_values_downcast() {
        let b: Box<dyn StateValue> = Box::new(3_usize);
        assert_eq!(downcast_ref::<usize>(b.as_ref()), Some(&3));
        assert!(downcast_ref::<f64>(b.as_ref()).is_none());

        let copy = b.clone_boxed();
        assert_eq!(downcast_ref::<usize>(copy.as_ref()), Some(&3));
    }
}
