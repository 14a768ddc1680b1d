use std::fmt::Debug;
use std::marker::PhantomData;

use crossbeam::atomic::AtomicCell;

static ID_COUNTER: AtomicCell<u64> = AtomicCell::new(1);

/// A process-unique identifier, tagged with the type it identifies.
/// Used for ephemeral gateway connections, which have no database row.
pub struct Id<T> {
    value: u64,
    kind: PhantomData<T>,
}

impl<T> Id<T> {
    /// Allocates the next id.
    pub fn new() -> Self {
        Self {
            value: ID_COUNTER.fetch_add(1),
            kind: PhantomData,
        }
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}
impl<T> Eq for Id<T> {}

#[cfg(test)]
mod test {
    use super::*;

    struct Marker;

    #[test]
    fn test_ids_are_unique() {
        let first: Id<Marker> = Id::new();
        let second: Id<Marker> = Id::new();

        assert_ne!(first, second);
        assert_eq!(first, first);
    }
}
