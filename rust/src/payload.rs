//! Payload policies: what an entry keeps under its key.
//!
//! One engine serves both configurations. [`Single`] keeps exactly one value
//! and refuses a second one for the same key; [`Bucket`] keeps a small
//! unordered set of values sharing the key.

use smallvec::SmallVec;

use crate::types::{BUCKET_ORDER, UNIQUE_ORDER};

/// Per-key payload stored in an entry.
pub trait Payload: Clone {
    /// Value type callers insert.
    type Value;

    /// Order used when a tree of this configuration is built without one.
    const DEFAULT_ORDER: usize;

    fn from_value(value: Self::Value) -> Self;

    /// Fold another value for the same key into this payload.
    ///
    /// Returns the value back when the payload cannot take it.
    fn absorb(&mut self, value: Self::Value) -> Result<(), Self::Value>;

    /// Number of values held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exactly one value per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Single<V>(pub V);

impl<V> Single<V> {
    pub fn value(&self) -> &V {
        &self.0
    }

    pub fn into_value(self) -> V {
        self.0
    }
}

impl<V: Clone> Payload for Single<V> {
    type Value = V;

    const DEFAULT_ORDER: usize = UNIQUE_ORDER;

    fn from_value(value: V) -> Self {
        Single(value)
    }

    fn absorb(&mut self, value: V) -> Result<(), V> {
        Err(value)
    }

    fn len(&self) -> usize {
        1
    }
}

/// Small unordered fan-out of distinct values sharing one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket<V> {
    values: SmallVec<[V; 4]>,
}

impl<V: PartialEq> Bucket<V> {
    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn contains(&self, value: &V) -> bool {
        self.values.contains(value)
    }

    /// Drop one value; true if it was present.
    pub fn remove(&mut self, value: &V) -> bool {
        match self.values.iter().position(|held| held == value) {
            Some(index) => {
                self.values.swap_remove(index);
                true
            }
            None => false,
        }
    }

    pub fn into_vec(self) -> Vec<V> {
        self.values.into_vec()
    }
}

impl<V: Clone + PartialEq> Payload for Bucket<V> {
    type Value = V;

    const DEFAULT_ORDER: usize = BUCKET_ORDER;

    fn from_value(value: V) -> Self {
        let mut values = SmallVec::new();
        values.push(value);
        Bucket { values }
    }

    fn absorb(&mut self, value: V) -> Result<(), V> {
        if !self.values.contains(&value) {
            self.values.push(value);
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_refuses_second_value() {
        let mut payload = Single::from_value("a");
        assert_eq!(payload.absorb("b"), Err("b"));
        assert_eq!(payload.value(), &"a");
        assert_eq!(payload.len(), 1);
    }

    #[test]
    fn test_bucket_collects_distinct_values() {
        let mut bucket = Bucket::from_value(1);
        assert_eq!(bucket.absorb(2), Ok(()));
        assert_eq!(bucket.absorb(1), Ok(()));
        assert_eq!(bucket.len(), 2);
        assert!(bucket.contains(&2));

        assert!(bucket.remove(&1));
        assert!(!bucket.remove(&1));
        assert_eq!(bucket.values(), &[2]);
    }

    #[test]
    fn test_default_orders() {
        assert_eq!(<Single<u8> as Payload>::DEFAULT_ORDER, 9);
        assert_eq!(<Bucket<u8> as Payload>::DEFAULT_ORDER, 25);
    }
}
