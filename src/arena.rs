//! Id-keyed entity storage.
//!
//! Relations between organisms (a predator's locked prey, a pack's shared
//! target) are stored as [`EntityId`]s and resolved through an [`Arena`].
//! Removing an entity drops its slot, so a stale id simply stops resolving.

use std::collections::{HashMap, HashSet};

/// Unique, never reused entity identifier
pub type EntityId = u64;

/// Anything stored in an [`Arena`]
pub trait Identified {
    fn id(&self) -> EntityId;
}

/// Dense vector of entities plus an id -> slot index
#[derive(Clone, Debug)]
pub struct Arena<T> {
    items: Vec<T>,
    slots: HashMap<EntityId, usize>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            slots: HashMap::new(),
        }
    }
}

impl<T: Identified> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            slots: HashMap::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert an entity. An entity with the same id is replaced.
    pub fn insert(&mut self, item: T) {
        let id = item.id();
        match self.slots.get(&id) {
            Some(&slot) => self.items[slot] = item,
            None => {
                self.slots.insert(id, self.items.len());
                self.items.push(item);
            }
        }
    }

    #[inline]
    pub fn contains(&self, id: EntityId) -> bool {
        self.slots.contains_key(&id)
    }

    #[inline]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.slots.get(&id).map(|&slot| &self.items[slot])
    }

    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        match self.slots.get(&id) {
            Some(&slot) => Some(&mut self.items[slot]),
            None => None,
        }
    }

    /// Entity at a dense index (iteration order)
    #[inline]
    pub fn at(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    #[inline]
    pub fn at_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Mutable iteration. Callers must not change an entity's id.
    #[inline]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.items.iter().map(Identified::id).collect()
    }

    /// Remove every entity whose id is in `doomed` in a single pass.
    /// Returns the removed entities in their former order.
    pub fn remove_many(&mut self, doomed: &HashSet<EntityId>) -> Vec<T> {
        if doomed.is_empty() || self.items.is_empty() {
            return Vec::new();
        }

        let mut kept = Vec::with_capacity(self.items.len());
        let mut removed = Vec::new();
        for item in self.items.drain(..) {
            if doomed.contains(&item.id()) {
                removed.push(item);
            } else {
                kept.push(item);
            }
        }
        self.items = kept;
        self.reindex();
        removed
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.slots.clear();
    }

    fn reindex(&mut self) {
        self.slots.clear();
        for (slot, item) in self.items.iter().enumerate() {
            self.slots.insert(item.id(), slot);
        }
    }
}

impl<T: Identified> Extend<T> for Arena<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item);
        }
    }
}

impl<'a, T> IntoIterator for &'a Arena<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Pebble(EntityId);

    impl Identified for Pebble {
        fn id(&self) -> EntityId {
            self.0
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut arena = Arena::new();
        arena.insert(Pebble(7));
        arena.insert(Pebble(3));

        assert_eq!(arena.len(), 2);
        assert!(arena.contains(7));
        assert_eq!(arena.get(3), Some(&Pebble(3)));
        assert!(arena.get(4).is_none());
    }

    #[test]
    fn test_batch_removal_invalidates_ids() {
        let mut arena = Arena::new();
        arena.extend((0..6).map(Pebble));

        let doomed: HashSet<EntityId> = [1, 4].into_iter().collect();
        let removed = arena.remove_many(&doomed);

        assert_eq!(removed, vec![Pebble(1), Pebble(4)]);
        assert_eq!(arena.ids(), vec![0, 2, 3, 5]);
        assert!(!arena.contains(4));
        // Slots were rebuilt after compaction
        assert_eq!(arena.get(5), Some(&Pebble(5)));
    }

    #[test]
    fn test_insert_same_id_replaces() {
        let mut arena = Arena::new();
        arena.insert(Pebble(1));
        arena.insert(Pebble(1));
        assert_eq!(arena.len(), 1);
    }
}
