//! Slot arena backing the in-memory record store.
//! Freed slots are recycled through a free list so ids stay small and dense.

use std::convert::TryFrom;

/// Arena allocator handing out `u32` slot ids.
#[derive(Debug, Clone)]
pub(crate) struct Arena<T> {
    storage: Vec<Option<T>>,
    /// Free slot indices for reuse
    free_list: Vec<usize>,
    allocated: usize,
}

impl<T> Arena<T> {
    /// Create a new empty arena
    pub(crate) fn new() -> Self {
        Self {
            storage: Vec::new(),
            free_list: Vec::new(),
            allocated: 0,
        }
    }

    /// Allocate a new item in the arena and return its slot id.
    ///
    /// Returns `None` once the `u32` id space is exhausted.
    #[inline]
    pub(crate) fn allocate(&mut self, item: T) -> Option<u32> {
        let index = match self.free_list.pop() {
            Some(free_index) => {
                self.storage[free_index] = Some(item);
                free_index
            }
            None => {
                let index = self.storage.len();
                u32::try_from(index).ok()?;
                self.storage.push(Some(item));
                index
            }
        };
        self.allocated += 1;
        u32::try_from(index).ok()
    }

    /// Deallocate an item from the arena and return it
    #[inline]
    pub(crate) fn deallocate(&mut self, id: u32) -> Option<T> {
        let index = usize::try_from(id).ok()?;
        let item = self.storage.get_mut(index)?.take()?;
        self.free_list.push(index);
        self.allocated -= 1;
        Some(item)
    }

    #[inline]
    pub(crate) fn get(&self, id: u32) -> Option<&T> {
        let index = usize::try_from(id).ok()?;
        self.storage.get(index)?.as_ref()
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        let index = usize::try_from(id).ok()?;
        self.storage.get_mut(index)?.as_mut()
    }

    /// Put a slot back to an earlier state, occupied or free.
    ///
    /// Ids that were never handed out are ignored.
    pub(crate) fn restore(&mut self, id: u32, item: Option<T>) {
        let Ok(index) = usize::try_from(id) else {
            return;
        };
        let Some(slot) = self.storage.get_mut(index) else {
            return;
        };
        match (slot.is_some(), item.is_some()) {
            (false, true) => {
                self.free_list.retain(|free| *free != index);
                self.allocated += 1;
            }
            (true, false) => {
                self.free_list.push(index);
                self.allocated -= 1;
            }
            _ => {}
        }
        *slot = item;
    }

    /// Get the number of allocated items
    pub(crate) fn len(&self) -> usize {
        self.allocated
    }
}
