//! Generic slot arena with generation-counted handles.
//!
//! Replaces the classic growable array with shift-on-delete compaction:
//! removal recycles the slot and bumps its generation, so live entries
//! never move and a stale handle resolves to `None` instead of aliasing
//! a newer entry. Appends are amortized O(1) through the backing `Vec`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle to an entry in a [`SlotStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotHandle {
    index: u32,
    generation: u32,
}

impl fmt::Display for SlotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({}.{})", self.index, self.generation)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Slot<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32, next_free: Option<u32> },
}

/// Dense, index-addressable container with stable handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotStore<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    len: usize,
}

impl<T> Default for SlotStore<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            len: 0,
        }
    }
}

impl<T> SlotStore<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the store has no live entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a value, reusing a vacant slot when one exists.
    pub fn insert(&mut self, value: T) -> SlotHandle {
        self.len += 1;
        match self.free_head {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                let (generation, next_free) = match slot {
                    Slot::Vacant {
                        generation,
                        next_free,
                    } => (*generation, *next_free),
                    // Free list only ever points at vacant slots.
                    Slot::Occupied { .. } => {
                        unreachable!("free list head points at occupied slot")
                    }
                };
                self.free_head = next_free;
                *slot = Slot::Occupied { generation, value };
                SlotHandle { index, generation }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot::Occupied {
                    generation: 0,
                    value,
                });
                SlotHandle {
                    index,
                    generation: 0,
                }
            }
        }
    }

    /// Get a live entry; stale or foreign handles return `None`.
    pub fn get(&self, handle: SlotHandle) -> Option<&T> {
        match self.slots.get(handle.index as usize) {
            Some(Slot::Occupied { generation, value }) if *generation == handle.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    /// Get a live entry mutably; stale or foreign handles return `None`.
    pub fn get_mut(&mut self, handle: SlotHandle) -> Option<&mut T> {
        match self.slots.get_mut(handle.index as usize) {
            Some(Slot::Occupied { generation, value }) if *generation == handle.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    /// Remove an entry, recycling its slot. Stale handles return `None`.
    pub fn remove(&mut self, handle: SlotHandle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        match slot {
            Slot::Occupied { generation, .. } if *generation == handle.generation => {
                let next_generation = generation.wrapping_add(1);
                let old = std::mem::replace(
                    slot,
                    Slot::Vacant {
                        generation: next_generation,
                        next_free: self.free_head,
                    },
                );
                self.free_head = Some(handle.index);
                self.len -= 1;
                match old {
                    Slot::Occupied { value, .. } => Some(value),
                    Slot::Vacant { .. } => None,
                }
            }
            _ => None,
        }
    }

    /// Iterate live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotHandle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            match slot {
                Slot::Occupied { generation, value } => Some((
                    SlotHandle {
                        index: index as u32,
                        generation: *generation,
                    },
                    value,
                )),
                Slot::Vacant { .. } => None,
            }
        })
    }

    /// Iterate live entries mutably in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotHandle, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied { generation, value } => Some((
                    SlotHandle {
                        index: index as u32,
                        generation: *generation,
                    },
                    value,
                )),
                Slot::Vacant { .. } => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let mut store = SlotStore::new();
        let a = store.insert("a");
        let b = store.insert("b");
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(a), Some(&"a"));
        assert_eq!(store.get(b), Some(&"b"));

        assert_eq!(store.remove(a), Some("a"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(a), None);
        // b is untouched by a's removal.
        assert_eq!(store.get(b), Some(&"b"));
    }

    #[test]
    fn test_stale_handle_after_slot_reuse() {
        let mut store = SlotStore::new();
        let a = store.insert(1);
        store.remove(a);

        // The slot is recycled with a bumped generation.
        let c = store.insert(3);
        assert_eq!(store.get(c), Some(&3));
        assert_eq!(store.get(a), None);
        assert_eq!(store.remove(a), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_iteration_skips_vacant_slots() {
        let mut store = SlotStore::new();
        let a = store.insert(1);
        let _b = store.insert(2);
        let _c = store.insert(3);
        store.remove(a);

        let values: Vec<i32> = store.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![2, 3]);
    }

    #[test]
    fn test_free_list_reuse_order() {
        let mut store = SlotStore::new();
        let a = store.insert("a");
        let b = store.insert("b");
        store.remove(a);
        store.remove(b);
        // Most recently freed slot is reused first.
        let c = store.insert("c");
        let d = store.insert("d");
        assert_eq!(store.get(c), Some(&"c"));
        assert_eq!(store.get(d), Some(&"d"));
        assert_eq!(store.len(), 2);
    }
}
