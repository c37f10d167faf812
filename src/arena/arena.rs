use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::transport::{CallHandle, Transport};

/// Stable index of an occupied slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(usize);

impl SlotId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

/// Content that may still hold service handles when its slot is freed.
pub trait SlotContent {
    /// Handles to release, in order. Invalid handles are skipped.
    fn handles(&mut self) -> Vec<CallHandle>;
}

/// Table of slots addressed by [`SlotId`].
///
/// Allocation takes the first free index, so with at most `K` slots open
/// at once no index at or above `K` is ever handed out.
#[derive(Debug)]
pub struct SlotArena<S> {
    slots: Vec<Option<S>>,
}

impl<S> Default for SlotArena<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SlotArena<S> {
    pub fn new() -> Self {
        SlotArena { slots: Vec::new() }
    }

    /// Store `content` in the lowest free slot, growing the table if full.
    pub fn allocate(&mut self, content: S) -> SlotId {
        match self.slots.iter().position(Option::is_none) {
            Some(index) => {
                self.slots[index] = Some(content);
                SlotId(index)
            }
            None => {
                self.slots.push(Some(content));
                SlotId(self.slots.len() - 1)
            }
        }
    }

    pub fn contains(&self, id: SlotId) -> bool {
        matches!(self.slots.get(id.0), Some(Some(_)))
    }

    /// # Panics
    ///
    /// If the slot is free or out of range.
    pub fn get(&self, id: SlotId) -> &S {
        match self.slots.get(id.0) {
            Some(Some(content)) => content,
            Some(None) => panic!("{} is not occupied", id),
            None => panic!("{} is out of range ({} slots)", id, self.slots.len()),
        }
    }

    /// # Panics
    ///
    /// If the slot is free or out of range.
    pub fn get_mut(&mut self, id: SlotId) -> &mut S {
        let len = self.slots.len();
        match self.slots.get_mut(id.0) {
            Some(Some(content)) => content,
            Some(None) => panic!("{} is not occupied", id),
            None => panic!("{} is out of range ({} slots)", id, len),
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of the slot table, free slots included.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Occupied slot ids in index order.
    pub fn ids(&self) -> Vec<SlotId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| SlotId(index))
            .collect()
    }

    /// Occupied slots in index order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut S)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|content| (SlotId(index), content)))
    }
}

impl<S: SlotContent> SlotArena<S> {
    /// Free a slot, releasing every handle its content still holds.
    ///
    /// # Panics
    ///
    /// If the slot is already free or out of range.
    pub fn release<R: Transport + ?Sized>(&mut self, id: SlotId, transport: &mut R) -> S {
        let len = self.slots.len();
        let slot = match self.slots.get_mut(id.0) {
            Some(slot) => slot,
            None => panic!("{} is out of range ({} slots)", id, len),
        };
        let mut content = match slot.take() {
            Some(content) => content,
            None => panic!("{} released twice", id),
        };

        for handle in content.handles() {
            if handle.is_valid() {
                debug!(%id, %handle, "releasing handle");
                transport.release(handle);
            }
        }
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Entry(&'static str);

    impl SlotContent for Entry {
        fn handles(&mut self) -> Vec<CallHandle> {
            Vec::new()
        }
    }

    struct NullTransport;

    impl Transport for NullTransport {
        fn connect(&mut self) -> Result<(), crate::error::TransportError> {
            Ok(())
        }
        fn disconnect(&mut self) {}
        fn submit(&mut self, _request: crate::transport::Request) -> CallHandle {
            CallHandle::INVALID
        }
        fn pump(&mut self) {}
        fn poll(&mut self, _handle: CallHandle) -> crate::transport::CallOutcome {
            crate::transport::CallOutcome::Pending
        }
        fn release(&mut self, _handle: CallHandle) {}
        fn item_state(&self, _id: u64) -> crate::state::ItemState {
            crate::state::ItemState::NONE
        }
        fn start_download(&mut self, _id: u64, _high_priority: bool) -> bool {
            false
        }
        fn download_progress(&self, _id: u64) -> Option<crate::state::DownloadProgress> {
            None
        }
        fn install_info(&self, _id: u64) -> Option<crate::state::InstallInfo> {
            None
        }
    }

    #[test]
    fn allocates_sequentially_then_reuses_lowest_free() {
        let mut arena = SlotArena::new();
        let a = arena.allocate(Entry("a"));
        let b = arena.allocate(Entry("b"));
        let c = arena.allocate(Entry("c"));
        assert_eq!((a.index(), b.index(), c.index()), (0, 1, 2));

        arena.release(c, &mut NullTransport);
        arena.release(a, &mut NullTransport);

        let d = arena.allocate(Entry("d"));
        assert_eq!(d.index(), 0);
        let e = arena.allocate(Entry("e"));
        assert_eq!(e.index(), 2);
        assert_eq!(arena.capacity(), 3);
        assert_eq!(arena.get(b), &Entry("b"));
    }

    #[test]
    fn release_returns_content() {
        let mut arena = SlotArena::new();
        let a = arena.allocate(Entry("a"));
        assert_eq!(arena.release(a, &mut NullTransport), Entry("a"));
        assert!(!arena.contains(a));
        assert!(arena.is_empty());
    }

    #[test]
    fn ids_are_in_index_order() {
        let mut arena = SlotArena::new();
        let a = arena.allocate(Entry("a"));
        let b = arena.allocate(Entry("b"));
        let c = arena.allocate(Entry("c"));
        arena.release(b, &mut NullTransport);
        assert_eq!(arena.ids(), vec![a, c]);
        let names: Vec<_> = arena.iter_mut().map(|(_, entry)| entry.0).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    #[should_panic(expected = "released twice")]
    fn double_release_panics() {
        let mut arena = SlotArena::new();
        let a = arena.allocate(Entry("a"));
        arena.release(a, &mut NullTransport);
        arena.release(a, &mut NullTransport);
    }

    #[test]
    #[should_panic(expected = "not occupied")]
    fn get_after_release_panics() {
        let mut arena = SlotArena::new();
        let a = arena.allocate(Entry("a"));
        let _b = arena.allocate(Entry("b"));
        arena.release(a, &mut NullTransport);
        let _ = arena.get(a);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn get_out_of_range_panics() {
        let arena: SlotArena<Entry> = SlotArena::new();
        let _ = arena.get(SlotId(3));
    }
}
