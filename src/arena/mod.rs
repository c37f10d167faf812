//! Slot arena - reusable-index storage for open workflows
//!
//! Callers only ever hold a [`SlotId`]. The arena owns every slot's
//! content, hands out the lowest free index on allocation, and releases
//! the service handles a slot still holds when it is freed.

mod arena;

pub use arena::{SlotArena, SlotContent, SlotId};
