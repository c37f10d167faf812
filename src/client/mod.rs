//! Client - the session object that owns every open workflow
//!
//! ```text
//!                 WorkshopClient
//! ┌──────────────────────────────────────────────┐
//! │ SlotArena<Workflow>                          │
//! │  [0] Query   [1] Item   [2] free   [3] Query │
//! │ pending deletions                            │
//! └──────────────────────────────────────────────┘
//!        │ update(): slots in index order, then deletions
//!        ▼
//!    Transport (pump / poll / release)
//! ```
//!
//! With the `emitter` feature, finished queries, item outcomes and
//! deletions are announced to listeners registered with `on`; see
//! [`events`] for the event names.

mod client;
pub mod events;
mod slot;

pub use client::WorkshopClient;
pub use events::Notification;
