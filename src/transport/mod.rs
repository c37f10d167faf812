//! Transport - the boundary to the service that executes calls
//!
//! Everything in this crate above the transport is pure bookkeeping: it
//! tracks handles, decides when to poll and when to release. The transport
//! is the only component that talks to the service.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ WorkshopClient (arena of query / item slots)  │
//! └───────────────────────────────────────────────┘
//!                        │ submit / poll / release
//!                        ▼
//! ┌───────────────────────────────────────────────┐
//! │ Transport trait                               │
//! │  submit(request) -> handle                    │
//! │  pump()  poll(handle)  release(handle)        │
//! └───────────────────────────────────────────────┘
//!          │                          │
//!          ▼                          ▼
//! ┌─────────────────┐      ┌─────────────────────┐
//! │  LocalWorkshop  │      │ vendor SDK bindings │
//! │   (included)    │      │     (external)      │
//! └─────────────────┘      └─────────────────────┘
//! ```

mod request;
mod transport;

pub use request::Request;
pub use transport::{CallHandle, CallOutcome, Transport};

/// Identifier of a published item.
pub type ItemId = u64;
