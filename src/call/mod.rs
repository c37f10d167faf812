//! Async calls - one outstanding request and its terminal outcome
//!
//! An [`AsyncCall`] is a tagged value: `Invalid`, `Pending`, `Completed`
//! with its typed payload, or `Failed` with a [`crate::CallFailure`]. It is
//! advanced only by [`AsyncCall::poll`], which is a no-op once terminal.

mod async_call;
mod payload;

pub use async_call::{AsyncCall, CallStatus};
pub use payload::{CallKind, CallPayload, PayloadError};
