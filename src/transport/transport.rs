use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ItemId, Request};
use crate::call::CallKind;
use crate::error::{CallFailure, TransportError};
use crate::state::{DownloadProgress, InstallInfo, ItemState};

/// Opaque identifier of one outstanding asynchronous operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallHandle(u64);

impl CallHandle {
    /// Returned by `submit` when the request could not even be issued.
    pub const INVALID: CallHandle = CallHandle(0);

    pub fn new(raw: u64) -> Self {
        CallHandle(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl fmt::Display for CallHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the transport knows about a handle right now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    Pending,
    /// The operation finished; `payload` is the encoded reply of type `kind`.
    Completed { kind: CallKind, payload: Vec<u8> },
    Failed(CallFailure),
}

/// Collaborator that executes calls against the service.
///
/// Implementations never deliver completions on their own: `pump` must be
/// invoked periodically by the caller, and `poll` only reports what has
/// been delivered so far.
pub trait Transport {
    /// Open the session. Called once by [`crate::WorkshopClient::connect`].
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Close the session. Called exactly once when the client shuts down.
    fn disconnect(&mut self);

    /// Fire a request and return its handle immediately.
    ///
    /// Returns [`CallHandle::INVALID`] if the request could not be issued.
    fn submit(&mut self, request: Request) -> CallHandle;

    /// Deliver any queued completion notifications.
    fn pump(&mut self);

    /// Report the current outcome of a handle.
    fn poll(&mut self, handle: CallHandle) -> CallOutcome;

    /// Release service-side resources tied to a handle.
    fn release(&mut self, handle: CallHandle);

    /// Local install/subscription state of an item.
    fn item_state(&self, id: ItemId) -> ItemState;

    /// Ask for an item to be downloaded. Returns false if it cannot start.
    fn start_download(&mut self, id: ItemId, high_priority: bool) -> bool;

    /// Progress of an item download, if one is known.
    fn download_progress(&self, id: ItemId) -> Option<DownloadProgress>;

    /// Where an installed item lives on disk.
    fn install_info(&self, id: ItemId) -> Option<InstallInfo>;
}
