use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::CallPayload;
use crate::error::CallFailure;
use crate::transport::{CallHandle, CallOutcome, Request, Transport};

/// Coarse status of a call, without its payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallStatus {
    #[default]
    Invalid,
    Pending,
    Completed,
    Failed,
}

impl CallStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallStatus::Completed | CallStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum CallState<T> {
    Invalid,
    Pending,
    Completed(T),
    Failed(CallFailure),
}

/// One outstanding request and, eventually, its outcome.
///
/// The handle is kept after the call turns terminal: query handles in
/// particular hold service-side results until they are released.
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncCall<T> {
    handle: CallHandle,
    state: CallState<T>,
}

impl<T> Default for AsyncCall<T> {
    fn default() -> Self {
        Self {
            handle: CallHandle::INVALID,
            state: CallState::Invalid,
        }
    }
}

impl<T> AsyncCall<T> {
    pub fn status(&self) -> CallStatus {
        match self.state {
            CallState::Invalid => CallStatus::Invalid,
            CallState::Pending => CallStatus::Pending,
            CallState::Completed(_) => CallStatus::Completed,
            CallState::Failed(_) => CallStatus::Failed,
        }
    }

    pub fn handle(&self) -> CallHandle {
        self.handle
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, CallState::Pending)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, CallState::Completed(_))
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn failure(&self) -> Option<CallFailure> {
        match self.state {
            CallState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// The completed payload.
    ///
    /// # Panics
    ///
    /// If the call has not completed.
    pub fn result(&self) -> &T {
        match &self.state {
            CallState::Completed(result) => result,
            _ => panic!(
                "call {} has no result (status {:?})",
                self.handle,
                self.status()
            ),
        }
    }

    /// Take the completed payload, leaving the call `Invalid`.
    pub fn take_result(&mut self) -> Option<T> {
        match std::mem::replace(&mut self.state, CallState::Invalid) {
            CallState::Completed(result) => Some(result),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Return to `Invalid`, handing back the handle if it still needs releasing.
    pub fn reset(&mut self) -> Option<CallHandle> {
        self.state = CallState::Invalid;
        let handle = std::mem::replace(&mut self.handle, CallHandle::INVALID);
        handle.is_valid().then_some(handle)
    }
}

impl<T: CallPayload> AsyncCall<T> {
    /// Submit a request and start tracking it.
    ///
    /// An invalid handle fails the call immediately with
    /// [`CallFailure::InvalidHandle`].
    pub fn submit<R: Transport + ?Sized>(transport: &mut R, request: Request) -> Self {
        let name = request.name();
        let handle = transport.submit(request);
        if !handle.is_valid() {
            warn!(request = name, "submission returned an invalid handle");
            return Self {
                handle,
                state: CallState::Failed(CallFailure::InvalidHandle),
            };
        }
        debug!(request = name, %handle, "call submitted");
        Self {
            handle,
            state: CallState::Pending,
        }
    }

    /// Ask the transport whether the call has finished.
    ///
    /// Does nothing unless the call is pending.
    pub fn poll<R: Transport + ?Sized>(&mut self, transport: &mut R) {
        if !self.is_pending() {
            return;
        }

        match transport.poll(self.handle) {
            CallOutcome::Pending => {}
            CallOutcome::Completed { kind, payload } => {
                if kind != T::KIND {
                    warn!(handle = %self.handle, expected = ?T::KIND, got = ?kind, "mismatched reply");
                    self.state = CallState::Failed(CallFailure::MismatchedCallback);
                    return;
                }
                match T::decode(&payload) {
                    Ok(result) => {
                        debug!(handle = %self.handle, ?kind, "call completed");
                        self.state = CallState::Completed(result);
                    }
                    Err(err) => {
                        warn!(handle = %self.handle, error = %err, "undecodable reply");
                        self.state = CallState::Failed(CallFailure::MismatchedCallback);
                    }
                }
            }
            CallOutcome::Failed(failure) => {
                debug!(handle = %self.handle, %failure, "call failed");
                self.state = CallState::Failed(failure);
            }
        }
    }
}
