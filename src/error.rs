use std::fmt;

use serde::{Deserialize, Serialize};

/// Transport-level reason an asynchronous call did not produce a result.
///
/// These are failures of the call machinery itself: the remote operation
/// never reported back. Application-level rejections travel in
/// [`ResultCode`] inside a completed payload instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallFailure {
    /// The service went away while the call was outstanding.
    ServiceUnavailable,
    /// The request or its reply was lost on the way.
    NetworkFailure,
    /// The handle was never valid, or was released before completion.
    InvalidHandle,
    /// The completed payload was not of the type the caller expected.
    MismatchedCallback,
    /// A failure code this client does not recognize.
    Unknown(i32),
}

impl CallFailure {
    /// Map a raw failure code as reported by the service.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => CallFailure::ServiceUnavailable,
            1 => CallFailure::NetworkFailure,
            2 => CallFailure::InvalidHandle,
            3 => CallFailure::MismatchedCallback,
            other => CallFailure::Unknown(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            CallFailure::ServiceUnavailable => 0,
            CallFailure::NetworkFailure => 1,
            CallFailure::InvalidHandle => 2,
            CallFailure::MismatchedCallback => 3,
            CallFailure::Unknown(code) => *code,
        }
    }
}

impl fmt::Display for CallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallFailure::ServiceUnavailable => write!(f, "service unavailable"),
            CallFailure::NetworkFailure => write!(f, "network failure"),
            CallFailure::InvalidHandle => write!(f, "invalid handle"),
            CallFailure::MismatchedCallback => write!(f, "mismatched callback"),
            CallFailure::Unknown(code) => write!(f, "unknown ({})", code),
        }
    }
}

/// Application result code carried by completed service replies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    #[default]
    Ok,
    Fail,
    NoConnection,
    InvalidPassword,
    InvalidParam,
    FileNotFound,
    DuplicateName,
    AccessDenied,
    Timeout,
    Banned,
    ServiceUnavailable,
    NotLoggedOn,
    InsufficientPrivilege,
    LimitExceeded,
    DuplicateRequest,
    LockingFailed,
    ServiceReadOnly,
    Other(i32),
}

impl ResultCode {
    const KNOWN: [(ResultCode, i32, &'static str); 17] = [
        (ResultCode::Ok, 1, "OK"),
        (ResultCode::Fail, 2, "Fail"),
        (ResultCode::NoConnection, 3, "NoConnection"),
        (ResultCode::InvalidPassword, 5, "InvalidPassword"),
        (ResultCode::InvalidParam, 8, "InvalidParam"),
        (ResultCode::FileNotFound, 9, "FileNotFound"),
        (ResultCode::DuplicateName, 14, "DuplicateName"),
        (ResultCode::AccessDenied, 15, "AccessDenied"),
        (ResultCode::Timeout, 16, "Timeout"),
        (ResultCode::Banned, 17, "Banned"),
        (ResultCode::ServiceUnavailable, 20, "ServiceUnavailable"),
        (ResultCode::NotLoggedOn, 21, "NotLoggedOn"),
        (ResultCode::InsufficientPrivilege, 24, "InsufficientPrivilege"),
        (ResultCode::LimitExceeded, 25, "LimitExceeded"),
        (ResultCode::DuplicateRequest, 29, "DuplicateRequest"),
        (ResultCode::LockingFailed, 33, "LockingFailed"),
        (ResultCode::ServiceReadOnly, 44, "ServiceReadOnly"),
    ];

    pub fn from_code(code: i32) -> Self {
        Self::KNOWN
            .iter()
            .find(|(_, known, _)| *known == code)
            .map(|(result, _, _)| *result)
            .unwrap_or(ResultCode::Other(code))
    }

    pub fn code(&self) -> i32 {
        match self {
            ResultCode::Other(code) => *code,
            known => Self::KNOWN
                .iter()
                .find(|(result, _, _)| result == known)
                .map(|(_, code, _)| *code)
                .unwrap_or_default(),
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == ResultCode::Ok
    }

    /// Human-readable text; empty for `Ok`.
    pub fn error_text(&self) -> String {
        if self.is_ok() {
            return String::new();
        }
        match Self::KNOWN.iter().find(|(result, _, _)| result == self) {
            Some((_, _, name)) => (*name).to_string(),
            None => format!("unknown ({})", self.code()),
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            write!(f, "OK")
        } else {
            write!(f, "{}", self.error_text())
        }
    }
}

/// Errors raised by a transport outside of individual calls.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("workshop service is not running")]
    NotRunning,
    #[error("catalog io error at {path}: {source}")]
    CatalogIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog at {path} is malformed: {source}")]
    CatalogFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors surfaced by [`crate::WorkshopClient`].
#[derive(Debug, thiserror::Error)]
pub enum WorkshopError {
    #[error("failed to connect: {0}")]
    Connect(#[from] TransportError),
}
