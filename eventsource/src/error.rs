//! Error types for the `eventsource` crate.
//!
//! Follows the same pattern as the other workspace crates: a root `Error` struct holding an
//! `error_kind` and an optional `source` for chaining.

use std::error::Error as StdError;
use std::fmt;

pub type Result<T> = core::result::Result<T, Error>;

/// Top-level error type for the eventsource crate.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors raised by clients and streams.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// The connection lacks a transport capability an event stream needs.
    Capability(Capability),
    /// The client has terminated, either by shutdown or because the peer went away.
    Closed,
    /// `shutdown` was already called on this client.
    AlreadyShutdown,
}

/// Transport capabilities checked when a client is constructed.
#[derive(Debug, PartialEq)]
pub enum Capability {
    Flush,
    CloseNotify,
}

impl Error {
    pub fn closed() -> Self {
        Self {
            source: None,
            error_kind: ErrorKind::Closed,
        }
    }

    pub fn missing(capability: Capability) -> Self {
        Self {
            source: None,
            error_kind: ErrorKind::Capability(capability),
        }
    }

    pub fn already_shutdown() -> Self {
        Self {
            source: None,
            error_kind: ErrorKind::AlreadyShutdown,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.error_kind == ErrorKind::Closed
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Capability(capability) => {
                write!(f, "Connection does not support {capability:?}")
            }
            ErrorKind::Closed => write!(f, "Connection closed"),
            ErrorKind::AlreadyShutdown => write!(f, "Client already shut down"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}
