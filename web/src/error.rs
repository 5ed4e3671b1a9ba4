use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

/// Errors surfaced by the web layer, mapped onto HTTP status codes.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: WebErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum WebErrorKind {
    /// The submitted event cannot be framed on the wire.
    InvalidEvent(String),
}

impl Error {
    pub fn invalid_event(reason: impl Into<String>) -> Self {
        Self {
            source: None,
            error_kind: WebErrorKind::InvalidEvent(reason.into()),
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

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.error_kind {
            WebErrorKind::InvalidEvent(reason) => {
                debug!("Rejecting invalid event: {reason}");
                (StatusCode::UNPROCESSABLE_ENTITY, reason).into_response()
            }
        }
    }
}
