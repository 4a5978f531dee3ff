//! Error types for the gateway core.
//!
//! Two error domains meet here. [`AppError`] belongs to the application:
//! it is what the application raises, and what the status callback raises
//! back into the application. [`GatewayError`] is what the gateway reports
//! to the connection driver.

use std::fmt;

use thiserror::Error;

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors reported by [`invoke`](crate::invoke) and
/// [`send_response`](crate::send_response).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A value handed over by the application has the wrong shape.
    #[error("type error: {0}")]
    Type(String),

    /// The application broke the calling protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Raised by the application itself; relayed unmodified.
    #[error("application error: {0}")]
    Application(#[from] AppError),

    /// Hard failure of the connection or of a file body.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// An error in the application's domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// The status callback was misused.
    #[error("contract violation: {0}")]
    Contract(String),

    /// An exception raised by application code.
    #[error("{0}")]
    Exception(ExcInfo),
}

impl AppError {
    /// Raise an application exception of the given kind.
    pub fn raise(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Exception(ExcInfo::new(kind, value))
    }

    pub(crate) fn contract(message: impl Into<String>) -> Self {
        Self::Contract(message.into())
    }

    /// The exception triple, if this is an application exception.
    pub fn exc_info(&self) -> Option<&ExcInfo> {
        match self {
            Self::Exception(info) => Some(info),
            Self::Contract(_) => None,
        }
    }
}

impl From<ExcInfo> for AppError {
    fn from(info: ExcInfo) -> Self {
        Self::Exception(info)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        Self::raise("IOError", e.to_string())
    }
}

/// Exception information: kind, value and optional traceback.
///
/// Passed as the third status callback argument when an application
/// replaces already reported headers after an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcInfo {
    pub kind: String,
    pub value: String,
    pub traceback: Option<String>,
}

impl ExcInfo {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
            traceback: None,
        }
    }

    pub fn with_traceback(mut self, traceback: impl Into<String>) -> Self {
        self.traceback = Some(traceback.into());
        self
    }
}

impl fmt::Display for ExcInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exc_info_display() {
        let info = ExcInfo::new("ValueError", "bad input");
        assert_eq!(format!("{info}"), "ValueError: bad input");
    }

    #[test]
    fn app_error_raise_carries_triple() {
        let err = AppError::raise("KeyError", "missing").exc_info().cloned();
        assert_eq!(err, Some(ExcInfo::new("KeyError", "missing")));
    }

    #[test]
    fn contract_error_has_no_exc_info() {
        let err = AppError::contract("nope");
        assert!(err.exc_info().is_none());
        assert_eq!(err.to_string(), "contract violation: nope");
    }

    #[test]
    fn io_error_becomes_exception() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = AppError::from(io);
        assert_eq!(err.exc_info().map(|i| i.kind.as_str()), Some("IOError"));
    }

    #[test]
    fn application_error_is_relayed() {
        let err = GatewayError::from(AppError::raise("RuntimeError", "boom"));
        assert!(matches!(
            &err,
            GatewayError::Application(AppError::Exception(info)) if info.value == "boom"
        ));
        assert_eq!(err.to_string(), "application error: RuntimeError: boom");
    }

    #[test]
    fn gateway_error_is_std_error() {
        let err = GatewayError::Protocol("x".into());
        let _: &dyn std::error::Error = &err;
    }
}
