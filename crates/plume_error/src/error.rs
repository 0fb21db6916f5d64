//! Top-level error wrapper types.

use crate::{ConfigError, UpstreamError};

/// Foundation error enum for Plume operations.
///
/// # Examples
///
/// ```
/// use plume_error::{PlumeError, UpstreamError};
///
/// let upstream = UpstreamError::new("connection reset").with_status(502);
/// let err: PlumeError = upstream.into();
/// assert!(format!("{}", err).contains("Upstream Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum PlumeErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Failure reported by an upstream platform call
    #[from(UpstreamError)]
    Upstream(UpstreamError),
}

/// Plume error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Plume Error: {}", _0)]
pub struct PlumeError(Box<PlumeErrorKind>);

impl PlumeError {
    /// Create a new error from a kind.
    pub fn new(kind: PlumeErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &PlumeErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to PlumeErrorKind
impl<T> From<T> for PlumeError
where
    T: Into<PlumeErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Plume operations.
pub type PlumeResult<T> = std::result::Result<T, PlumeError>;
