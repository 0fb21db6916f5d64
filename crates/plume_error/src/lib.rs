//! Error types for the Plume library.
//!
//! This crate provides the foundation error types shared by the Plume crates.
//!
//! # Error Hierarchy
//!
//! Errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - Constructors use `#[track_caller]` for automatic location capture
//!
//! [`UpstreamError`] is the failure shape returned by platform calls. The
//! dispatcher's error classifiers inspect its status, platform code, headers
//! and body to decide whether a failure is a rate limit or a transient error.
//!
//! # Examples
//!
//! ```
//! use plume_error::{PlumeResult, ConfigError};
//!
//! fn load() -> PlumeResult<String> {
//!     Err(ConfigError::new("max_per_window must be positive"))?
//! }
//!
//! assert!(load().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod upstream;

pub use config::ConfigError;
pub use error::{PlumeError, PlumeErrorKind, PlumeResult};
pub use upstream::UpstreamError;
