//! Plume - rate-limited dispatch of outbound social platform calls
//!
//! Plume keeps posting and Graph API calls inside each platform's quota:
//!
//! - **Per-platform dispatchers**: one for X, one for Meta, fully independent
//! - **Quota windows**: calls capped per fixed window, extra calls queue
//! - **Priorities**: queued calls run highest priority first
//! - **Cooldowns**: upstream rate limit responses fail new calls fast until reset
//! - **Retries**: transient failures retried with growing backoff
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use plume::{init_observability, Platform, PlatformDispatchers, PlumeConfig, UpstreamError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_observability()?;
//!     let dispatchers = PlatformDispatchers::from_config(&PlumeConfig::load()?)?;
//!
//!     let id = dispatchers
//!         .get(Platform::Twitter)
//!         .submit(0, || async { Ok::<_, UpstreamError>("1234") })
//!         .await?;
//!     println!("Posted {}", id);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod observability;

pub use observability::{init_observability, init_observability_with_config, ObservabilityConfig};

pub use plume_error::{ConfigError, PlumeError, PlumeErrorKind, PlumeResult, UpstreamError};
pub use plume_rate_limit::{
    Classification, Dispatcher, DispatcherConfig, DispatcherConfigBuilder, ErrorClassifier,
    MetaClassifier, Platform, PlatformConfig, PlatformDispatchers, PlatformUsage, PlumeConfig,
    QuotaSnapshot, RateLimitError, RateLimitErrorKind, RateLimitExceeded, RateLimitResult,
    TwitterClassifier,
};
