//! Per-platform request admission for outbound social platform calls.
//!
//! Each upstream platform gets its own [`Dispatcher`], which:
//! - executes queued calls one at a time, highest priority first
//! - caps calls per fixed window ([`QuotaWindow`])
//! - retries transient failures with a growing backoff
//! - enters a [`Cooldown`] when the platform reports rate limiting, failing
//!   new submissions fast until the reset time
//!
//! What counts as "rate limited" is platform specific and decided by an
//! injected [`ErrorClassifier`]. [`TwitterClassifier`] and [`MetaClassifier`]
//! ship as presets alongside [`DispatcherConfig::twitter`] and
//! [`DispatcherConfig::meta`].
//!
//! ```rust,ignore
//! use plume_rate_limit::{PlatformDispatchers, Platform};
//!
//! let dispatchers = PlatformDispatchers::presets();
//! let result = dispatchers
//!     .get(Platform::Meta)
//!     .submit(0, move || publish_page_post(client.clone(), post.clone()))
//!     .await;
//! ```

mod classifier;
mod config;
mod cooldown;
mod dispatcher;
mod error;
mod pacer;
mod platform;
mod queue;
mod registry;
mod task;
mod usage;
mod window;

pub use classifier::{
    Classification, ErrorClassifier, MetaClassifier, TwitterClassifier, META_RATE_LIMIT_CODES,
};
pub use config::{DispatcherConfig, DispatcherConfigBuilder, PlatformConfig, PlumeConfig};
pub use cooldown::Cooldown;
pub use dispatcher::{Dispatcher, QuotaSnapshot};
pub use error::{RateLimitError, RateLimitErrorKind, RateLimitExceeded, RateLimitResult};
pub use platform::Platform;
pub use queue::{PendingTask, TaskQueue};
pub use registry::PlatformDispatchers;
pub use usage::PlatformUsage;
pub use window::QuotaWindow;
