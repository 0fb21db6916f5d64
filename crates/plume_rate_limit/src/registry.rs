//! One dispatcher per platform family, constructed explicitly.

use crate::{Dispatcher, Platform, PlumeConfig, QuotaSnapshot};
use plume_error::PlumeResult;
use strum::IntoEnumIterator;
use tracing::{debug, instrument};

/// The X and Meta dispatchers, side by side.
///
/// The two share no state. Build this once at startup and pass it (or the
/// individual dispatchers) to request handlers.
///
/// # Example
///
/// ```no_run
/// use plume_rate_limit::{PlatformDispatchers, Platform, PlumeConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dispatchers = PlatformDispatchers::from_config(&PlumeConfig::load()?)?;
/// let meta = dispatchers.get(Platform::Meta);
/// println!("{:?}", meta.status().await);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct PlatformDispatchers {
    twitter: Dispatcher,
    meta: Dispatcher,
}

impl PlatformDispatchers {
    /// Pair two already constructed dispatchers.
    pub fn new(twitter: Dispatcher, meta: Dispatcher) -> Self {
        Self { twitter, meta }
    }

    /// Both dispatchers with built-in presets.
    pub fn presets() -> Self {
        Self::new(Dispatcher::twitter(), Dispatcher::meta())
    }

    /// Both dispatchers configured from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if a platform's settings are invalid.
    #[instrument(skip(config))]
    pub fn from_config(config: &PlumeConfig) -> PlumeResult<Self> {
        let twitter = config.dispatcher_config(Platform::Twitter.as_ref())?;
        let meta = config.dispatcher_config(Platform::Meta.as_ref())?;
        debug!("Building platform dispatchers from configuration");
        Ok(Self::new(
            Dispatcher::for_platform(Platform::Twitter, twitter),
            Dispatcher::for_platform(Platform::Meta, meta),
        ))
    }

    /// Dispatcher for a platform.
    pub fn get(&self, platform: Platform) -> &Dispatcher {
        match platform {
            Platform::Twitter => &self.twitter,
            Platform::Meta => &self.meta,
        }
    }

    /// Status of every dispatcher.
    pub async fn statuses(&self) -> Vec<QuotaSnapshot> {
        let mut snapshots = Vec::new();
        for platform in Platform::iter() {
            snapshots.push(self.get(platform).status().await);
        }
        snapshots
    }
}
