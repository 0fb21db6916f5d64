//! Dispatcher configuration.
//!
//! [`DispatcherConfig`] is what a [`crate::Dispatcher`] runs on. It can be
//! built in code (presets or the builder) or derived from TOML through
//! [`PlumeConfig`], which supports:
//! - Bundled defaults (include_str! from plume.toml)
//! - User overrides (./plume.toml or ~/.config/plume/plume.toml)
//! - Automatic merging with user values taking precedence

use crate::Platform;
use config::{Config, File, FileFormat};
use plume_error::{ConfigError, PlumeError, PlumeResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio_retry2::strategy::ExponentialBackoff;
use tracing::{debug, instrument};

/// Runtime settings for one dispatcher.
///
/// # Example
///
/// ```
/// use plume_rate_limit::DispatcherConfigBuilder;
/// use std::time::Duration;
///
/// let config = DispatcherConfigBuilder::default()
///     .platform("twitter")
///     .window_duration(Duration::from_secs(900))
///     .max_per_window(180u32)
///     .backoff(vec![Duration::from_secs(1), Duration::from_secs(2)])
///     .default_cooldown(Duration::from_secs(900))
///     .build()
///     .unwrap();
///
/// assert_eq!(config.max_retries(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, derive_builder::Builder, derive_getters::Getters)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct DispatcherConfig {
    /// Platform name used in logs, snapshots and rejections
    platform: String,
    /// Length of one quota window
    window_duration: Duration,
    /// Calls admitted per window
    max_per_window: u32,
    /// Minimum spacing between consecutive dispatches
    #[builder(default)]
    inter_request_delay: Duration,
    /// Delay before each retry of a transient failure; its length is the retry budget
    #[builder(default)]
    backoff: Vec<Duration>,
    /// Cooldown applied when a rate limit response carries no reset hint
    default_cooldown: Duration,
}

impl DispatcherConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.max_per_window == Some(0) {
            return Err("max_per_window must be positive".to_string());
        }
        if self.window_duration == Some(Duration::ZERO) {
            return Err("window_duration must be positive".to_string());
        }
        if let Some(backoff) = &self.backoff {
            if backoff.windows(2).any(|pair| pair[1] < pair[0]) {
                return Err("backoff delays must be non-decreasing".to_string());
            }
        }
        Ok(())
    }
}

impl DispatcherConfig {
    /// X posting API preset.
    ///
    /// 15-minute windows capped at 180 calls (below the vendor's 200),
    /// 100 ms between dispatches, retries after 1s, 2s, 5s and 10s.
    pub fn twitter() -> Self {
        Self {
            platform: Platform::Twitter.to_string(),
            window_duration: Duration::from_secs(15 * 60),
            max_per_window: 180,
            inter_request_delay: Duration::from_millis(100),
            backoff: secs(&[1, 2, 5, 10]),
            default_cooldown: Duration::from_secs(15 * 60),
        }
    }

    /// Meta Graph API preset.
    ///
    /// Hourly windows capped at 180 calls, no spacing between dispatches,
    /// retries after 2s, 5s, 10s and 30s.
    pub fn meta() -> Self {
        Self {
            platform: Platform::Meta.to_string(),
            window_duration: Duration::from_secs(60 * 60),
            max_per_window: 180,
            inter_request_delay: Duration::ZERO,
            backoff: secs(&[2, 5, 10, 30]),
            default_cooldown: Duration::from_secs(60 * 60),
        }
    }

    /// Preset for a platform family.
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Twitter => Self::twitter(),
            Platform::Meta => Self::meta(),
        }
    }

    /// Number of retries allowed for a transient failure.
    pub fn max_retries(&self) -> u32 {
        u32::try_from(self.backoff.len()).unwrap_or(u32::MAX)
    }

    /// Delay before retry number `retry_count` (1-based).
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        let index = (retry_count.max(1) - 1) as usize;
        self.backoff
            .get(index)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// Exponential backoff schedule capped at `max_delay_ms`.
    ///
    /// Delays double from `initial_ms`; the cap keeps the schedule
    /// non-decreasing.
    pub fn exponential_backoff(initial_ms: u64, max_delay_ms: u64, retries: usize) -> Vec<Duration> {
        ExponentialBackoff::from_millis(2)
            .factor((initial_ms / 2).max(1))
            .max_delay(Duration::from_millis(max_delay_ms))
            .take(retries)
            .collect()
    }
}

fn secs(values: &[u64]) -> Vec<Duration> {
    values.iter().copied().map(Duration::from_secs).collect()
}

/// TOML settings for one platform.
///
/// # Example
///
/// ```toml
/// [platforms.twitter]
/// window_secs = 900
/// max_per_window = 180
/// inter_request_delay_ms = 100
/// backoff_ms = [1000, 2000, 5000, 10000]
/// default_cooldown_secs = 900
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlatformConfig {
    /// Window length in seconds
    pub window_secs: u64,

    /// Calls admitted per window
    pub max_per_window: u32,

    /// Minimum spacing between dispatches in milliseconds
    #[serde(default)]
    pub inter_request_delay_ms: u64,

    /// Retry delays in milliseconds
    #[serde(default)]
    pub backoff_ms: Vec<u64>,

    /// Cooldown without a reset hint, in seconds (defaults to the window length)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_cooldown_secs: Option<u64>,
}

impl PlatformConfig {
    /// Convert into a validated dispatcher configuration for `platform`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a limit is zero or the backoff
    /// schedule decreases.
    pub fn to_dispatcher_config(&self, platform: &str) -> PlumeResult<DispatcherConfig> {
        DispatcherConfigBuilder::default()
            .platform(platform)
            .window_duration(Duration::from_secs(self.window_secs))
            .max_per_window(self.max_per_window)
            .inter_request_delay(Duration::from_millis(self.inter_request_delay_ms))
            .backoff(
                self.backoff_ms
                    .iter()
                    .copied()
                    .map(Duration::from_millis)
                    .collect::<Vec<_>>(),
            )
            .default_cooldown(Duration::from_secs(
                self.default_cooldown_secs.unwrap_or(self.window_secs),
            ))
            .build()
            .map_err(|e| {
                PlumeError::from(ConfigError::new(format!(
                    "Invalid configuration for platform '{}': {}",
                    platform, e
                )))
            })
    }
}

impl From<&DispatcherConfig> for PlatformConfig {
    fn from(config: &DispatcherConfig) -> Self {
        Self {
            window_secs: config.window_duration.as_secs(),
            max_per_window: config.max_per_window,
            inter_request_delay_ms: config.inter_request_delay.as_millis() as u64,
            backoff_ms: config
                .backoff
                .iter()
                .map(|delay| delay.as_millis() as u64)
                .collect(),
            default_cooldown_secs: Some(config.default_cooldown.as_secs()),
        }
    }
}

/// Top-level Plume configuration.
///
/// Loads dispatcher settings from TOML files with a precedence system:
/// 1. Bundled defaults (include_str! from plume.toml)
/// 2. User override (./plume.toml or ~/.config/plume/plume.toml)
///
/// # Example
///
/// ```no_run
/// use plume_rate_limit::PlumeConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PlumeConfig::load()?;
/// let twitter = config.dispatcher_config("twitter")?;
/// println!("X cap per window: {}", twitter.max_per_window());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct PlumeConfig {
    /// Map of platform name to platform configuration
    #[serde(default)]
    pub platforms: HashMap<String, PlatformConfig>,
}

impl PlumeConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> PlumeResult<Self> {
        debug!("Loading configuration from file");

        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                PlumeError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                PlumeError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Load configuration with precedence: user override > bundled default.
    ///
    /// Configuration sources in order of precedence (later sources override earlier):
    /// 1. Bundled defaults (plume.toml shipped with the library)
    /// 2. User config in home directory (~/.config/plume/plume.toml)
    /// 3. User config in current directory (./plume.toml)
    ///
    /// User config files are optional and silently skipped if not found.
    #[instrument]
    pub fn load() -> PlumeResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../plume.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/plume/plume.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("plume").required(false));

        builder
            .build()
            .map_err(|e| {
                PlumeError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                PlumeError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Raw settings for a platform, if configured.
    pub fn platform(&self, name: &str) -> Option<&PlatformConfig> {
        self.platforms.get(name)
    }

    /// Dispatcher configuration for a platform.
    ///
    /// Falls back to the built-in preset for known platforms that the
    /// configuration does not mention.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown platforms or invalid settings.
    #[instrument(skip(self))]
    pub fn dispatcher_config(&self, name: &str) -> PlumeResult<DispatcherConfig> {
        if let Some(platform) = self.platforms.get(name) {
            debug!(platform = name, "Using configured platform settings");
            return platform.to_dispatcher_config(name);
        }

        let platform: Platform = name.parse().map_err(|_| {
            PlumeError::from(ConfigError::new(format!(
                "No configuration for platform '{}'",
                name
            )))
        })?;
        debug!(platform = name, "Using built-in preset");
        Ok(DispatcherConfig::for_platform(platform))
    }
}
