//! Rate-limited dispatcher for one upstream platform.
//!
//! The dispatcher serializes every outbound call to a platform through a
//! single processing pass:
//! - A fixed [`QuotaWindow`] caps calls per window
//! - A [`Cooldown`] learned from rate limit responses fails submissions fast
//! - A priority [`TaskQueue`] decides what runs next
//! - Governor (GCRA) paces consecutive dispatches when an inter-request delay is set
//!
//! Task closures run inside `catch_unwind`; a panicking task is rejected with
//! [`RateLimitErrorKind::Panicked`] and the pass carries on.
//!
//! Queue, window, cooldown and the `processing` flag live behind one mutex.
//! The flag is checked and set under that lock, so at most one pass (and
//! therefore at most one upstream call) is active per dispatcher.

use crate::classifier::{ErrorClassifier, MetaClassifier, TwitterClassifier};
use crate::pacer::Pacer;
use crate::queue::{PendingTask, TaskQueue};
use crate::task::{Job, TypedJob};
use crate::{
    Cooldown, DispatcherConfig, Platform, PlatformUsage, QuotaWindow, RateLimitError,
    RateLimitErrorKind, RateLimitExceeded, RateLimitResult,
};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use plume_error::UpstreamError;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Point-in-time view of a dispatcher, for health and monitoring endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaSnapshot {
    /// Platform name
    pub platform: String,
    /// Tasks waiting to run
    pub queue_length: usize,
    /// Whether a processing pass is active
    pub processing: bool,
    /// Calls admitted in the current window
    pub window_count: u32,
    /// Calls allowed per window
    pub max_per_window: u32,
    /// Milliseconds until the current window rolls over
    pub window_remaining_ms: u64,
    /// Whether a platform cooldown is in effect
    pub rate_limit_active: bool,
    /// End of the active cooldown
    pub reset_at: Option<DateTime<Utc>>,
    /// Last telemetry reported by the platform
    pub last_known_usage: Option<PlatformUsage>,
}

struct State {
    window: QuotaWindow,
    cooldown: Cooldown,
    queue: TaskQueue<Box<dyn Job>>,
    processing: bool,
}

enum Step {
    Idle,
    Wait(Duration),
    Execute(PendingTask<Box<dyn Job>>),
}

struct Shared {
    config: DispatcherConfig,
    classifier: Arc<dyn ErrorClassifier>,
    state: Mutex<State>,
    wake: Notify,
    pacer: Option<Pacer>,
}

/// Admits outbound calls to one platform.
///
/// Cloning is cheap; clones share the same queue, window and cooldown.
/// Construct one per platform and hand it to whatever needs to call that
/// platform.
///
/// Tasks are closures producing a future. A closure may be invoked more than
/// once when transient failures are retried.
///
/// # Example
///
/// ```rust,ignore
/// use plume_rate_limit::Dispatcher;
///
/// let twitter = Dispatcher::twitter();
/// let tweet_id = twitter
///     .submit(10, move || {
///         let client = client.clone();
///         async move { client.post_tweet(&text).await }
///     })
///     .await?;
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    /// Create a dispatcher with an explicit configuration and classifier.
    pub fn new(config: DispatcherConfig, classifier: Arc<dyn ErrorClassifier>) -> Self {
        let pacer = Pacer::new(*config.inter_request_delay());
        let state = State {
            window: QuotaWindow::new(
                *config.max_per_window(),
                *config.window_duration(),
                Instant::now(),
            ),
            cooldown: Cooldown::default(),
            queue: TaskQueue::new(),
            processing: false,
        };

        debug!(
            platform = %config.platform(),
            max_per_window = config.max_per_window(),
            window_secs = config.window_duration().as_secs(),
            max_retries = config.max_retries(),
            "Creating dispatcher"
        );

        Self {
            shared: Arc::new(Shared {
                config,
                classifier,
                state: Mutex::new(state),
                wake: Notify::new(),
                pacer,
            }),
        }
    }

    /// Dispatcher for a platform family with the matching classifier.
    pub fn for_platform(platform: Platform, config: DispatcherConfig) -> Self {
        let classifier: Arc<dyn ErrorClassifier> = match platform {
            Platform::Twitter => Arc::new(TwitterClassifier),
            Platform::Meta => Arc::new(MetaClassifier),
        };
        Self::new(config, classifier)
    }

    /// X posting API dispatcher with the built-in preset.
    pub fn twitter() -> Self {
        Self::for_platform(Platform::Twitter, DispatcherConfig::twitter())
    }

    /// Meta Graph API dispatcher with the built-in preset.
    pub fn meta() -> Self {
        Self::for_platform(Platform::Meta, DispatcherConfig::meta())
    }

    /// Platform name.
    pub fn platform(&self) -> &str {
        self.shared.config.platform()
    }

    /// Active configuration.
    pub fn config(&self) -> &DispatcherConfig {
        &self.shared.config
    }

    /// Submit a task and wait for its outcome.
    ///
    /// Higher `priority` values run first. Fails immediately with
    /// [`RateLimitErrorKind::LimitExceeded`] while a cooldown is active;
    /// otherwise the task is queued and this resolves once it succeeds, is
    /// rejected for a rate limit, or exhausts its retries.
    ///
    /// # Errors
    ///
    /// - `LimitExceeded` when the platform is (or becomes) rate limited
    /// - `Upstream` with the last failure once retries are exhausted
    /// - `Closed` if the dispatcher stops before replying
    #[instrument(skip(self, task), fields(platform = %self.platform()))]
    pub async fn submit<T, F, Fut>(&self, priority: i32, task: F) -> RateLimitResult<T>
    where
        T: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, UpstreamError>> + Send + 'static,
    {
        let (reply, receiver) = oneshot::channel::<RateLimitResult<T>>();

        {
            let mut state = self.shared.state.lock().await;
            let now = Utc::now();
            if state.cooldown.expire(now) {
                debug!("Cooldown elapsed");
            }
            if let Some(exceeded) = state.cooldown.exceeded(self.platform(), now) {
                warn!(
                    reset_at = %exceeded.reset_at,
                    seconds_remaining = exceeded.seconds_remaining,
                    "Rejecting submission during cooldown"
                );
                return Err(RateLimitError::new(RateLimitErrorKind::LimitExceeded(
                    exceeded,
                )));
            }

            let job: Box<dyn Job> = Box::new(TypedJob::new(task, reply));
            state
                .queue
                .push(PendingTask::new(job, priority, Instant::now()));
            debug!(priority, queue_length = state.queue.len(), "Task queued");
        }

        self.shared.kick().await;

        receiver.await.unwrap_or_else(|_| {
            Err(RateLimitError::new(RateLimitErrorKind::Closed(
                "task dropped before completion".to_string(),
            )))
        })
    }

    /// Submit a task with priority 0.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::submit`].
    pub async fn submit_default<T, F, Fut>(&self, task: F) -> RateLimitResult<T>
    where
        T: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, UpstreamError>> + Send + 'static,
    {
        self.submit(0, task).await
    }

    /// Current quota, queue and cooldown state. Has no side effects.
    pub async fn status(&self) -> QuotaSnapshot {
        let state = self.shared.state.lock().await;
        let now = Instant::now();
        let now_utc = Utc::now();
        let rate_limit_active = state.cooldown.is_active(now_utc);

        QuotaSnapshot {
            platform: self.platform().to_string(),
            queue_length: state.queue.len(),
            processing: state.processing,
            window_count: state.window.current_count(now),
            max_per_window: state.window.max_per_window(),
            window_remaining_ms: state.window.remaining(now).as_millis() as u64,
            rate_limit_active,
            reset_at: state.cooldown.reset_at().filter(|_| rate_limit_active),
            last_known_usage: state.cooldown.last_known_usage().cloned(),
        }
    }

    /// Lift any cooldown, start a fresh window and resume processing.
    ///
    /// Intended for operational tooling.
    #[instrument(skip(self), fields(platform = %self.platform()))]
    pub async fn clear_cooldown(&self) {
        {
            let mut state = self.shared.state.lock().await;
            state.cooldown.clear();
            state.window.reset(Instant::now());
        }
        info!("Cooldown cleared and window reset");
        // Only a pass waiting on window exhaustion listens; backoff sleeps run out
        self.shared.wake.notify_waiters();
        self.shared.kick().await;
    }

    /// Record usage telemetry observed on a successful response.
    ///
    /// Only affects status snapshots.
    pub async fn record_usage(&self, usage: PlatformUsage) {
        self.shared.state.lock().await.cooldown.record_usage(usage);
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

/// Clears `processing` if a pass ends without reaching idle.
struct PassGuard {
    shared: Arc<Shared>,
    finished: bool,
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        error!(platform = %self.shared.platform(), "Processing pass aborted");
        let shared = Arc::clone(&self.shared);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                shared.state.lock().await.processing = false;
                shared.kick().await;
            });
        }
    }
}

impl Shared {
    fn platform(&self) -> &str {
        self.config.platform()
    }

    /// Start a processing pass unless one is active or there is nothing to do.
    async fn kick(self: &Arc<Self>) {
        {
            let mut state = self.state.lock().await;
            if state.processing || state.queue.is_empty() {
                return;
            }
            state.processing = true;
        }

        tokio::spawn(Arc::clone(self).run());
    }

    async fn run(self: Arc<Self>) {
        debug!(platform = %self.platform(), "Processing pass started");
        let mut guard = PassGuard {
            shared: Arc::clone(&self),
            finished: false,
        };
        loop {
            // Registered before inspecting state so a clear_cooldown racing
            // with this iteration still wakes the window wait below.
            let woken = self.wake.notified();
            tokio::pin!(woken);
            woken.as_mut().enable();

            match self.next_step().await {
                Step::Idle => break,
                Step::Wait(wait) => {
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = &mut woken => debug!(platform = %self.platform(), "Woken early"),
                    }
                }
                Step::Execute(task) => {
                    if let Some(backoff) = self.execute(task).await {
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }
        guard.finished = true;
        debug!(platform = %self.platform(), "Processing pass finished");
    }

    /// Decide what the pass does next. Clears `processing` when going idle.
    async fn next_step(&self) -> Step {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        state.cooldown.expire(now);

        if let Some(exceeded) = state.cooldown.exceeded(self.platform(), now) {
            let rejected = state.queue.drain();
            if !rejected.is_empty() {
                warn!(
                    platform = %self.platform(),
                    count = rejected.len(),
                    reset_at = %exceeded.reset_at,
                    "Rejecting queued tasks during cooldown"
                );
            }
            for task in rejected {
                task.item.reject(RateLimitError::new(RateLimitErrorKind::LimitExceeded(
                    exceeded.clone(),
                )));
            }
            state.processing = false;
            return Step::Idle;
        }

        if state.queue.is_empty() {
            state.processing = false;
            return Step::Idle;
        }

        let instant = Instant::now();
        if state.window.roll(instant) {
            debug!(platform = %self.platform(), "Quota window rolled over");
        }

        if !state.window.has_capacity() {
            let wait = state.window.remaining(instant);
            debug!(
                platform = %self.platform(),
                count = state.window.count(),
                wait_ms = wait.as_millis() as u64,
                "Window exhausted, deferring"
            );
            return Step::Wait(wait);
        }

        match state.queue.pop() {
            Some(task) => {
                state.window.admit();
                debug!(
                    platform = %self.platform(),
                    priority = task.priority,
                    retry_count = task.retry_count,
                    window_count = state.window.count(),
                    queue_length = state.queue.len(),
                    "Dispatching task"
                );
                Step::Execute(task)
            }
            None => {
                state.processing = false;
                Step::Idle
            }
        }
    }

    /// Run one admitted task. Returns a backoff to wait out before continuing.
    async fn execute(&self, task: PendingTask<Box<dyn Job>>) -> Option<Duration> {
        let PendingTask {
            mut item,
            priority,
            retry_count,
            enqueued_at,
        } = task;

        if let Some(pacer) = &self.pacer {
            pacer.ready().await;
        }

        let outcome = AssertUnwindSafe(item.attempt()).catch_unwind().await;
        let error = match outcome {
            Ok(Ok(())) => {
                debug!(
                    platform = %self.platform(),
                    waited_ms = enqueued_at.elapsed().as_millis() as u64,
                    "Task completed"
                );
                return None;
            }
            Ok(Err(error)) => error,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(platform = %self.platform(), panic = %message, "Task panicked");
                item.reject(RateLimitError::new(RateLimitErrorKind::Panicked(message)));
                return None;
            }
        };

        let now = Utc::now();
        let classification = self.classifier.classify(&error, now);

        if classification.is_rate_limit {
            let reset_at = classification
                .reset_at
                .unwrap_or_else(|| now + self.default_cooldown());
            let exceeded = {
                let mut state = self.state.lock().await;
                state.cooldown.enter(reset_at, classification.usage);
                RateLimitExceeded::new(
                    self.platform(),
                    reset_at,
                    now,
                    state.cooldown.last_known_usage().cloned(),
                )
            };
            warn!(
                platform = %self.platform(),
                %reset_at,
                seconds_remaining = exceeded.seconds_remaining,
                error = %error.message,
                "Platform rate limit hit, entering cooldown"
            );
            item.reject(RateLimitError::new(RateLimitErrorKind::LimitExceeded(
                exceeded,
            )));
            return None;
        }

        if retry_count < self.config.max_retries() {
            let retry_count = retry_count + 1;
            let delay = self.config.backoff_delay(retry_count);
            warn!(
                platform = %self.platform(),
                retry_count,
                delay_ms = delay.as_millis() as u64,
                error = %error.message,
                "Transient failure, will retry"
            );
            self.state.lock().await.queue.push_front(PendingTask {
                item,
                priority,
                retry_count,
                enqueued_at,
            });
            return Some(delay);
        }

        warn!(
            platform = %self.platform(),
            retry_count,
            error = %error.message,
            "Retries exhausted"
        );
        item.reject(RateLimitError::new(RateLimitErrorKind::Upstream(error)));
        None
    }

    fn default_cooldown(&self) -> chrono::Duration {
        chrono::Duration::from_std(*self.config.default_cooldown())
            .unwrap_or_else(|_| chrono::Duration::days(365))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}
