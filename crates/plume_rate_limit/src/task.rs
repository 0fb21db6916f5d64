//! Type-erased task wrapper.
//!
//! Callers submit closures returning any `T`; the queue only stores
//! `Box<dyn Job>`. A job replies to its caller through a oneshot channel,
//! either with the value on success or with the error it was rejected with.

use crate::{RateLimitError, RateLimitResult};
use async_trait::async_trait;
use plume_error::UpstreamError;
use std::future::Future;
use tokio::sync::oneshot;

#[async_trait]
pub(crate) trait Job: Send {
    /// Run the upstream call once. On success the value is delivered to the caller.
    async fn attempt(&mut self) -> Result<(), UpstreamError>;

    /// Give up on the task and deliver `error` to the caller.
    fn reject(self: Box<Self>, error: RateLimitError);
}

pub(crate) struct TypedJob<T, F> {
    task: F,
    reply: Option<oneshot::Sender<RateLimitResult<T>>>,
}

impl<T, F> TypedJob<T, F> {
    pub(crate) fn new(task: F, reply: oneshot::Sender<RateLimitResult<T>>) -> Self {
        Self {
            task,
            reply: Some(reply),
        }
    }
}

#[async_trait]
impl<T, F, Fut> Job for TypedJob<T, F>
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, UpstreamError>> + Send + 'static,
{
    async fn attempt(&mut self) -> Result<(), UpstreamError> {
        let value = (self.task)().await?;
        if let Some(reply) = self.reply.take() {
            // Caller may have stopped waiting
            let _ = reply.send(Ok(value));
        }
        Ok(())
    }

    fn reject(mut self: Box<Self>, error: RateLimitError) {
        if let Some(reply) = self.reply.take() {
            let _ = reply.send(Err(error));
        }
    }
}
