use std::{future::Future, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::warn;

use flotilla_model::Task;

use crate::error::TaskError;

/// Bounded retry with a fixed delay and cancellation awareness.
///
/// The policy never inspects the business meaning of an error it retries;
/// classifying conflicts is the executor's job. The one exception is
/// [`TaskError::Canceled`], which is the engine's own control-flow signal
/// and is passed through immediately.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, not additional retries.
    pub max_retries: u32,
    /// Delay between attempts.
    pub retry_delay: Duration,
}

impl RetryPolicy {
    /// Build the policy from the task's retry settings.
    pub fn for_task(task: &Task) -> Self {
        Self {
            max_retries: task.max_retries,
            retry_delay: task.retry_delay_duration,
        }
    }

    /// Run `attempt` up to `max_retries` times.
    ///
    /// Returns the first success; [`TaskError::Canceled`] as soon as the
    /// token fires, including mid-delay and before the first attempt; or
    /// [`TaskError::Exhausted`] wrapping the last error once the budget is
    /// consumed.
    pub async fn execute<F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> Result<(), TaskError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), TaskError>>,
    {
        let mut last = None;
        for attempt_no in 1..=self.max_retries {
            if cancel.is_cancelled() {
                return Err(TaskError::Canceled);
            }

            match attempt().await {
                Ok(()) => return Ok(()),
                Err(TaskError::Canceled) => return Err(TaskError::Canceled),
                Err(err) => {
                    warn!(
                        attempt = attempt_no,
                        max_retries = self.max_retries,
                        error = %err,
                        "task attempt failed",
                    );
                    last = Some(err);
                }
            }

            if attempt_no < self.max_retries {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(TaskError::Canceled),
                    _ = tokio::time::sleep(self.retry_delay) => {}
                }
            }
        }

        let source = last.expect("retry policy always makes at least one attempt");
        Err(TaskError::Exhausted {
            attempts: self.max_retries,
            source: Box::new(source),
        })
    }
}
