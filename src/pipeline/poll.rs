//! Status polling for cloud jobs.
//!
//! The loop is self-rescheduling: each request is awaited before the next
//! sleep starts, so a slow response delays the next poll instead of
//! overlapping it. Cadence:
//!
//! ```text
//! pending  ──sleep(interval = 1 s)──────▶ poll again
//! error    ──sleep(retry_interval = 2 s)─▶ poll again   (never surfaced)
//! done     ──▶ Ok(status)
//! failed   ──▶ Err(TaskFailed { detail })
//! ```
//!
//! Both ceilings in [`PollPolicy`] default to `None`, which polls until the
//! server reports a terminal state. Setting either turns an endless wait into
//! [`RepdfError::PollTimeout`].

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::clients::{RemoteApi, TaskProgress, TaskState, TaskStatus};
use crate::error::RepdfError;

/// Polling cadence and optional ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay after a pending status. Default: 1 s.
    pub interval: Duration,
    /// Delay after a failed status request. Default: 2 s.
    pub retry_interval: Duration,
    /// Maximum number of status requests. Default: unbounded.
    pub max_attempts: Option<u32>,
    /// Maximum wall-clock time spent polling. Default: unbounded.
    pub max_duration: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            retry_interval: Duration::from_secs(2),
            max_attempts: None,
            max_duration: None,
        }
    }
}

/// Poll `task_id` until it is done or failed.
///
/// `on_status` sees the progress block of every successful response;
/// `on_retry` sees every transient request failure with its 1-indexed
/// attempt number.
pub async fn poll_until_done(
    api: &dyn RemoteApi,
    task_id: &str,
    policy: &PollPolicy,
    mut on_status: impl FnMut(&TaskProgress),
    mut on_retry: impl FnMut(u32, &RepdfError),
) -> Result<TaskStatus, RepdfError> {
    let started = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        let exhausted = policy.max_attempts.is_some_and(|max| attempts >= max)
            || policy
                .max_duration
                .is_some_and(|max| started.elapsed() >= max);
        if exhausted {
            warn!("Giving up on task {} after {} polls", task_id, attempts);
            return Err(RepdfError::PollTimeout {
                task_id: task_id.to_string(),
                attempts,
                elapsed_secs: started.elapsed().as_secs(),
            });
        }

        attempts += 1;
        match api.task_status(task_id).await {
            Ok(status) => {
                if let Some(progress) = &status.progress {
                    on_status(progress);
                }
                match status.state() {
                    TaskState::Done => {
                        info!("Task {} done after {} polls", task_id, attempts);
                        return Ok(status);
                    }
                    TaskState::Failed => {
                        warn!("Task {} failed: {:?}", task_id, status.error);
                        return Err(RepdfError::TaskFailed {
                            task_id: task_id.to_string(),
                            detail: status.error,
                        });
                    }
                    TaskState::Pending => {
                        debug!("Task {} {} (poll {})", task_id, status.status, attempts);
                        sleep(policy.interval).await;
                    }
                }
            }
            Err(e) => {
                warn!("Status poll {} for {} failed: {}", attempts, task_id, e);
                on_retry(attempts, &e);
                sleep(policy.retry_interval).await;
            }
        }
    }
}
