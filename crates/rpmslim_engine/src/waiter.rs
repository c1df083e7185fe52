//! Polling of asynchronous tasks.
//!
//! Every mutating call against the service returns a task; nothing created
//! by that task is used before the task has been polled to a terminal
//! state here. Waiting is blocking poll-sleep-poll on the calling thread.

use crate::config::PollConfig;
use crate::error::{remote_err, EngineError, EngineResult};
use crate::warnings::{EngineWarning, WarningLog};
use rpmslim_api::{Href, PulpApi, Task};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Longest uninterrupted sleep between cancellation checks.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Shared flag that stops every wait observing it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clears a previous cancellation request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bounds on how many resources a create task should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expected {
    /// Fewer than this (when zero were created) is warned about.
    pub min: usize,
    /// More than this is warned about.
    pub max: usize,
}

impl Expected {
    /// A single create call creates exactly one resource.
    pub const EXACTLY_ONE: Expected = Expected { min: 1, max: 1 };

    /// Creates explicit bounds.
    pub fn between(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

impl Default for Expected {
    fn default() -> Self {
        Self::EXACTLY_ONE
    }
}

/// Polls tasks until they reach a terminal state.
pub struct TaskWaiter<'a, A: ?Sized> {
    api: &'a A,
    poll: &'a PollConfig,
    cancel: &'a CancelToken,
    warnings: &'a WarningLog,
}

impl<A: ?Sized> Clone for TaskWaiter<'_, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A: ?Sized> Copy for TaskWaiter<'_, A> {}

impl<'a, A: PulpApi + ?Sized> TaskWaiter<'a, A> {
    /// Creates a waiter.
    pub fn new(
        api: &'a A,
        poll: &'a PollConfig,
        cancel: &'a CancelToken,
        warnings: &'a WarningLog,
    ) -> Self {
        Self {
            api,
            poll,
            cancel,
            warnings,
        }
    }

    /// Polls `task` until it is terminal and returns the final record.
    ///
    /// A `failed` or `canceled` task is returned, not raised; the caller
    /// decides whether that is fatal. Without a configured deadline this
    /// blocks for as long as the task stays active.
    pub fn wait(&self, task: &Href) -> EngineResult<Task> {
        let start = Instant::now();
        loop {
            self.check_cancelled()?;
            let current = self
                .api
                .read_task(task)
                .map_err(remote_err("read_task", task))?;
            if current.state.is_terminal() {
                debug!(task = %task, name = %current.name, state = %current.state, "task finished");
                return Ok(current);
            }
            info!(
                task = %task,
                name = %current.name,
                state = %current.state,
                "waiting for task to complete"
            );
            self.pause(task, start)?;
        }
    }

    /// Waits for `task` and fails unless it completed successfully.
    pub fn wait_completed(&self, task: &Href) -> EngineResult<Task> {
        let done = self.wait(task)?;
        if done.state.is_success() {
            Ok(done)
        } else {
            Err(EngineError::TaskFailed {
                task: done.pulp_href.clone(),
                name: done.name.clone(),
                state: done.state,
                detail: done.error_description(),
            })
        }
    }

    /// Waits for a create task and returns the resources it created.
    ///
    /// A count outside `expected` is a warning, never an error: zero
    /// resources yields an empty list, too many are all returned.
    pub fn wait_created(&self, task: &Href, expected: Expected) -> EngineResult<Vec<Href>> {
        let done = self.wait_completed(task)?;
        let created = done.created_resources;

        if created.is_empty() && expected.min > 0 {
            self.warnings.push(EngineWarning::NoCreatedResources {
                task: task.clone(),
                expected: expected.min,
            });
        }
        if created.len() > expected.max {
            self.warnings.push(EngineWarning::TooManyCreatedResources {
                task: task.clone(),
                count: created.len(),
                max: expected.max,
            });
        }
        Ok(created)
    }

    /// Waits for every task in order, stopping at the first error.
    pub fn wait_all(&self, tasks: &[Href]) -> EngineResult<()> {
        for task in tasks {
            self.wait_completed(task)?;
        }
        Ok(())
    }

    fn check_cancelled(&self) -> EngineResult<()> {
        if self.cancel.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleeps one poll interval, observing cancellation and the deadline.
    fn pause(&self, task: &Href, start: Instant) -> EngineResult<()> {
        let wake = Instant::now() + self.poll.interval;
        loop {
            if let Some(deadline) = self.poll.deadline {
                let waited = start.elapsed();
                if waited >= deadline {
                    return Err(EngineError::Timeout {
                        task: task.clone(),
                        waited,
                    });
                }
            }
            self.check_cancelled()?;
            let now = Instant::now();
            if now >= wake {
                return Ok(());
            }
            std::thread::sleep((wake - now).min(SLEEP_SLICE));
        }
    }
}
