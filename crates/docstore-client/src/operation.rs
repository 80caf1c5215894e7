//! Long-running operation handles
//!
//! Some server commands start a job and return its id right away. An
//! [`Operation`] polls the job's status document through the executor until
//! it completes, faults or the caller's timeout elapses.
//!
//! ```no_run
//! use std::time::Duration;
//! use docstore_client::{ExecutorConfig, RequestExecutor};
//!
//! # async fn run() -> docstore_common::Result<()> {
//! let executor = RequestExecutor::new(
//!     vec!["http://127.0.0.1:8080".to_string()],
//!     "northwind",
//!     ExecutorConfig::default(),
//! )?;
//! let result = executor
//!     .operation(17)
//!     .wait_for_completion(Some(Duration::from_secs(30)))
//!     .await?;
//! println!("{}", result);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use docstore_common::transport::{HyperTransport, Transport};
use docstore_common::{DocstoreError, OperationId, OperationState, OperationStatus, Result};
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use crate::commands::GetOperationStateCommand;
use crate::executor::RequestExecutor;

/// Default time between two status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Handle on a long-running server operation.
pub struct Operation<'a, T: Transport = HyperTransport> {
    executor: &'a RequestExecutor<T>,
    id: OperationId,
    started: Instant,
    poll_interval: Duration,
}

/// What one poll decided.
#[derive(Debug, PartialEq)]
enum PollOutcome {
    Completed(Value),
    Faulted(String),
    TimedOut,
    Pending,
}

impl PollOutcome {
    /// Completed beats Faulted beats the timeout; anything else waits.
    fn evaluate(state: OperationState, elapsed: Duration, timeout: Option<Duration>) -> Self {
        match state.status {
            OperationStatus::Completed => PollOutcome::Completed(state.result.unwrap_or(Value::Null)),
            OperationStatus::Faulted => PollOutcome::Faulted(
                state
                    .error_message()
                    .unwrap_or_else(|| "operation faulted without an error message".to_string()),
            ),
            OperationStatus::Running if timeout.is_some_and(|t| elapsed > t) => PollOutcome::TimedOut,
            OperationStatus::Running => PollOutcome::Pending,
        }
    }
}

impl<'a, T: Transport> Operation<'a, T> {
    pub fn new(executor: &'a RequestExecutor<T>, id: OperationId) -> Self {
        Self {
            executor,
            id,
            started: Instant::now(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    /// Time since the handle was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Polls until the operation reaches a terminal state.
    ///
    /// Resolves with the operation's `Result` document on completion, fails
    /// with [`DocstoreError::OperationFailed`] when it faults and with
    /// [`DocstoreError::Timeout`] once `timeout` has elapsed since the call.
    /// A failed poll ends the wait with that error.
    pub async fn wait_for_completion(&self, timeout: Option<Duration>) -> Result<Value> {
        let command = GetOperationStateCommand::new(self.id);
        let wait_started = Instant::now();

        loop {
            let state = self.executor.execute(&command).await?;
            let elapsed = wait_started.elapsed();

            match PollOutcome::evaluate(state, elapsed, timeout) {
                PollOutcome::Completed(result) => {
                    debug!(operation_id = self.id, elapsed_ms = elapsed.as_millis() as u64, "Operation completed");
                    return Ok(result);
                }
                PollOutcome::Faulted(message) => {
                    return Err(DocstoreError::OperationFailed(message));
                }
                PollOutcome::TimedOut => {
                    return Err(DocstoreError::Timeout {
                        elapsed_ms: elapsed.as_millis() as u64,
                        url: None,
                    });
                }
                PollOutcome::Pending => tokio::time::sleep(self.poll_interval).await,
            }
        }
    }
}
