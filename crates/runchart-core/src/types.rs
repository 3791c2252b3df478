use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Process exit code for a flowchart that ran to completion successfully.
pub const EXIT_OK: i32 = 0;

/// Process exit code for an execution error without a usable command status.
pub const EXIT_EXECUTION_ERROR: i32 = 1;

/// Process exit code for parse and validation errors.
pub const EXIT_INVALID: i32 = 2;

/// Exit code recorded when the runner could not run a command at all.
pub const RUNNER_ERROR_EXIT_CODE: i32 = -1;

/// Transition ceiling used when none (or a non-positive one) is configured.
pub const DEFAULT_MAX_STEPS: usize = 1000;

/// Normalise a configured step ceiling; non-positive values fall back to the default.
pub fn normalize_max_steps(requested: i64) -> usize {
    if requested <= 0 {
        DEFAULT_MAX_STEPS
    } else {
        usize::try_from(requested).unwrap_or(usize::MAX)
    }
}

/// Cancellation context handed to the command runner for every node.
///
/// The token is cancelled on external interrupt; the optional deadline bounds
/// the whole run. Runners must terminate the in-flight command when either fires.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub cancel: CancellationToken,
    pub deadline: Option<Instant>,
    /// Length of the run deadline, kept for error reporting.
    pub timeout: Option<Duration>,
}

impl RunContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
            timeout: None,
        }
    }

    /// Bound the run by `timeout`, measured from now.
    ///
    /// A timeout too large to represent as an instant leaves the run unbounded.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self.timeout = self.deadline.map(|_| timeout);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}
