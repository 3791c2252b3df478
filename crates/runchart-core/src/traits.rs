use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::RunContext;

/// Executes one node's command and reports its exit status.
///
/// A process that terminates normally, whatever its status, yields `Ok(code)`.
/// `Err` is reserved for commands that could not be run at all: spawn failure,
/// permission problems, cancellation or an expired deadline.
pub trait CommandRunner: Send + Sync + 'static {
    /// Run `command` under `ctx`, resolving to its exit code.
    fn run<'a>(&'a self, command: &'a str, ctx: &'a RunContext) -> BoxFuture<'a, Result<i32>>;

    /// Runner name, used in log fields.
    fn name(&self) -> &str {
        "runner"
    }
}
