use std::process::{ExitStatus, Stdio};

use futures::future::BoxFuture;
use tokio::process::Command;
use tracing::{debug, warn};

use runchart_core::config::RunnerConfig;
use runchart_core::error::{Result, RunchartError};
use runchart_core::traits::CommandRunner;
use runchart_core::types::RunContext;

/// Runs node commands through the host shell (`/bin/sh -c` by default).
///
/// Any normal exit, zero or not, is reported as `Ok(code)`. Spawn failures and
/// processes killed by a signal are errors. When the run is cancelled or its
/// deadline passes, the child is killed and reaped before returning.
pub struct ShellRunner {
    config: RunnerConfig,
}

impl ShellRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    fn command(&self, command: &str) -> Command {
        let mut cmd = Command::new(&self.config.shell);
        cmd.args(&self.config.shell_args)
            .arg(command)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if self.config.show_output {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        if let Some(dir) = self.config.working_dir() {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

impl CommandRunner for ShellRunner {
    fn name(&self) -> &str {
        "shell"
    }

    fn run<'a>(&'a self, command: &'a str, ctx: &'a RunContext) -> BoxFuture<'a, Result<i32>> {
        Box::pin(async move {
            debug!(command = %command, shell = %self.config.shell, "Spawning node command");
            let mut child = self.command(command).spawn()?;

            let deadline = async {
                match ctx.deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                status = child.wait() => exit_code(status?),
                _ = ctx.cancel.cancelled() => {
                    warn!(command = %command, "Run cancelled, killing command");
                    child.kill().await.ok();
                    Err(RunchartError::Cancelled)
                }
                _ = deadline => {
                    let timeout_secs = ctx.timeout.map(|t| t.as_secs()).unwrap_or(0);
                    warn!(command = %command, timeout_secs, "Run deadline passed, killing command");
                    child.kill().await.ok();
                    Err(RunchartError::DeadlineExceeded { timeout_secs })
                }
            }
        })
    }
}

fn exit_code(status: ExitStatus) -> Result<i32> {
    if let Some(code) = status.code() {
        return Ok(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Err(RunchartError::Io(std::io::Error::other(format!(
                "command terminated by signal {}",
                signal
            ))));
        }
    }
    Err(RunchartError::Io(std::io::Error::other(
        "command terminated without an exit code",
    )))
}
