//! Test doubles and fixtures shared by the runchart crates.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::Mutex;

use futures::future::BoxFuture;
use tempfile::NamedTempFile;

use runchart_core::error::{Result, RunchartError};
use runchart_core::traits::CommandRunner;
use runchart_core::types::RunContext;

/// Runner that replays a fixed script of outcomes instead of spawning anything.
///
/// Each call pops the next outcome; once the script is exhausted every command
/// exits 0. `Err(message)` entries become I/O errors, the way a failed spawn
/// surfaces from the shell runner.
pub struct ScriptedRunner {
    script: Mutex<VecDeque<std::result::Result<i32, String>>>,
    commands: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new(script: Vec<std::result::Result<i32, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Every command exits 0.
    pub fn succeeding() -> Self {
        Self::new(Vec::new())
    }

    /// Commands exit with `codes` in order, then 0.
    pub fn with_codes(codes: impl IntoIterator<Item = i32>) -> Self {
        Self::new(codes.into_iter().map(Ok).collect())
    }

    /// Commands received so far, in call order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run<'a>(&'a self, command: &'a str, _ctx: &'a RunContext) -> BoxFuture<'a, Result<i32>> {
        Box::pin(async move {
            self.commands.lock().unwrap().push(command.to_string());
            match self.script.lock().unwrap().pop_front() {
                Some(Ok(code)) => Ok(code),
                Some(Err(message)) => Err(RunchartError::Io(std::io::Error::other(message))),
                None => Ok(0),
            }
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Write flowchart text to a temporary file that lives as long as the handle.
pub fn flow_file(text: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".mmd")
        .tempfile()
        .unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
