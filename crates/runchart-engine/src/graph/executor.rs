use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use runchart_core::error::{Result, RunchartError};
use runchart_core::traits::CommandRunner;
use runchart_core::types::{
    normalize_max_steps, RunContext, DEFAULT_MAX_STEPS, RUNNER_ERROR_EXIT_CODE,
};

use super::model::Graph;

/// Result of executing a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeResult {
    /// Which node was executed.
    pub node_id: String,
    /// Exit code reported by the runner.
    pub exit_code: i32,
    /// Execution time in milliseconds.
    pub elapsed_ms: u64,
}

impl NodeResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Result of a run that reached a node without a matching transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code of the last executed node.
    pub exit_code: i32,
    /// Per-node results in execution order.
    pub node_results: Vec<NodeResult>,
    /// Number of transitions taken.
    pub steps: usize,
    /// Total execution time in milliseconds.
    pub total_elapsed_ms: u64,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Walks a validated flowchart one node at a time.
///
/// Each node's command is handed to the runner; its exit code selects the
/// outgoing edge. Progress lines go to the output sink given to
/// [`Executor::execute`]. Loops are legal and bounded only by the step limit.
pub struct Executor<'g> {
    graph: &'g Graph,
    runner: Arc<dyn CommandRunner>,
    max_steps: usize,
}

impl<'g> Executor<'g> {
    pub fn new(graph: &'g Graph, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            graph,
            runner,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Set the transition ceiling. Non-positive values select the default.
    pub fn with_max_steps(mut self, max_steps: i64) -> Self {
        self.max_steps = normalize_max_steps(max_steps);
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Run the flowchart from `start` until no edge matches.
    ///
    /// Returns the last node's exit code inside [`ExecutionResult`]. Hitting
    /// the step limit or a runner error aborts with an error carrying the
    /// last exit code observed.
    pub async fn execute(
        &self,
        start: &str,
        ctx: &RunContext,
        out: &mut (dyn Write + Send),
    ) -> Result<ExecutionResult> {
        let run_start = Instant::now();
        let mut node_results = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut steps = 0usize;

        let mut current = self
            .graph
            .node(start)
            .ok_or_else(|| RunchartError::MissingNode(start.to_string()))?;
        visited.insert(current.id.as_str());

        loop {
            if ctx.is_cancelled() {
                return Err(RunchartError::Cancelled);
            }

            info!(node_id = %current.id, runner = self.runner.name(), "Executing flowchart node");
            let node_start = Instant::now();
            let outcome = self.runner.run(&current.command, ctx).await;
            let elapsed = node_start.elapsed();

            let exit_code = match &outcome {
                Ok(code) => *code,
                Err(_) => RUNNER_ERROR_EXIT_CODE,
            };
            if exit_code == 0 {
                writeln!(out, "✔ {} ({:.1}s)", current.id, elapsed.as_secs_f64())?;
            } else {
                writeln!(out, "✖ {} (exit {})", current.id, exit_code)?;
            }

            if let Err(e) = outcome {
                warn!(node_id = %current.id, error = %e, "Command could not be run");
                return Err(runner_failure(&current.id, e));
            }

            let elapsed_ms = elapsed.as_millis() as u64;
            debug!(node_id = %current.id, exit_code, elapsed_ms, "Node execution complete");
            node_results.push(NodeResult {
                node_id: current.id.clone(),
                exit_code,
                elapsed_ms,
            });

            let next_id = match self
                .graph
                .transitions(&current.id)
                .and_then(|t| t.resolve(exit_code))
            {
                Some(next) => next,
                None => {
                    debug!(node_id = %current.id, exit_code, "No matching edge, flowchart complete");
                    return Ok(ExecutionResult {
                        exit_code,
                        node_results,
                        steps,
                        total_elapsed_ms: run_start.elapsed().as_millis() as u64,
                    });
                }
            };

            if exit_code != 0 {
                writeln!(out, "→ branching to {}", next_id)?;
            }
            if !visited.insert(next_id) {
                writeln!(out, "↺ loop to {}", next_id)?;
            }

            steps += 1;
            if steps >= self.max_steps {
                warn!(limit = self.max_steps, exit_code, "Step limit reached, aborting");
                return Err(RunchartError::StepLimitExceeded {
                    limit: self.max_steps,
                    last_exit_code: exit_code,
                });
            }

            current = self
                .graph
                .node(next_id)
                .ok_or_else(|| RunchartError::MissingNode(next_id.to_string()))?;
        }
    }
}

/// Wrap a runner error with the node it happened on. Interrupts pass through.
fn runner_failure(node_id: &str, err: RunchartError) -> RunchartError {
    match err {
        RunchartError::Cancelled | RunchartError::DeadlineExceeded { .. } => err,
        RunchartError::Io(source) => RunchartError::Runner {
            node: node_id.to_string(),
            message: source.to_string(),
            last_exit_code: RUNNER_ERROR_EXIT_CODE,
        },
        other => RunchartError::Runner {
            node: node_id.to_string(),
            message: other.to_string(),
            last_exit_code: RUNNER_ERROR_EXIT_CODE,
        },
    }
}
