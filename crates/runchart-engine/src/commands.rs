//! Entry points behind the CLI subcommands.
//!
//! Each one takes a flowchart path plus output sinks and returns the process
//! exit code; errors are reported on `err_out` rather than returned.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use runchart_core::error::{Result, RunchartError};
use runchart_core::traits::CommandRunner;
use runchart_core::types::{RunContext, EXIT_INVALID, EXIT_OK};

use crate::graph::{Edge, Executor, Graph, Node};
use crate::parser::parse_file;
use crate::validator::validate as validate_graph;

/// Graph summary printed by `inspect`.
#[derive(Debug, Serialize)]
pub struct GraphReport<'a> {
    pub start: &'a str,
    pub nodes: Vec<&'a Node>,
    pub edges: &'a [Edge],
}

impl<'a> GraphReport<'a> {
    pub fn new(graph: &'a Graph, start: &'a str) -> Self {
        Self {
            start,
            nodes: graph.nodes().collect(),
            edges: graph.edges(),
        }
    }
}

fn load(path: &Path) -> Result<(Graph, String)> {
    let graph = parse_file(path)?;
    let start = validate_graph(&graph)?;
    Ok((graph, start))
}

fn report(err_out: &mut (dyn Write + Send), err: &RunchartError) {
    // Nothing sensible is left to do if stderr itself is gone.
    let _ = writeln!(err_out, "error: {}", err);
}

/// Parse, validate and run the flowchart at `path`.
pub async fn execute(
    path: &Path,
    out: &mut (dyn Write + Send),
    err_out: &mut (dyn Write + Send),
    runner: Arc<dyn CommandRunner>,
    max_steps: i64,
    ctx: &RunContext,
) -> i32 {
    let (graph, start) = match load(path) {
        Ok(loaded) => loaded,
        Err(e) => {
            report(err_out, &e);
            return EXIT_INVALID;
        }
    };

    let executor = Executor::new(&graph, runner).with_max_steps(max_steps);
    match executor.execute(&start, ctx, out).await {
        Ok(result) => {
            info!(
                exit_code = result.exit_code,
                nodes_run = result.node_results.len(),
                steps = result.steps,
                elapsed_ms = result.total_elapsed_ms,
                "Flowchart finished"
            );
            result.exit_code
        }
        Err(e) => {
            error!(error = %e, "Flowchart aborted");
            report(err_out, &e);
            e.exit_code()
        }
    }
}

/// Parse and validate only. Prints `valid` on success.
pub fn validate(path: &Path, out: &mut (dyn Write + Send), err_out: &mut (dyn Write + Send)) -> i32 {
    match load(path) {
        Ok(_) => match writeln!(out, "valid") {
            Ok(()) => EXIT_OK,
            Err(e) => {
                report(err_out, &RunchartError::from(e));
                EXIT_INVALID
            }
        },
        Err(e) => {
            report(err_out, &e);
            EXIT_INVALID
        }
    }
}

/// Parse and validate, then print the graph as pretty JSON.
pub fn inspect(path: &Path, out: &mut (dyn Write + Send), err_out: &mut (dyn Write + Send)) -> i32 {
    let (graph, start) = match load(path) {
        Ok(loaded) => loaded,
        Err(e) => {
            report(err_out, &e);
            return EXIT_INVALID;
        }
    };
    let rendered = serde_json::to_string_pretty(&GraphReport::new(&graph, &start))
        .map_err(|e| RunchartError::Io(e.into()))
        .and_then(|json| writeln!(out, "{}", json).map_err(RunchartError::from));
    match rendered {
        Ok(()) => EXIT_OK,
        Err(e) => {
            report(err_out, &e);
            EXIT_INVALID
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runchart_test_utils::{flow_file, ScriptedRunner};

    async fn run(text: &str, runner: Arc<ScriptedRunner>, max_steps: i64) -> (i32, String, String) {
        let file = flow_file(text);
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = execute(
            file.path(),
            &mut out,
            &mut err,
            runner,
            max_steps,
            &RunContext::default(),
        )
        .await;
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_execute_success_exits_zero() {
        let runner = Arc::new(ScriptedRunner::succeeding());
        let (code, out, err) = run("flowchart TD\nA[a]\nB[b]\nA --> B\n", runner, 0).await;
        assert_eq!(code, 0);
        assert_eq!(out.lines().count(), 2);
        assert!(err.is_empty());
    }

    #[tokio::test]
    async fn test_execute_returns_last_code() {
        let runner = Arc::new(ScriptedRunner::with_codes([0, 5]));
        let (code, _, err) = run("flowchart TD\nA[a]\nB[b]\nA --> B\n", runner, 0).await;
        assert_eq!(code, 5);
        assert!(err.is_empty());
    }

    #[tokio::test]
    async fn test_execute_invalid_graph_never_runs() {
        let runner = Arc::new(ScriptedRunner::succeeding());
        let (code, out, err) = run("flowchart TD\nA[a]\nA --> B\n", runner.clone(), 0).await;
        assert_eq!(code, 2);
        assert!(out.is_empty());
        assert!(err.contains("undefined node 'B'"));
        assert!(runner.commands().is_empty());
    }

    #[tokio::test]
    async fn test_execute_step_limit_exits_one() {
        let runner = Arc::new(ScriptedRunner::succeeding());
        let (code, _, err) = run(
            "flowchart TD\nS[s]\nA[a]\nB[b]\nS --> A\nA --> B\nB --> A\n",
            runner,
            4,
        )
        .await;
        assert_eq!(code, 1);
        assert!(err.contains("max steps (4) exceeded"));
    }

    #[tokio::test]
    async fn test_execute_runner_error_exits_one() {
        let runner = Arc::new(ScriptedRunner::new(vec![Err("permission denied".into())]));
        let (code, out, err) = run("flowchart TD\nA[./locked]\n", runner, 0).await;
        assert_eq!(code, 1);
        assert_eq!(out, "✖ A (exit -1)\n");
        assert!(err.contains("permission denied"));
    }

    #[test]
    fn test_validate_prints_valid() {
        let file = flow_file("flowchart TD\nA[a]\nB[b]\nA --> B\n");
        let mut out = Vec::new();
        let mut err = Vec::new();
        assert_eq!(validate(file.path(), &mut out, &mut err), 0);
        assert_eq!(String::from_utf8(out).unwrap(), "valid\n");
        assert!(err.is_empty());
    }

    #[test]
    fn test_validate_reports_errors() {
        let file = flow_file("flowchart TD\nA[a]\nB[b]\n");
        let mut out = Vec::new();
        let mut err = Vec::new();
        assert_eq!(validate(file.path(), &mut out, &mut err), 2);
        assert!(out.is_empty());
        assert!(String::from_utf8(err).unwrap().contains("multiple start nodes"));

        let mut err = Vec::new();
        let code = validate(Path::new("/nonexistent/flow.mmd"), &mut Vec::new(), &mut err);
        assert_eq!(code, 2);
    }

    #[test]
    fn test_inspect_prints_graph_json() {
        let file = flow_file("flowchart TD\nA[echo a]\nB[echo b]\nA -- 3 --> B\n");
        let mut out = Vec::new();
        let mut err = Vec::new();
        assert_eq!(inspect(file.path(), &mut out, &mut err), 0);

        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["start"], "A");
        assert_eq!(json["nodes"][0]["command"], "echo a");
        assert_eq!(json["nodes"][1]["line"], 3);
        assert_eq!(json["edges"][0]["kind"]["type"], "exact_code");
        assert_eq!(json["edges"][0]["kind"]["code"], 3);
    }
}
