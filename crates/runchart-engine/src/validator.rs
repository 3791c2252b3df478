//! Static checks run on a parsed graph before anything is executed.
//!
//! Checks run in order and stop at the first failure:
//! 1. every edge endpoint names a declared node,
//! 2. exactly one node has no incoming edges,
//! 3. every node is reachable from that start node.
//!
//! Cycles are allowed; runaway loops are bounded at run time by the step limit.

use std::collections::HashSet;

use tracing::debug;

use runchart_core::error::{Result, RunchartError};

use crate::graph::Graph;

/// Validate `graph`, returning the id of its start node.
pub fn validate(graph: &Graph) -> Result<String> {
    check_references(graph)?;
    let start = graph.start_node()?.to_string();
    check_reachable(graph, &start)?;
    debug!(start = %start, nodes = graph.node_count(), "Flowchart validated");
    Ok(start)
}

fn check_references(graph: &Graph) -> Result<()> {
    for edge in graph.edges() {
        for id in [&edge.from, &edge.to] {
            if !graph.contains(id) {
                return Err(RunchartError::UndefinedNode {
                    id: id.clone(),
                    line: edge.line,
                });
            }
        }
    }
    Ok(())
}

fn check_reachable(graph: &Graph, start: &str) -> Result<()> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack = vec![start];
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        if let Some(transitions) = graph.transitions(id) {
            stack.extend(transitions.targets().filter(|t| !visited.contains(t)));
        }
    }

    match graph.nodes().find(|n| !visited.contains(n.id.as_str())) {
        Some(node) => Err(RunchartError::UnreachableNode {
            id: node.id.clone(),
            start: start.to_string(),
        }),
        None => Ok(()),
    }
}
