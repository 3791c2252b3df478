use std::fmt;

use serde::{Deserialize, Serialize};

/// An edge connecting two nodes in the flowchart graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node id.
    pub from: String,
    /// Target node id.
    pub to: String,
    /// Exit status that selects this edge.
    #[serde(default)]
    pub kind: EdgeKind,
    /// 1-based source line of the edge statement.
    #[serde(default)]
    pub line: usize,
}

/// Exit status condition for taking an edge.
///
/// When several edges leave a node, an `ExactCode` match wins over
/// `Success`/`Fail`, which win over `Default`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "code", rename_all = "snake_case")]
pub enum EdgeKind {
    /// Taken when the command exits with 0. Unlabelled edges are success edges.
    #[default]
    Success,
    /// Taken on any non-zero exit.
    Fail,
    /// Taken only when the exit code equals the given value.
    ExactCode(i32),
    /// Taken when no other edge of the node matches.
    Default,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Success => f.write_str("success"),
            EdgeKind::Fail => f.write_str("fail"),
            EdgeKind::ExactCode(code) => write!(f, "exit-code {}", code),
            EdgeKind::Default => f.write_str("default"),
        }
    }
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
            line: 0,
        }
    }

    /// Create an edge taken on exit code 0.
    pub fn on_success(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(from, to, EdgeKind::Success)
    }

    /// Create an edge taken on any non-zero exit.
    pub fn on_failure(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(from, to, EdgeKind::Fail)
    }

    /// Create an edge taken on one specific exit code.
    pub fn on_code(from: impl Into<String>, to: impl Into<String>, code: i32) -> Self {
        Self::new(from, to, EdgeKind::ExactCode(code))
    }

    /// Create a fallback edge.
    pub fn fallback(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(from, to, EdgeKind::Default)
    }

    /// Set the source line.
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }
}
