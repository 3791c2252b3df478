use serde::{Deserialize, Serialize};

/// A node in the flowchart graph.
///
/// Each node represents one command handed to the command runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique, case-sensitive identifier (`[A-Za-z0-9_-]+`).
    pub id: String,
    /// Command text, passed verbatim to the runner.
    pub command: String,
    /// 1-based source line of the declaration.
    #[serde(default)]
    pub line: usize,
}

impl Node {
    pub fn new(id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            command: command.into(),
            line: 0,
        }
    }

    /// Set the source line.
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_builder() {
        let node = Node::new("build", "cargo build").at_line(3);
        assert_eq!(node.id, "build");
        assert_eq!(node.command, "cargo build");
        assert_eq!(node.line, 3);
    }
}
