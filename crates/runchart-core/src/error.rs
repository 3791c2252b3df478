use thiserror::Error;

use crate::types::{EXIT_EXECUTION_ERROR, EXIT_INVALID};

#[derive(Debug, Error)]
pub enum RunchartError {
    // Parse errors
    #[error("cannot read flowchart {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("syntax error at line {line}: expected 'flowchart' declaration")]
    ExpectedHeader { line: usize },

    #[error("syntax error: no 'flowchart' declaration found")]
    MissingHeader,

    #[error("syntax error at line {line}: unsupported or invalid line")]
    InvalidLine { line: usize },

    #[error("syntax error at line {line}: unsupported edge label '{label}'")]
    UnsupportedLabel { line: usize, label: String },

    #[error("duplicate node id: {id} (line {line})")]
    DuplicateNode { id: String, line: usize },

    #[error("duplicate {kind} edge from {from} (line {line})")]
    DuplicateEdge {
        from: String,
        kind: String,
        line: usize,
    },

    // Validation errors
    #[error("undefined node '{id}' referenced at line {line}")]
    UndefinedNode { id: String, line: usize },

    #[error("no start node (in-degree 0) found")]
    NoStartNode,

    #[error("multiple start nodes found: {} ({})", .candidates.len(), .candidates.join(", "))]
    AmbiguousStartNode { candidates: Vec<String> },

    #[error("node '{id}' is unreachable from start node '{start}'")]
    UnreachableNode { id: String, start: String },

    // Execution errors
    #[error("execution aborted: max steps ({limit}) exceeded")]
    StepLimitExceeded { limit: usize, last_exit_code: i32 },

    #[error("command for node '{node}' could not be run: {message}")]
    Runner {
        node: String,
        message: String,
        last_exit_code: i32,
    },

    #[error("command cancelled")]
    Cancelled,

    #[error("run deadline of {timeout_secs}s exceeded")]
    DeadlineExceeded { timeout_secs: u64 },

    #[error("internal error: missing node {0}")]
    MissingNode(String),

    // Config errors
    #[error("config error: {0}")]
    Config(String),

    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunchartError {
    /// True for errors raised while reading or parsing flowchart text.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::Read { .. }
                | Self::ExpectedHeader { .. }
                | Self::MissingHeader
                | Self::InvalidLine { .. }
                | Self::UnsupportedLabel { .. }
                | Self::DuplicateNode { .. }
                | Self::DuplicateEdge { .. }
        )
    }

    /// True for structural errors found by the validator.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::UndefinedNode { .. }
                | Self::NoStartNode
                | Self::AmbiguousStartNode { .. }
                | Self::UnreachableNode { .. }
        )
    }

    /// Exit code of the last command observed before the run aborted, if any.
    pub fn last_exit_code(&self) -> Option<i32> {
        match self {
            Self::StepLimitExceeded { last_exit_code, .. }
            | Self::Runner { last_exit_code, .. } => Some(*last_exit_code),
            _ => None,
        }
    }

    /// Map the error onto a process exit code.
    ///
    /// Parse and validation failures exit with 2. Execution failures keep the
    /// last command's exit code when it is a usable non-zero status; an error
    /// paired with a zero (or sentinel) code still has to fail, so it becomes 1.
    pub fn exit_code(&self) -> i32 {
        if self.is_parse_error() || self.is_validation_error() {
            return EXIT_INVALID;
        }
        match self.last_exit_code() {
            Some(code) if (1..=255).contains(&code) => code,
            _ => EXIT_EXECUTION_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, RunchartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_validation_errors_exit_with_two() {
        assert_eq!(RunchartError::MissingHeader.exit_code(), 2);
        assert_eq!(RunchartError::InvalidLine { line: 3 }.exit_code(), 2);
        assert_eq!(
            RunchartError::UnreachableNode {
                id: "C".into(),
                start: "A".into()
            }
            .exit_code(),
            2
        );
    }

    #[test]
    fn execution_error_keeps_nonzero_code() {
        let err = RunchartError::StepLimitExceeded {
            limit: 5,
            last_exit_code: 3,
        };
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.last_exit_code(), Some(3));
    }

    #[test]
    fn execution_error_with_zero_or_sentinel_code_exits_one() {
        let err = RunchartError::StepLimitExceeded {
            limit: 5,
            last_exit_code: 0,
        };
        assert_eq!(err.exit_code(), 1);

        let err = RunchartError::Runner {
            node: "A".into(),
            message: "not found".into(),
            last_exit_code: -1,
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(RunchartError::MissingNode("X".into()).exit_code(), 1);
    }

    #[test]
    fn messages_carry_context() {
        let err = RunchartError::UndefinedNode {
            id: "B".into(),
            line: 4,
        };
        assert_eq!(err.to_string(), "undefined node 'B' referenced at line 4");

        let err = RunchartError::AmbiguousStartNode {
            candidates: vec!["A".into(), "C".into()],
        };
        assert_eq!(err.to_string(), "multiple start nodes found: 2 (A, C)");

        let err = RunchartError::StepLimitExceeded {
            limit: 10,
            last_exit_code: 0,
        };
        assert!(err.to_string().contains("max steps (10)"));
    }
}
