//! Line-oriented flowchart parser.
//!
//! Accepts the subset of Mermaid flowchart syntax that carries control flow:
//!
//! ```text
//! flowchart TD
//! %% comment
//! build[cargo build]
//! test[cargo test]
//! build --> test
//! test -- fail --> report
//! test -- 101 --> retry
//! test -- default --> report
//! ```
//!
//! Parsing stops at the first error; every error names its 1-based line.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use runchart_core::error::{Result, RunchartError};

use crate::graph::{Edge, EdgeKind, Graph, Node};

const BOM: char = '\u{feff}';

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^flowchart\b").unwrap())
}

fn node_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z0-9_\-]+)\s*\[(.+)\]$").unwrap())
}

fn labeled_edge_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9_\-]+?)\s*--\s*([A-Za-z0-9_\-]+?)\s*-->\s*([A-Za-z0-9_\-]+)$")
            .unwrap()
    })
}

// Source ids are lazy so `A-->B` does not read as an edge from `A-`.
fn plain_edge_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z0-9_\-]+?)\s*--?>\s*([A-Za-z0-9_\-]+)$").unwrap())
}

/// Read and parse a flowchart file.
pub fn parse_file(path: &Path) -> Result<Graph> {
    let text = std::fs::read_to_string(path).map_err(|source| RunchartError::Read {
        path: path.display().to_string(),
        source,
    })?;
    debug!(path = %path.display(), bytes = text.len(), "Parsing flowchart");
    parse_str(&text)
}

/// Parse flowchart text into a graph.
pub fn parse_str(text: &str) -> Result<Graph> {
    let mut graph = Graph::new();
    let mut seen_header = false;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let raw = if line == 1 {
            raw.strip_prefix(BOM).unwrap_or(raw)
        } else {
            raw
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() || is_comment(trimmed) {
            continue;
        }

        if !seen_header {
            if header_re().is_match(trimmed) {
                seen_header = true;
                continue;
            }
            return Err(RunchartError::ExpectedHeader { line });
        }

        parse_statement(&mut graph, trimmed, line)?;
    }

    if !seen_header {
        return Err(RunchartError::MissingHeader);
    }

    debug!(
        nodes = graph.node_count(),
        edges = graph.edges().len(),
        "Flowchart parsed"
    );
    Ok(graph)
}

fn is_comment(line: &str) -> bool {
    line.starts_with("%%") || line.starts_with("//")
}

/// Cosmetic Mermaid directives with no effect on control flow.
fn is_style_directive(line: &str) -> bool {
    line.starts_with("classDef") || line.starts_with("style")
}

fn parse_statement(graph: &mut Graph, line_text: &str, line: usize) -> Result<()> {
    if let Some(caps) = node_re().captures(line_text) {
        return graph.add_node(Node::new(&caps[1], &caps[2]).at_line(line));
    }

    // Labelled edges first, so `--` is not mistaken for the plain form.
    if let Some(caps) = labeled_edge_re().captures(line_text) {
        let kind = parse_label(&caps[2], line)?;
        return graph.add_edge(Edge::new(&caps[1], &caps[3], kind).at_line(line));
    }

    if let Some(caps) = plain_edge_re().captures(line_text) {
        return graph.add_edge(Edge::on_success(&caps[1], &caps[2]).at_line(line));
    }

    if is_style_directive(line_text) {
        return Ok(());
    }

    Err(RunchartError::InvalidLine { line })
}

fn parse_label(label: &str, line: usize) -> Result<EdgeKind> {
    let label = label.to_lowercase();
    match label.as_str() {
        "fail" => Ok(EdgeKind::Fail),
        "default" => Ok(EdgeKind::Default),
        other => other
            .parse::<i32>()
            .map(EdgeKind::ExactCode)
            .map_err(|_| RunchartError::UnsupportedLabel {
                line,
                label: other.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let g = parse_str("flowchart TD\nA[echo A]\nA --> B\nB[echo B]\n").unwrap();
        assert_eq!(g.node("A").unwrap().command, "echo A");
        assert_eq!(g.node("B").unwrap().line, 4);
        assert_eq!(g.transitions("A").unwrap().success.as_deref(), Some("B"));
        assert_eq!(g.edges()[0].line, 3);
    }

    #[test]
    fn test_parse_labels() {
        let g = parse_str(
            "flowchart LR\n\
             X[cmd]\n\
             Y[cmd]\n\
             Z[cmd]\n\
             W[cmd]\n\
             X -- fail --> Y\n\
             X -- DEFAULT --> Z\n\
             X -- 3 --> W\n\
             X -- -1 --> W\n",
        )
        .unwrap();
        let t = g.transitions("X").unwrap();
        assert_eq!(t.fail.as_deref(), Some("Y"));
        assert_eq!(t.default.as_deref(), Some("Z"));
        assert_eq!(t.by_code.get(&3).map(String::as_str), Some("W"));
        assert_eq!(t.by_code.get(&-1).map(String::as_str), Some("W"));
        assert!(t.success.is_none());
    }

    #[test]
    fn test_single_dash_edge_and_spacing() {
        let g = parse_str("flowchart TD\n  A[true]  \nA->B\nB[true]\nB-->C\nC[true]\n").unwrap();
        assert_eq!(g.transitions("A").unwrap().success.as_deref(), Some("B"));
        assert_eq!(g.transitions("B").unwrap().success.as_deref(), Some("C"));
    }

    #[test]
    fn test_unspaced_arrows_and_dashed_ids() {
        let g = parse_str(
            "flowchart TD\nA[x]\nB[y]\nstep-1[z]\nstep-2[w]\n\
             A-->B\nA--fail-->step-1\nstep-1 --> step-2\n",
        )
        .unwrap();
        let t = g.transitions("A").unwrap();
        assert_eq!(t.success.as_deref(), Some("B"));
        assert_eq!(t.fail.as_deref(), Some("step-1"));
        assert_eq!(
            g.transitions("step-1").unwrap().success.as_deref(),
            Some("step-2")
        );
    }

    #[test]
    fn test_command_text_kept_verbatim() {
        let g = parse_str("flowchart TD\nA[grep -q \"x]y\" file && echo [ok]]\n").unwrap();
        assert_eq!(
            g.node("A").unwrap().command,
            "grep -q \"x]y\" file && echo [ok]"
        );
    }

    #[test]
    fn test_comments_blank_lines_bom_and_styles() {
        let text = "\u{feff}%% leading comment\n\n// another\nflowchart TD\n\
                    classDef hot fill:#f00\nstyle A fill:#0f0\nA[true]\r\n";
        let g = parse_str(text).unwrap();
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.node("A").unwrap().command, "true");
    }

    #[test]
    fn test_missing_header() {
        let err = parse_str("A[echo]\n").unwrap_err();
        assert!(matches!(err, RunchartError::ExpectedHeader { line: 1 }));

        let err = parse_str("%% only a comment\n\n").unwrap_err();
        assert!(matches!(err, RunchartError::MissingHeader));

        let err = parse_str("").unwrap_err();
        assert!(matches!(err, RunchartError::MissingHeader));
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let err = parse_str("flowchart TD\nA[true]\nbad line here\n").unwrap_err();
        assert!(matches!(err, RunchartError::InvalidLine { line: 3 }));
        assert_eq!(
            err.to_string(),
            "syntax error at line 3: unsupported or invalid line"
        );

        // Empty brackets do not declare a node.
        let err = parse_str("flowchart TD\nA[]\n").unwrap_err();
        assert!(matches!(err, RunchartError::InvalidLine { line: 2 }));
    }

    #[test]
    fn test_unsupported_label() {
        let err = parse_str("flowchart TD\nA[x]\nB[y]\nA -- Retry --> B\n").unwrap_err();
        match err {
            RunchartError::UnsupportedLabel { line, label } => {
                assert_eq!(line, 4);
                assert_eq!(label, "retry");
            }
            other => panic!("expected UnsupportedLabel, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicates_abort_parse() {
        let err = parse_str("flowchart TD\nA[x]\nA[y]\n").unwrap_err();
        assert!(matches!(err, RunchartError::DuplicateNode { line: 3, .. }));

        let err = parse_str("flowchart TD\nA[x]\nB[y]\nC[z]\nA --> B\nA --> C\n").unwrap_err();
        assert!(matches!(err, RunchartError::DuplicateEdge { line: 6, .. }));
    }

    #[test]
    fn test_case_sensitive_ids() {
        let g = parse_str("flowchart TD\na[x]\nA[y]\na --> A\n").unwrap();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.start_node().unwrap(), "a");
    }

    #[test]
    fn test_parse_is_deterministic() {
        let text = "flowchart TD\nA[a]\nB[b]\nC[c]\nA --> B\nA -- fail --> C\nB -- 2 --> C\n";
        assert_eq!(parse_str(text).unwrap(), parse_str(text).unwrap());
    }

    #[test]
    fn test_parse_file_reports_missing_path() {
        let err = parse_file(Path::new("/nonexistent/flow.mmd")).unwrap_err();
        assert!(matches!(err, RunchartError::Read { .. }));
        assert_eq!(err.exit_code(), 2);
    }
}
