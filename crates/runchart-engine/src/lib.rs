//! Flowchart interpretation engine.
//!
//! A flowchart is parsed from its line-oriented text form into a [`Graph`],
//! checked by the [`validator`] and then walked by the [`Executor`], which runs
//! one node's command at a time and follows the edge selected by its exit code.

pub mod commands;
pub mod graph;
pub mod parser;
pub mod validator;

pub use graph::{Edge, EdgeKind, ExecutionResult, Executor, Graph, Node, NodeResult, Transitions};
pub use parser::{parse_file, parse_str};
pub use validator::validate;
