//! Flowchart graph model and execution.
//!
//! A flowchart is a directed graph of `Node`s, each holding one shell command,
//! connected by `Edge`s tagged with the exit status that selects them
//! (success, fail, an exact exit code, or default).
//!
//! The `Executor` walks the graph from the unique start node, running each
//! node's command through a `CommandRunner` and following the highest-priority
//! matching edge until no edge matches.

pub mod edge;
pub mod executor;
pub mod model;
pub mod node;

pub use edge::{Edge, EdgeKind};
pub use executor::{ExecutionResult, Executor, NodeResult};
pub use model::{Graph, Transitions};
pub use node::Node;
