//! Command runners used to execute flowchart nodes.

pub mod shell;

pub use shell::ShellRunner;
