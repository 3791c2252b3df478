use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use runchart_core::error::{Result, RunchartError};

use super::edge::{Edge, EdgeKind};
use super::node::Node;

/// Resolved outgoing transitions of one node, one slot per edge kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transitions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub by_code: BTreeMap<i32, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Transitions {
    /// Pick the next node for `exit_code`.
    ///
    /// Exact-code edges win, then success (code 0) or fail (non-zero), then default.
    pub fn resolve(&self, exit_code: i32) -> Option<&str> {
        if let Some(to) = self.by_code.get(&exit_code) {
            return Some(to);
        }
        let by_status = if exit_code == 0 {
            self.success.as_deref()
        } else {
            self.fail.as_deref()
        };
        by_status.or(self.default.as_deref())
    }

    /// Every target reachable through any edge kind.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.success
            .iter()
            .chain(self.fail.iter())
            .chain(self.by_code.values())
            .chain(self.default.iter())
            .map(String::as_str)
    }

    /// Record `to` under `kind`. Returns false if that slot is already taken.
    fn insert(&mut self, kind: EdgeKind, to: &str) -> bool {
        let slot = match kind {
            EdgeKind::ExactCode(code) => {
                return match self.by_code.entry(code) {
                    Entry::Occupied(_) => false,
                    Entry::Vacant(entry) => {
                        entry.insert(to.to_string());
                        true
                    }
                };
            }
            EdgeKind::Success => &mut self.success,
            EdgeKind::Fail => &mut self.fail,
            EdgeKind::Default => &mut self.default,
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(to.to_string());
        true
    }
}

/// In-memory flowchart: nodes, edges and per-node transition tables.
///
/// Edges may name nodes that are declared later (or never); the validator
/// checks referential integrity once parsing is done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    nodes: HashMap<String, Node>,
    /// Node ids in declaration order.
    order: Vec<String>,
    /// Edges in declaration order.
    edges: Vec<Edge>,
    transitions: HashMap<String, Transitions>,
    in_degree: HashMap<String, usize>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Fails if a node with the same id already exists.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(RunchartError::DuplicateNode {
                id: node.id,
                line: node.line,
            });
        }
        self.in_degree.entry(node.id.clone()).or_insert(0);
        self.order.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Record an edge in its source node's transition table.
    ///
    /// At most one success, fail and default edge may leave a node, and at
    /// most one exact-code edge per code.
    pub fn add_edge(&mut self, edge: Edge) -> Result<()> {
        let table = self.transitions.entry(edge.from.clone()).or_default();
        if !table.insert(edge.kind, &edge.to) {
            return Err(RunchartError::DuplicateEdge {
                from: edge.from,
                kind: edge.kind.to_string(),
                line: edge.line,
            });
        }

        *self.in_degree.entry(edge.to.clone()).or_insert(0) += 1;
        self.in_degree.entry(edge.from.clone()).or_insert(0);
        self.edges.push(edge);
        Ok(())
    }

    /// The unique node without incoming edges.
    ///
    /// Ids only referenced by edges take part in the count, so an edge from an
    /// undeclared id can make the start ambiguous; the validator reports
    /// undefined ids before asking for the start node.
    pub fn start_node(&self) -> Result<&str> {
        let mut candidates: Vec<&str> = self
            .in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| id.as_str())
            .collect();
        match candidates.len() {
            0 => Err(RunchartError::NoStartNode),
            1 => Ok(candidates[0]),
            _ => {
                candidates.sort_unstable();
                Err(RunchartError::AmbiguousStartNode {
                    candidates: candidates.into_iter().map(String::from).collect(),
                })
            }
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Edges in declaration order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Outgoing transitions of `id`, if it has any edges.
    pub fn transitions(&self, id: &str) -> Option<&Transitions> {
        self.transitions.get(id)
    }

    pub fn in_degree(&self, id: &str) -> usize {
        self.in_degree.get(id).copied().unwrap_or(0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
