//! The graph data model (`spec.md` §3.2/§4.3): a typed, name-keyed directed
//! multigraph with a synthetic `root` node.
//!
//! Nodes and edges are addressed by *name*, not id — the same addressing
//! scheme the IR builder already uses for `ResourceArguments::condition` and
//! `DependsOn`. This is a deliberate departure from an index-based graph
//! library: cascading-failure and cycle analysis both need to reason about
//! "the node named X", and a name-keyed adjacency list matches that
//! vocabulary directly instead of routing every lookup through an id.

use common::indexmap::IndexMap;
use common::serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Parameter,
    Condition,
    Resource,
    Output,
}

#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
}

/// `condition-existence` edges mark that a node's very presence is gated by
/// a condition (a resource's `Condition` attribute, an output's
/// `Condition`). `condition-property` edges mark that only part of a node's
/// configuration is gated (an `Fn::If` inside a property or output value).
/// Everything else — plain data-flow references — uses `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    #[serde(rename = "")]
    Default,
    ConditionExistence,
    ConditionProperty,
}

#[derive(Debug, Clone, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub edge_type: EdgeKind,
}

/// The root node's fixed name, referenced by the builder and by the
/// no-sourced-output/-condition analyses.
pub const ROOT: &str = "root";

#[derive(Debug, Clone)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    node_by_name: IndexMap<String, usize>,
    outgoing: IndexMap<String, Vec<usize>>,
    incoming: IndexMap<String, Vec<usize>>,
}

impl Graph {
    pub(crate) fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut node_by_name = IndexMap::new();
        for (index, node) in nodes.iter().enumerate() {
            node_by_name.insert(node.name.clone(), index);
        }

        let mut outgoing: IndexMap<String, Vec<usize>> = IndexMap::new();
        let mut incoming: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (index, edge) in edges.iter().enumerate() {
            outgoing.entry(edge.from.clone()).or_default().push(index);
            incoming.entry(edge.to.clone()).or_default().push(index);
        }

        Graph {
            nodes,
            edges,
            node_by_name,
            outgoing,
            incoming,
        }
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.node_by_name.get(name).map(|&index| &self.nodes[index])
    }

    pub fn has_outgoing_edges(&self, name: &str) -> bool {
        self.outgoing.get(name).is_some_and(|edges| !edges.is_empty())
    }

    /// Names this node points to, in edge-creation order, including
    /// duplicates (a multigraph may have several edges to the same target).
    pub fn outgoing_names(&self, name: &str) -> Vec<&str> {
        self.outgoing
            .get(name)
            .map(|indices| indices.iter().map(|&i| self.edges[i].to.as_str()).collect())
            .unwrap_or_default()
    }

    /// Names of nodes this node's incoming edges originate from.
    pub fn incoming_names(&self, name: &str) -> Vec<&str> {
        self.incoming
            .get(name)
            .map(|indices| indices.iter().map(|&i| self.edges[i].from.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }
}
