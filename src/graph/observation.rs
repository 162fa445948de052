use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Node kinds of the deployment graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Application,
    Infrastructure,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Application => write!(f, "application"),
            NodeKind::Infrastructure => write!(f, "infrastructure"),
        }
    }
}

/// Directed edge relations between node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeRelation {
    AppToInfrastructure,
    AppToApp,
    InfrastructureToInfrastructure,
}

impl EdgeRelation {
    /// Kind of the node an edge starts at.
    pub fn source(self) -> NodeKind {
        match self {
            EdgeRelation::AppToInfrastructure | EdgeRelation::AppToApp => NodeKind::Application,
            EdgeRelation::InfrastructureToInfrastructure => NodeKind::Infrastructure,
        }
    }

    /// Kind of the node an edge points to.
    pub fn target(self) -> NodeKind {
        match self {
            EdgeRelation::AppToApp => NodeKind::Application,
            EdgeRelation::AppToInfrastructure | EdgeRelation::InfrastructureToInfrastructure => {
                NodeKind::Infrastructure
            }
        }
    }
}

impl fmt::Display for EdgeRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeRelation::AppToInfrastructure => "app_to_infrastructural",
            EdgeRelation::AppToApp => "app_to_app",
            EdgeRelation::InfrastructureToInfrastructure => "infrastructural_to_infrastructural",
        };
        write!(f, "({}, {}, {})", self.source(), name, self.target())
    }
}

/// Edges of one relation. `index` holds `(source row, target row)` pairs;
/// `attrs`, when present, has one feature row per edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeSet {
    pub index: Vec<(usize, usize)>,
    pub attrs: Option<Vec<Vec<f32>>>,
}

impl EdgeSet {
    pub fn new(index: Vec<(usize, usize)>) -> Self {
        Self { index, attrs: None }
    }

    pub fn with_attrs(index: Vec<(usize, usize)>, attrs: Vec<Vec<f32>>) -> Self {
        Self { index, attrs: Some(attrs) }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// A heterogeneous graph observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeteroGraph {
    nodes: BTreeMap<NodeKind, Vec<Vec<f32>>>,
    edges: BTreeMap<EdgeRelation, EdgeSet>,
}

impl HeteroGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the feature rows of one node kind.
    pub fn with_nodes(mut self, kind: NodeKind, features: Vec<Vec<f32>>) -> Self {
        self.nodes.insert(kind, features);
        self
    }

    pub fn with_edges(mut self, relation: EdgeRelation, edges: EdgeSet) -> Self {
        self.edges.insert(relation, edges);
        self
    }

    /// Number of nodes of `kind`, zero when the kind is absent.
    pub fn num_nodes(&self, kind: NodeKind) -> usize {
        self.nodes.get(&kind).map_or(0, Vec::len)
    }

    /// Feature rows of `kind`.
    pub fn features(&self, kind: NodeKind) -> &[Vec<f32>] {
        self.nodes.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Edges of `relation`, if the graph has any.
    pub fn edges(&self, relation: EdgeRelation) -> Option<&EdgeSet> {
        self.edges.get(&relation)
    }

    pub fn node_kinds(&self) -> impl Iterator<Item = NodeKind> + '_ {
        self.nodes.keys().copied()
    }

    pub fn relations(&self) -> impl Iterator<Item = (EdgeRelation, &EdgeSet)> + '_ {
        self.edges.iter().map(|(r, e)| (*r, e))
    }

    /// Column `column` of every row of `kind`. Rows too short yield `0.0`.
    pub fn feature_column(&self, kind: NodeKind, column: usize) -> Vec<f32> {
        self.features(kind)
            .iter()
            .map(|row| row.get(column).copied().unwrap_or(0.0))
            .collect()
    }

    pub(crate) fn nodes_mut(&mut self, kind: NodeKind) -> &mut Vec<Vec<f32>> {
        self.nodes.entry(kind).or_default()
    }

    pub(crate) fn edges_mut(&mut self, relation: EdgeRelation) -> &mut EdgeSet {
        self.edges.entry(relation).or_default()
    }
}
