use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DqnError, Result};
use crate::graph::observation::{EdgeRelation, HeteroGraph, NodeKind};

/// Declared structure of every observation a trainer accepts: node kinds with
/// their feature widths and relations with an optional edge-feature width.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSchema {
    node_dims: BTreeMap<NodeKind, usize>,
    relations: BTreeMap<EdgeRelation, Option<usize>>,
}

impl GraphSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, kind: NodeKind, feature_dim: usize) -> Self {
        self.node_dims.insert(kind, feature_dim);
        self
    }

    pub fn relation(mut self, relation: EdgeRelation, edge_dim: Option<usize>) -> Self {
        self.relations.insert(relation, edge_dim);
        self
    }

    /// Schema matching the structure of `graph`. Feature widths are read from
    /// the first row of each kind (zero when a kind has no rows).
    pub fn of(graph: &HeteroGraph) -> Self {
        let mut schema = Self::new();
        for kind in graph.node_kinds() {
            let dim = graph.features(kind).first().map_or(0, Vec::len);
            schema = schema.node(kind, dim);
        }
        for (relation, edges) in graph.relations() {
            let edge_dim = edges
                .attrs
                .as_ref()
                .map(|attrs| attrs.first().map_or(0, Vec::len));
            schema = schema.relation(relation, edge_dim);
        }
        schema
    }

    pub fn feature_dim(&self, kind: NodeKind) -> Option<usize> {
        self.node_dims.get(&kind).copied()
    }

    pub fn edge_dim(&self, relation: EdgeRelation) -> Option<usize> {
        self.relations.get(&relation).copied().flatten()
    }

    pub fn node_kinds(&self) -> impl Iterator<Item = (NodeKind, usize)> + '_ {
        self.node_dims.iter().map(|(k, d)| (*k, *d))
    }

    pub fn relations(&self) -> impl Iterator<Item = (EdgeRelation, Option<usize>)> + '_ {
        self.relations.iter().map(|(r, d)| (*r, *d))
    }

    /// Checks the schema is internally consistent: every relation endpoint is a declared kind.
    pub fn check(&self) -> Result<()> {
        if !self.node_dims.contains_key(&NodeKind::Application) {
            return Err(DqnError::SchemaMismatch(
                "schema must declare the application node kind".to_string(),
            ));
        }
        for relation in self.relations.keys() {
            for kind in [relation.source(), relation.target()] {
                if !self.node_dims.contains_key(&kind) {
                    return Err(DqnError::SchemaMismatch(format!(
                        "relation {relation} references undeclared node kind {kind}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Reject any observation whose structure differs from this schema.
    pub fn validate(&self, graph: &HeteroGraph) -> Result<()> {
        let graph_kinds: Vec<NodeKind> = graph.node_kinds().collect();
        let declared_kinds: Vec<NodeKind> = self.node_dims.keys().copied().collect();
        if graph_kinds != declared_kinds {
            return Err(DqnError::SchemaMismatch(format!(
                "node kinds {graph_kinds:?} differ from declared {declared_kinds:?}"
            )));
        }
        for (kind, dim) in self.node_kinds() {
            if let Some((row, features)) = graph
                .features(kind)
                .iter()
                .enumerate()
                .find(|(_, features)| features.len() != dim)
            {
                return Err(DqnError::SchemaMismatch(format!(
                    "{kind} node {row} has {} features, expected {dim}",
                    features.len()
                )));
            }
        }

        let graph_relations: Vec<EdgeRelation> = graph.relations().map(|(r, _)| r).collect();
        let declared_relations: Vec<EdgeRelation> = self.relations.keys().copied().collect();
        if graph_relations != declared_relations {
            return Err(DqnError::SchemaMismatch(format!(
                "relations {graph_relations:?} differ from declared {declared_relations:?}"
            )));
        }
        for (relation, edges) in graph.relations() {
            let sources = graph.num_nodes(relation.source());
            let targets = graph.num_nodes(relation.target());
            if let Some((src, dst)) = edges
                .index
                .iter()
                .find(|(src, dst)| *src >= sources || *dst >= targets)
            {
                return Err(DqnError::SchemaMismatch(format!(
                    "edge ({src}, {dst}) of {relation} is out of range for {sources} x {targets} nodes"
                )));
            }
            match (self.edge_dim(relation), &edges.attrs) {
                (None, None) => {}
                (Some(dim), Some(attrs)) => {
                    if attrs.len() != edges.len() {
                        return Err(DqnError::SchemaMismatch(format!(
                            "{relation} has {} edges but {} attribute rows",
                            edges.len(),
                            attrs.len()
                        )));
                    }
                    if attrs.iter().any(|row| row.len() != dim) {
                        return Err(DqnError::SchemaMismatch(format!(
                            "{relation} edge attributes must have width {dim}"
                        )));
                    }
                }
                (Some(_), None) => {
                    return Err(DqnError::SchemaMismatch(format!(
                        "{relation} is declared with edge attributes but none were given"
                    )));
                }
                (None, Some(_)) => {
                    return Err(DqnError::SchemaMismatch(format!(
                        "{relation} carries edge attributes the schema does not declare"
                    )));
                }
            }
        }
        Ok(())
    }
}
