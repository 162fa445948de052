use std::collections::BTreeMap;
use std::ops::Range;

use crate::graph::observation::{HeteroGraph, NodeKind};

/// Several observations merged into one disjoint graph.
///
/// Node rows of graph `i` follow those of graph `i - 1` for every kind and
/// edge endpoints are shifted accordingly. `membership(kind)[row]` gives the
/// graph a merged row came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphBatch {
    pub graph: HeteroGraph,
    membership: BTreeMap<NodeKind, Vec<usize>>,
    offsets: BTreeMap<NodeKind, Vec<usize>>,
    num_graphs: usize,
}

impl GraphBatch {
    pub fn from_graphs<'a, I>(graphs: I) -> Self
    where
        I: IntoIterator<Item = &'a HeteroGraph>,
    {
        let mut batch = GraphBatch::default();

        for (graph_idx, graph) in graphs.into_iter().enumerate() {
            let mut shift: BTreeMap<NodeKind, usize> = BTreeMap::new();
            for kind in graph.node_kinds() {
                let rows = batch.graph.nodes_mut(kind);
                shift.insert(kind, rows.len());
                batch.offsets.entry(kind).or_default().push(rows.len());
                rows.extend(graph.features(kind).iter().cloned());
                batch
                    .membership
                    .entry(kind)
                    .or_default()
                    .extend(std::iter::repeat(graph_idx).take(graph.num_nodes(kind)));
            }

            for (relation, edges) in graph.relations() {
                let src_shift = shift.get(&relation.source()).copied().unwrap_or(0);
                let dst_shift = shift.get(&relation.target()).copied().unwrap_or(0);
                let merged = batch.graph.edges_mut(relation);
                merged
                    .index
                    .extend(edges.index.iter().map(|(s, d)| (s + src_shift, d + dst_shift)));
                if let Some(attrs) = &edges.attrs {
                    merged
                        .attrs
                        .get_or_insert_with(Vec::new)
                        .extend(attrs.iter().cloned());
                }
            }
            batch.num_graphs += 1;
        }
        batch
    }

    pub fn num_graphs(&self) -> usize {
        self.num_graphs
    }

    /// Graph index of every merged row of `kind`.
    pub fn membership(&self, kind: NodeKind) -> &[usize] {
        self.membership.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Merged rows of `kind` that belong to graph `graph_idx`.
    pub fn rows(&self, kind: NodeKind, graph_idx: usize) -> Range<usize> {
        let Some(offsets) = self.offsets.get(&kind) else {
            return 0..0;
        };
        let Some(&start) = offsets.get(graph_idx) else {
            return 0..0;
        };
        let end = offsets
            .get(graph_idx + 1)
            .copied()
            .unwrap_or_else(|| self.graph.num_nodes(kind));
        start..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::observation::{EdgeRelation, EdgeSet};

    fn graph(apps: usize, infra: usize, edge: (usize, usize)) -> HeteroGraph {
        HeteroGraph::new()
            .with_nodes(NodeKind::Application, (0..apps).map(|i| vec![i as f32]).collect())
            .with_nodes(NodeKind::Infrastructure, (0..infra).map(|i| vec![i as f32, 0.0]).collect())
            .with_edges(
                EdgeRelation::AppToInfrastructure,
                EdgeSet::with_attrs(vec![edge], vec![vec![edge.0 as f32]]),
            )
    }

    #[test]
    fn batching_offsets_edges_and_tracks_membership() {
        let a = graph(2, 3, (1, 2));
        let b = graph(3, 1, (2, 0));
        let batch = GraphBatch::from_graphs([&a, &b]);

        assert_eq!(batch.num_graphs(), 2);
        assert_eq!(batch.graph.num_nodes(NodeKind::Application), 5);
        assert_eq!(batch.graph.num_nodes(NodeKind::Infrastructure), 4);
        assert_eq!(batch.membership(NodeKind::Application), &[0, 0, 1, 1, 1]);
        assert_eq!(batch.membership(NodeKind::Infrastructure), &[0, 0, 0, 1]);
        assert_eq!(batch.rows(NodeKind::Application, 1), 2..5);
        assert_eq!(batch.rows(NodeKind::Infrastructure, 0), 0..3);

        let edges = batch.graph.edges(EdgeRelation::AppToInfrastructure).unwrap();
        assert_eq!(edges.index, vec![(1, 2), (4, 3)]);
        assert_eq!(edges.attrs.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn empty_batch_has_no_rows() {
        let batch = GraphBatch::from_graphs(std::iter::empty::<&HeteroGraph>());
        assert_eq!(batch.num_graphs(), 0);
        assert!(batch.membership(NodeKind::Application).is_empty());
        assert_eq!(batch.rows(NodeKind::Application, 0), 0..0);
    }
}
