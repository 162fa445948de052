//! Sum-aggregated heterogeneous message passing network.
//!
//! For every node kind `k` and node `i` of that kind:
//!
//! ```text
//! conv_i = root_k(x_i) + sum over relations r into k, edges (j, i) of r:
//!              message_r(x_j) + edge_r(e_ji)
//! out_i  = lin2_k(tanh(lin1_k(tanh(conv_i))))
//! ```
//!
//! `edge_r` only exists when the schema declares edge features for `r`.
use std::collections::BTreeMap;

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::deep::activation::{tanh, tanh_backward};
use crate::deep::linear::Linear;
use crate::error::{DqnError, Result};
use crate::estimator::{Mode, NodeValues, ValueEstimator};
use crate::graph::{EdgeRelation, GraphSchema, HeteroGraph, NodeKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct NodeHead {
    root: Linear,
    lin1: Linear,
    lin2: Linear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RelationLayer {
    message: Linear,
    edge: Option<Linear>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeteroGraphNet {
    schema: GraphSchema,
    hidden_size: usize,
    output_size: usize,
    #[serde(skip)]
    mode: Mode,
    heads: BTreeMap<NodeKind, NodeHead>,
    relations: BTreeMap<EdgeRelation, RelationLayer>,
}

/// Activations kept by a training forward pass.
#[derive(Debug, Clone)]
pub struct ForwardCache {
    input: HeteroGraph,
    h1: BTreeMap<NodeKind, Vec<Vec<f32>>>,
    h2: BTreeMap<NodeKind, Vec<Vec<f32>>>,
}

/// Offsets of each layer inside the flat parameter vector.
struct Layout {
    heads: BTreeMap<NodeKind, [usize; 3]>,
    relations: BTreeMap<EdgeRelation, (usize, Option<usize>)>,
}

impl HeteroGraphNet {
    pub fn new<R: Rng + ?Sized>(
        schema: GraphSchema,
        hidden_size: usize,
        output_size: usize,
        rng: &mut R,
    ) -> Result<Self> {
        schema.check()?;

        let mut heads = BTreeMap::new();
        for (kind, dim) in schema.node_kinds() {
            heads.insert(
                kind,
                NodeHead {
                    root: Linear::new(dim, hidden_size, true, rng),
                    lin1: Linear::new(hidden_size, hidden_size, true, rng),
                    lin2: Linear::new(hidden_size, output_size, true, rng),
                },
            );
        }

        let mut relations = BTreeMap::new();
        for (relation, edge_dim) in schema.relations() {
            let source_dim = schema.feature_dim(relation.source()).unwrap_or(0);
            relations.insert(
                relation,
                RelationLayer {
                    message: Linear::new(source_dim, hidden_size, false, rng),
                    edge: edge_dim
                        .map(|dim| Linear::new(dim, hidden_size, false, rng)),
                },
            );
        }

        let net = Self { schema, hidden_size, output_size, mode: Mode::Train, heads, relations };
        debug!(
            "Built heterogeneous estimator with {} parameters (hidden={}, outputs={})",
            net.num_parameters(),
            hidden_size,
            output_size
        );
        Ok(net)
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn layout(&self) -> (Layout, usize) {
        let mut offset = 0;
        let mut heads = BTreeMap::new();
        for (kind, head) in &self.heads {
            let root = offset;
            let lin1 = root + head.root.num_params();
            let lin2 = lin1 + head.lin1.num_params();
            offset = lin2 + head.lin2.num_params();
            heads.insert(*kind, [root, lin1, lin2]);
        }
        let mut relations = BTreeMap::new();
        for (relation, layer) in &self.relations {
            let message = offset;
            offset += layer.message.num_params();
            let edge = layer.edge.as_ref().map(|edge| {
                let start = offset;
                offset += edge.num_params();
                start
            });
            relations.insert(*relation, (message, edge));
        }
        (Layout { heads, relations }, offset)
    }

    /// Pre-activation of the graph convolution for every node of `kind`.
    fn convolve(&self, graph: &HeteroGraph, kind: NodeKind, head: &NodeHead) -> Vec<Vec<f32>> {
        let mut conv: Vec<Vec<f32>> =
            graph.features(kind).iter().map(|x| head.root.forward(x)).collect();

        for (relation, layer) in &self.relations {
            if relation.target() != kind {
                continue;
            }
            let Some(edges) = graph.edges(*relation) else {
                continue;
            };
            let sources = graph.features(relation.source());
            for (e, &(src, dst)) in edges.index.iter().enumerate() {
                let mut message = layer.message.forward(&sources[src]);
                if let (Some(edge_layer), Some(attrs)) = (&layer.edge, &edges.attrs) {
                    for (m, v) in message.iter_mut().zip(edge_layer.forward(&attrs[e])) {
                        *m += v;
                    }
                }
                for (c, m) in conv[dst].iter_mut().zip(message) {
                    *c += m;
                }
            }
        }
        conv
    }

    fn run(&self, graph: &HeteroGraph, mut cache: Option<&mut ForwardCache>) -> NodeValues {
        let mut values = NodeValues::new();
        for (kind, head) in &self.heads {
            let conv = self.convolve(graph, *kind, head);
            let h1: Vec<Vec<f32>> = conv.iter().map(|c| tanh(c)).collect();
            let h2: Vec<Vec<f32>> = h1.iter().map(|h| tanh(&head.lin1.forward(h))).collect();
            values.insert(*kind, h2.iter().map(|h| head.lin2.forward(h)).collect());
            if let Some(cache) = cache.as_deref_mut() {
                cache.h1.insert(*kind, h1);
                cache.h2.insert(*kind, h2);
            }
        }
        values
    }
}

impl ValueEstimator for HeteroGraphNet {
    type Cache = ForwardCache;

    fn schema(&self) -> &GraphSchema {
        &self.schema
    }

    fn output_size(&self) -> usize {
        self.output_size
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    fn infer(&self, graph: &HeteroGraph) -> Result<NodeValues> {
        self.schema.validate(graph)?;
        Ok(self.run(graph, None))
    }

    fn forward(&self, graph: &HeteroGraph) -> Result<(NodeValues, ForwardCache)> {
        if self.mode != Mode::Train {
            return Err(DqnError::Estimator(
                "training forward requested while the estimator is in eval mode".to_string(),
            ));
        }
        self.schema.validate(graph)?;
        let mut cache = ForwardCache { input: graph.clone(), h1: BTreeMap::new(), h2: BTreeMap::new() };
        let values = self.run(graph, Some(&mut cache));
        Ok((values, cache))
    }

    fn backward(&self, cache: &ForwardCache, grad_output: &NodeValues) -> Result<Vec<f32>> {
        let (layout, total) = self.layout();
        let mut grads = vec![0.0; total];
        let graph = &cache.input;

        for (kind, grad_rows) in grad_output {
            let (Some(head), Some(h1), Some(h2), Some(offsets)) = (
                self.heads.get(kind),
                cache.h1.get(kind),
                cache.h2.get(kind),
                layout.heads.get(kind),
            ) else {
                return Err(DqnError::Estimator(format!("no activations recorded for {kind} nodes")));
            };
            if grad_rows.len() != h1.len() {
                return Err(DqnError::Estimator(format!(
                    "got {} gradient rows for {} {kind} nodes",
                    grad_rows.len(),
                    h1.len()
                )));
            }
            let [root_at, lin1_at, lin2_at] = *offsets;
            let features = graph.features(*kind);

            let mut grad_conv = Vec::with_capacity(grad_rows.len());
            for (i, grad_out) in grad_rows.iter().enumerate() {
                if grad_out.len() != self.output_size {
                    return Err(DqnError::Estimator(format!(
                        "gradient row width {} does not match {} outputs",
                        grad_out.len(),
                        self.output_size
                    )));
                }
                let g = head.lin2.backward(
                    &h2[i],
                    grad_out,
                    &mut grads[lin2_at..lin2_at + head.lin2.num_params()],
                );
                let g = tanh_backward(&h2[i], &g);
                let g = head.lin1.backward(
                    &h1[i],
                    &g,
                    &mut grads[lin1_at..lin1_at + head.lin1.num_params()],
                );
                let g = tanh_backward(&h1[i], &g);
                head.root.backward(
                    &features[i],
                    &g,
                    &mut grads[root_at..root_at + head.root.num_params()],
                );
                grad_conv.push(g);
            }

            for (relation, layer) in &self.relations {
                if relation.target() != *kind {
                    continue;
                }
                let (Some(edges), Some(&(message_at, edge_at))) =
                    (graph.edges(*relation), layout.relations.get(relation))
                else {
                    continue;
                };
                let sources = graph.features(relation.source());
                for (e, &(src, dst)) in edges.index.iter().enumerate() {
                    layer.message.backward(
                        &sources[src],
                        &grad_conv[dst],
                        &mut grads[message_at..message_at + layer.message.num_params()],
                    );
                    if let (Some(edge_layer), Some(edge_at), Some(attrs)) =
                        (&layer.edge, edge_at, &edges.attrs)
                    {
                        edge_layer.backward(
                            &attrs[e],
                            &grad_conv[dst],
                            &mut grads[edge_at..edge_at + edge_layer.num_params()],
                        );
                    }
                }
            }
        }
        Ok(grads)
    }

    fn num_parameters(&self) -> usize {
        self.layout().1
    }

    fn parameters(&self) -> Vec<f32> {
        let mut params = Vec::with_capacity(self.num_parameters());
        for head in self.heads.values() {
            head.root.write_params(&mut params);
            head.lin1.write_params(&mut params);
            head.lin2.write_params(&mut params);
        }
        for layer in self.relations.values() {
            layer.message.write_params(&mut params);
            if let Some(edge) = &layer.edge {
                edge.write_params(&mut params);
            }
        }
        params
    }

    fn load_parameters(&mut self, params: &[f32]) -> Result<()> {
        let expected = self.num_parameters();
        if params.len() != expected {
            return Err(DqnError::Estimator(format!(
                "parameter vector has {} values, estimator expects {expected}",
                params.len()
            )));
        }
        let mut offset = 0;
        for head in self.heads.values_mut() {
            offset += head.root.read_params(&params[offset..]);
            offset += head.lin1.read_params(&params[offset..]);
            offset += head.lin2.read_params(&params[offset..]);
        }
        for layer in self.relations.values_mut() {
            offset += layer.message.read_params(&params[offset..]);
            if let Some(edge) = layer.edge.as_mut() {
                offset += edge.read_params(&params[offset..]);
            }
        }
        Ok(())
    }
}
