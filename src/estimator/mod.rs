//! Value function estimators over heterogeneous graph observations.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::{GraphSchema, HeteroGraph, NodeKind};

pub mod hetero_gnn;

pub use hetero_gnn::HeteroGraphNet;

/// Per node kind, one row of action values per node.
pub type NodeValues = BTreeMap<NodeKind, Vec<Vec<f32>>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Train,
    Eval,
}

/// Maps a graph observation to per-node action values.
///
/// `forward` records whatever `backward` needs and is only allowed in
/// [`Mode::Train`]; `infer` never records anything. Parameters are exchanged
/// as one flat vector so a second instance can be made an exact copy.
pub trait ValueEstimator: Clone {
    type Cache;

    fn schema(&self) -> &GraphSchema;

    fn output_size(&self) -> usize;

    fn mode(&self) -> Mode;

    fn set_mode(&mut self, mode: Mode);

    fn infer(&self, graph: &HeteroGraph) -> Result<NodeValues>;

    fn forward(&self, graph: &HeteroGraph) -> Result<(NodeValues, Self::Cache)>;

    /// Gradient of the loss w.r.t. every parameter, in `parameters()` order.
    /// Node kinds missing from `grad_output` contribute nothing.
    fn backward(&self, cache: &Self::Cache, grad_output: &NodeValues) -> Result<Vec<f32>>;

    fn num_parameters(&self) -> usize;

    fn parameters(&self) -> Vec<f32>;

    fn load_parameters(&mut self, params: &[f32]) -> Result<()>;
}
