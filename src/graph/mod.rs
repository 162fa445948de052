//! Heterogeneous graph observations, their declared schema and batching.
pub mod batch;
pub mod observation;
pub mod schema;

pub use batch::GraphBatch;
pub use observation::{EdgeRelation, EdgeSet, HeteroGraph, NodeKind};
pub use schema::GraphSchema;
