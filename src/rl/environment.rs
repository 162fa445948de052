use crate::graph::HeteroGraph;

/// An environment observed as a heterogeneous graph and acted on with one
/// discrete action per application node.
pub trait GraphEnvironment {
    fn reset(&mut self) -> HeteroGraph;

    /// Apply `actions` and return the next observation and whether the episode ended.
    fn step(&mut self, actions: &[usize]) -> (HeteroGraph, bool);
}
