use crate::error::{DqnError, Result};
use crate::graph::{GraphBatch, GraphSchema, HeteroGraph, NodeKind};

/// One transition: an observation, the action and reward of every
/// application node, and the observation that followed.
#[derive(Debug, Clone, PartialEq)]
pub struct Experience {
    pub observation: HeteroGraph,
    pub actions: Vec<usize>,
    pub rewards: Vec<f32>,
    pub next_observation: HeteroGraph,
}

impl Experience {
    pub fn new(
        observation: HeteroGraph,
        actions: Vec<usize>,
        rewards: Vec<f32>,
        next_observation: HeteroGraph,
    ) -> Self {
        Self { observation, actions, rewards, next_observation }
    }

    /// Check both observations against `schema` and that actions and rewards
    /// line up with the application nodes.
    pub fn validate(&self, schema: &GraphSchema, output_size: usize) -> Result<()> {
        schema.validate(&self.observation)?;
        schema.validate(&self.next_observation)?;

        let apps = self.observation.num_nodes(NodeKind::Application);
        let next_apps = self.next_observation.num_nodes(NodeKind::Application);
        if next_apps != apps {
            return Err(DqnError::InvalidExperience(format!(
                "observation has {apps} application nodes but the next observation has {next_apps}"
            )));
        }
        if self.actions.len() != apps {
            return Err(DqnError::InvalidExperience(format!(
                "{} actions for {apps} application nodes",
                self.actions.len()
            )));
        }
        if self.rewards.len() != apps {
            return Err(DqnError::InvalidExperience(format!(
                "{} rewards for {apps} application nodes",
                self.rewards.len()
            )));
        }
        if let Some(action) = self.actions.iter().find(|a| **a >= output_size) {
            return Err(DqnError::InvalidExperience(format!(
                "action {action} is outside [0, {output_size})"
            )));
        }
        if let Some((node, reward)) = self.rewards.iter().enumerate().find(|(_, r)| !r.is_finite()) {
            return Err(DqnError::InvalidExperience(format!(
                "reward {reward} of application node {node} is not finite"
            )));
        }
        for (name, graph) in [("observation", &self.observation), ("next observation", &self.next_observation)] {
            if let Some(location) = first_non_finite(graph) {
                return Err(DqnError::InvalidExperience(format!(
                    "{name} has a non-finite value in {location}"
                )));
            }
        }
        Ok(())
    }
}

/// Where the first NaN or infinite feature of `graph` sits, if any.
fn first_non_finite(graph: &HeteroGraph) -> Option<String> {
    for kind in graph.node_kinds() {
        for (row, features) in graph.features(kind).iter().enumerate() {
            if features.iter().any(|x| !x.is_finite()) {
                return Some(format!("{kind} node {row}"));
            }
        }
    }
    for (relation, edges) in graph.relations() {
        let Some(attrs) = &edges.attrs else {
            continue;
        };
        for (edge, row) in attrs.iter().enumerate() {
            if row.iter().any(|x| !x.is_finite()) {
                return Some(format!("edge {edge} of {relation}"));
            }
        }
    }
    None
}

/// A sampled batch. Observations are merged into disjoint graphs; `actions`
/// and `rewards` are concatenated in the same order as the merged
/// application rows, so `observations.membership(NodeKind::Application)`
/// maps every entry back to its experience.
#[derive(Debug, Clone)]
pub struct SampledBatch {
    pub observations: GraphBatch,
    pub actions: Vec<usize>,
    pub rewards: Vec<f32>,
    pub next_observations: GraphBatch,
}

impl SampledBatch {
    pub fn from_experiences(experiences: &[&Experience]) -> Self {
        Self {
            observations: GraphBatch::from_graphs(experiences.iter().map(|e| &e.observation)),
            actions: experiences.iter().flat_map(|e| e.actions.iter().copied()).collect(),
            rewards: experiences.iter().flat_map(|e| e.rewards.iter().copied()).collect(),
            next_observations: GraphBatch::from_graphs(
                experiences.iter().map(|e| &e.next_observation),
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.observations.num_graphs()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
