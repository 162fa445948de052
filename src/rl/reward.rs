//! Reward functions over pairs of observations. Each yields one reward per
//! application node, reading columns of the application feature rows.
use crate::graph::{HeteroGraph, NodeKind};

pub trait RewardFunction {
    fn compute(&self, observation: &HeteroGraph, next_observation: &HeteroGraph) -> Vec<f32>;
}

fn saturating_cost(x: f32) -> f32 {
    1.0 - (2.0 * x).exp()
}

/// Change in battery level between the two observations.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatteryDifference {
    pub column: usize,
}

impl RewardFunction for BatteryDifference {
    fn compute(&self, observation: &HeteroGraph, next_observation: &HeteroGraph) -> Vec<f32> {
        let before = observation.feature_column(NodeKind::Application, self.column);
        let after = next_observation.feature_column(NodeKind::Application, self.column);
        after.iter().zip(&before).map(|(a, b)| a - b).collect()
    }
}

/// `0` while the next battery level stays above `threshold`, `penalty` otherwise.
#[derive(Debug, Clone, Copy)]
pub struct BatteryThreshold {
    pub column: usize,
    pub threshold: f32,
    pub penalty: f32,
}

impl Default for BatteryThreshold {
    fn default() -> Self {
        Self { column: 0, threshold: 50.0, penalty: -10.0 }
    }
}

impl RewardFunction for BatteryThreshold {
    fn compute(&self, _observation: &HeteroGraph, next_observation: &HeteroGraph) -> Vec<f32> {
        next_observation
            .feature_column(NodeKind::Application, self.column)
            .into_iter()
            .map(|battery| if battery > self.threshold { 0.0 } else { self.penalty })
            .collect()
    }
}

/// `1 - exp(2 * cost)` of the next observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CostReward {
    pub column: usize,
}

impl RewardFunction for CostReward {
    fn compute(&self, _observation: &HeteroGraph, next_observation: &HeteroGraph) -> Vec<f32> {
        next_observation
            .feature_column(NodeKind::Application, self.column)
            .into_iter()
            .map(saturating_cost)
            .collect()
    }
}

/// `alpha * battery_term + (1 - alpha) * cost_term`, both shaped like [`CostReward`].
#[derive(Debug, Clone, Copy)]
pub struct MixedReward {
    pub alpha: f32,
    pub cost_column: usize,
    pub battery_column: usize,
}

impl MixedReward {
    pub fn new(alpha: f32) -> Self {
        Self { alpha, cost_column: 0, battery_column: 1 }
    }
}

impl RewardFunction for MixedReward {
    fn compute(&self, _observation: &HeteroGraph, next_observation: &HeteroGraph) -> Vec<f32> {
        let battery = next_observation.feature_column(NodeKind::Application, self.battery_column);
        let costs = next_observation.feature_column(NodeKind::Application, self.cost_column);
        battery
            .into_iter()
            .zip(costs)
            .map(|(b, c)| self.alpha * saturating_cost(b) + (1.0 - self.alpha) * saturating_cost(c))
            .collect()
    }
}
