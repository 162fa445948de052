//! Trainer configuration surface.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DqnError, Result};

/// Loss used between predicted and bootstrapped values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    Mse,
    /// Huber loss with beta = 1.
    SmoothL1,
}

/// How batch rewards are rescaled before entering the Bellman target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardNormalization {
    None,
    /// Zero mean, unit (population) variance.
    Standardize,
    /// Divide by the L2 norm of the reward vector.
    L2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    WithoutReplacement,
    WithReplacement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Replay buffer capacity.
    pub capacity: usize,
    /// Width of the estimator's hidden layers.
    pub hidden_size: usize,
    /// Number of discrete actions per application node.
    pub output_size: usize,
    /// Discount for future rewards.
    pub gamma: f32,
    pub batch_size: usize,
    /// Optimization passes between target network refreshes.
    pub target_frequency: usize,
    /// Max global L2 norm of the gradient.
    pub grad_clip: f32,
    pub learning_rate: f32,
    pub seed: u64,
    /// Optimization passes per `optimize` call.
    pub epochs_per_step: usize,
    pub loss: LossKind,
    pub reward_normalization: RewardNormalization,
    pub sampling: SamplingMode,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            capacity: 400,
            hidden_size: 8,
            output_size: 2,
            gamma: 0.99,
            batch_size: 32,
            target_frequency: 10,
            grad_clip: 1.0,
            learning_rate: 0.001,
            seed: 42,
            epochs_per_step: 1,
            loss: LossKind::Mse,
            reward_normalization: RewardNormalization::Standardize,
            sampling: SamplingMode::WithoutReplacement,
        }
    }
}

impl TrainerConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("capacity", self.capacity),
            ("batch_size", self.batch_size),
            ("output_size", self.output_size),
            ("hidden_size", self.hidden_size),
            ("target_frequency", self.target_frequency),
            ("epochs_per_step", self.epochs_per_step),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(DqnError::Configuration(format!("{name} must be positive")));
            }
        }
        if self.batch_size > self.capacity {
            return Err(DqnError::Configuration(format!(
                "batch_size {} exceeds replay capacity {}",
                self.batch_size, self.capacity
            )));
        }
        if !(self.gamma > 0.0 && self.gamma < 1.0) {
            return Err(DqnError::Configuration(format!(
                "gamma must lie in (0, 1), got {}",
                self.gamma
            )));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(DqnError::Configuration(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.grad_clip.is_finite() && self.grad_clip > 0.0) {
            return Err(DqnError::Configuration(format!(
                "grad_clip must be positive, got {}",
                self.grad_clip
            )));
        }
        Ok(())
    }
}
