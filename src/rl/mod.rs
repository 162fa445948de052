//! Experience replay, epsilon-greedy policy and the DQN training loop.
pub mod environment;
pub mod experience;
pub mod persistence;
pub mod policy;
pub mod replay_buffer;
pub mod reward;
pub mod stats;
pub mod trainer;

pub use environment::GraphEnvironment;
pub use experience::{Experience, SampledBatch};
pub use policy::{EpsilonGreedy, EpsilonSchedule};
pub use replay_buffer::ReplayBuffer;
pub use reward::{BatteryDifference, BatteryThreshold, CostReward, MixedReward, RewardFunction};
pub use stats::StepStats;
pub use trainer::{DqnTrainer, EpisodeSummary};
