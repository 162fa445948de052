//! Deep Q-Network trainer over heterogeneous graph observations.
use std::path::{Path, PathBuf};

use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::{LossKind, RewardNormalization, TrainerConfig};
use crate::deep::loss::{mse_loss, smooth_l1_loss};
use crate::deep::optim::{clip_grad_norm, Adam};
use crate::error::{DqnError, Result};
use crate::estimator::{HeteroGraphNet, Mode, NodeValues, ValueEstimator};
use crate::graph::{GraphSchema, HeteroGraph, NodeKind};
use crate::rl::environment::GraphEnvironment;
use crate::rl::experience::{Experience, SampledBatch};
use crate::rl::persistence;
use crate::rl::policy::EpsilonGreedy;
use crate::rl::replay_buffer::ReplayBuffer;
use crate::rl::reward::RewardFunction;
use crate::rl::stats::{self, StepStats};
use crate::telemetry::{LogSink, MetricsSink};

/// Rescale a batch of rewards according to `mode`.
pub fn normalize_rewards(rewards: &[f32], mode: RewardNormalization) -> Vec<f32> {
    match mode {
        RewardNormalization::None => rewards.to_vec(),
        RewardNormalization::Standardize => {
            if rewards.is_empty() {
                return Vec::new();
            }
            let n = rewards.len() as f32;
            let mean = rewards.iter().sum::<f32>() / n;
            let var = rewards.iter().map(|r| (r - mean) * (r - mean)).sum::<f32>() / n;
            let std = var.sqrt();
            rewards.iter().map(|r| (r - mean) / (std + 1e-8)).collect()
        }
        RewardNormalization::L2 => {
            let norm = rewards.iter().map(|r| r * r).sum::<f32>().sqrt().max(1e-12);
            rewards.iter().map(|r| r / norm).collect()
        }
    }
}

// Per-stream seed offsets for network init, replay sampling and exploration.
const NETWORK_STREAM: u64 = 0x6e65_7477_6f72_6b00;
const BUFFER_STREAM: u64 = 0x6275_6666_6572_0000;
const POLICY_STREAM: u64 = 0x706f_6c69_6379_0000;

fn stream_seed(seed: u64, stream: u64) -> u64 {
    seed ^ stream
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

/// Totals of one episode driven by [`DqnTrainer::run_episode`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpisodeSummary {
    pub steps: usize,
    pub total_reward: f32,
    pub last_loss: f32,
}

/// Owns the online and target estimators, the optimizer, the replay buffer
/// and the step counters.
///
/// The target estimator is only read between synchronizations. Every
/// `target_frequency` optimization passes it is replaced by a copy of the
/// online estimator.
pub struct DqnTrainer<N: ValueEstimator = HeteroGraphNet> {
    config: TrainerConfig,
    /// The network being trained.
    online: N,
    /// Delayed copy used for bootstrapped targets.
    target: N,
    optimizer: Adam,
    buffer: ReplayBuffer,
    policy: EpsilonGreedy,
    /// Completed optimization passes.
    ticks: u64,
    /// Passes left before the next target synchronization.
    next_update_at: usize,
    stats: Vec<StepStats>,
    metrics: Box<dyn MetricsSink>,
}

impl DqnTrainer<HeteroGraphNet> {
    /// Build a trainer whose estimators are bound to `schema`.
    ///
    /// # Arguments
    /// * `config` - Hyper-parameters, validated before anything is built.
    /// * `schema` - Structure every observation must follow.
    pub fn new(config: TrainerConfig, schema: GraphSchema) -> Result<Self> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(stream_seed(config.seed, NETWORK_STREAM));
        let online = HeteroGraphNet::new(schema, config.hidden_size, config.output_size, &mut rng)?;
        Self::with_estimator(config, online)
    }
}

impl<N: ValueEstimator> DqnTrainer<N> {
    /// Build a trainer around an already constructed online estimator.
    ///
    /// The target estimator starts as an exact copy of `online`.
    ///
    /// # Arguments
    /// * `config` - Hyper-parameters; `output_size` must match the estimator.
    /// * `online` - The estimator to train.
    pub fn with_estimator(config: TrainerConfig, online: N) -> Result<Self> {
        config.validate()?;
        if online.output_size() != config.output_size {
            return Err(DqnError::Configuration(format!(
                "estimator produces {} action values but output_size is {}",
                online.output_size(),
                config.output_size
            )));
        }
        online.schema().check()?;

        let mut target = online.clone();
        target.set_mode(Mode::Eval);
        let optimizer = Adam::new(config.learning_rate, online.num_parameters());
        let buffer = ReplayBuffer::new(config.capacity, stream_seed(config.seed, BUFFER_STREAM))?
            .with_sampling(config.sampling);
        let policy = EpsilonGreedy::new(stream_seed(config.seed, POLICY_STREAM));
        let next_update_at = config.target_frequency;

        info!(
            "DQN trainer ready: {} parameters, capacity={}, batch_size={}, target_frequency={}",
            online.num_parameters(),
            config.capacity,
            config.batch_size,
            config.target_frequency
        );

        Ok(Self {
            config,
            online,
            target,
            optimizer,
            buffer,
            policy,
            ticks: 0,
            next_update_at,
            stats: Vec::new(),
            metrics: Box::new(LogSink),
        })
    }

    /// Replace the metrics sink (defaults to [`LogSink`]).
    pub fn with_metrics(mut self, metrics: Box<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The validated configuration.
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Schema both estimators are bound to.
    pub fn schema(&self) -> &GraphSchema {
        self.online.schema()
    }

    /// The estimator being trained.
    pub fn online(&self) -> &N {
        &self.online
    }

    /// The delayed copy used for bootstrapped targets.
    pub fn target(&self) -> &N {
        &self.target
    }

    /// Stored experiences.
    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    /// Number of completed optimization passes.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Batch averages of every optimization pass so far.
    pub fn stats(&self) -> &[StepStats] {
        &self.stats
    }

    /// Reseed replay sampling and exploration. Network weights are untouched.
    pub fn set_seed(&mut self, seed: u64) {
        self.buffer.set_seed(stream_seed(seed, BUFFER_STREAM));
        self.policy.set_seed(stream_seed(seed, POLICY_STREAM));
    }

    /// Validate `experience` against the bound schema and store it.
    pub fn add_experience(&mut self, experience: Experience) -> Result<()> {
        experience.validate(self.online.schema(), self.config.output_size)?;
        self.buffer.push(experience);
        Ok(())
    }

    /// Epsilon-greedy action for every application node of `observation`.
    pub fn select_action(&mut self, observation: &HeteroGraph, epsilon: f32) -> Result<Vec<usize>> {
        self.online.schema().validate(observation)?;
        self.policy.select_action(&self.online, observation, epsilon)
    }

    /// Run `epochs_per_step` optimization passes and return the last loss.
    ///
    /// While the buffer holds fewer than `batch_size` experiences this does
    /// nothing and returns `0.0`.
    pub fn optimize(&mut self) -> Result<f32> {
        let batch_size = self.config.batch_size;
        if self.buffer.len() < batch_size {
            debug!(
                "Skipping optimization: {} experiences stored, batch needs {}",
                self.buffer.len(),
                batch_size
            );
            return Ok(0.0);
        }

        let epochs = self.config.epochs_per_step;
        self.metrics.add_scalar("buffer size", self.buffer.len() as f32, self.ticks);
        self.metrics.add_scalar("epochs", epochs as f32, self.ticks);

        let mut loss = 0.0;
        for _ in 0..epochs {
            self.online.set_mode(Mode::Train);
            let batch = self.buffer.sample(batch_size).map_err(|err| match err {
                DqnError::InsufficientData { requested, available } => {
                    DqnError::SamplingExhaustion { requested, available }
                }
                other => other,
            })?;
            let step = self.learn(&batch)?;
            loss = step.loss;

            self.metrics.add_scalar("average_rewards", step.reward, step.tick);
            self.metrics.add_scalar("average_values", step.values, step.tick);
            self.metrics.add_scalar("average_next_values", step.next_values, step.tick);
            self.metrics.add_scalar("average_target_values", step.target_values, step.tick);
            self.metrics.add_scalar("loss", step.loss, step.tick);
            self.stats.push(step);

            self.next_update_at -= 1;
            if self.next_update_at == 0 {
                self.sync_target();
                self.next_update_at = self.config.target_frequency;
            }
            self.ticks += 1;
        }
        Ok(loss)
    }

    /// One gradient step on `batch`. Parameters are only written once every
    /// fallible computation has succeeded.
    fn learn(&mut self, batch: &SampledBatch) -> Result<StepStats> {
        let (online_values, cache) = self.online.forward(&batch.observations.graph)?;
        let next_values_all = self.target.infer(&batch.next_observations.graph)?;

        let q_rows = online_values.get(&NodeKind::Application).map_or(&[][..], Vec::as_slice);
        let next_rows = next_values_all.get(&NodeKind::Application).map_or(&[][..], Vec::as_slice);
        let n = q_rows.len();
        if batch.actions.len() != n || batch.rewards.len() != n || next_rows.len() != n {
            return Err(DqnError::InvalidExperience(format!(
                "batch has {n} application nodes, {} next nodes, {} actions and {} rewards",
                next_rows.len(),
                batch.actions.len(),
                batch.rewards.len()
            )));
        }

        // Q(s, a) for the action actually taken
        let mut values = Vec::with_capacity(n);
        for (row, &action) in q_rows.iter().zip(&batch.actions) {
            let value = row.get(action).copied().ok_or_else(|| {
                DqnError::InvalidExperience(format!(
                    "action {action} is outside [0, {})",
                    row.len()
                ))
            })?;
            values.push(value);
        }
        // max_a' Q_target(s', a'), a constant for the gradient
        let next_values: Vec<f32> = next_rows
            .iter()
            .map(|row| row.iter().copied().fold(f32::NEG_INFINITY, f32::max))
            .collect();

        let reward = mean(&batch.rewards);
        let rewards = normalize_rewards(&batch.rewards, self.config.reward_normalization);
        let targets: Vec<f32> = rewards
            .iter()
            .zip(&next_values)
            .map(|(r, next)| r + self.config.gamma * next)
            .collect();

        let (loss, grad_values) = match self.config.loss {
            LossKind::Mse => mse_loss(&values, &targets),
            LossKind::SmoothL1 => smooth_l1_loss(&values, &targets),
        };

        let grad_rows: Vec<Vec<f32>> = batch
            .actions
            .iter()
            .zip(&grad_values)
            .map(|(&action, &g)| {
                let mut row = vec![0.0; self.config.output_size];
                row[action] = g;
                row
            })
            .collect();
        let mut grad_output = NodeValues::new();
        grad_output.insert(NodeKind::Application, grad_rows);

        let mut grads = self.online.backward(&cache, &grad_output)?;
        let norm = clip_grad_norm(&mut grads, self.config.grad_clip);
        if !loss.is_finite() || !norm.is_finite() {
            error!("Skipping update at tick {}: loss={loss} grad_norm={norm}", self.ticks);
            return Err(DqnError::Divergence(format!(
                "loss {loss} and gradient norm {norm} at tick {}",
                self.ticks
            )));
        }
        let mut params = self.online.parameters();
        self.optimizer.step(&mut params, &grads);
        self.online.load_parameters(&params)?;

        let step = StepStats {
            tick: self.ticks,
            reward,
            values: mean(&values),
            next_values: mean(&next_values),
            target_values: mean(&targets),
            loss,
        };
        debug!(
            "tick {}: loss={:.6} grad_norm={:.6} value={:.4} target={:.4}",
            step.tick, loss, norm, step.values, step.target_values
        );
        Ok(step)
    }

    /// Replace the target estimator with a fresh copy of the online one.
    fn sync_target(&mut self) {
        let mut target = self.online.clone();
        target.set_mode(Mode::Eval);
        self.target = target;
        info!("Updated target network at tick {}", self.ticks);
    }

    /// Play one episode: observe, act, reward, store, optimize, for at most `max_steps` steps.
    pub fn run_episode<E, R>(
        &mut self,
        env: &mut E,
        reward_fn: &R,
        epsilon: f32,
        max_steps: usize,
    ) -> Result<EpisodeSummary>
    where
        E: GraphEnvironment,
        R: RewardFunction + ?Sized,
    {
        let mut summary = EpisodeSummary::default();
        let mut observation = env.reset();
        for _ in 0..max_steps {
            let actions = self.select_action(&observation, epsilon)?;
            let (next_observation, done) = env.step(&actions);
            let rewards = reward_fn.compute(&observation, &next_observation);
            summary.total_reward += rewards.iter().sum::<f32>();

            self.add_experience(Experience::new(
                observation,
                actions,
                rewards,
                next_observation.clone(),
            ))?;
            summary.last_loss = self.optimize()?;
            summary.steps += 1;

            observation = next_observation;
            if done {
                break;
            }
        }
        Ok(summary)
    }

    /// Write the recorded per-step statistics to `{dir}/stats-seed_{seed}.csv`.
    pub fn save_stats(&self, dir: &Path, seed: u64) -> Result<PathBuf> {
        stats::save_stats(&self.stats, dir, seed)
    }

    /// Save the online estimator to `{dir}/network-iteration-{iteration}.json`.
    pub fn model_snapshot(&self, dir: &Path, iteration: u64) -> Result<PathBuf>
    where
        N: Serialize,
    {
        persistence::save_snapshot(&self.online, dir, iteration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplingMode;
    use crate::graph::{EdgeRelation, EdgeSet};
    use crate::rl::reward::CostReward;
    use crate::telemetry::MemorySink;

    fn observation(shift: f32) -> HeteroGraph {
        HeteroGraph::new()
            .with_nodes(
                NodeKind::Application,
                vec![vec![0.2 + shift, 0.9], vec![0.5, 0.4 - shift], vec![-0.3, 0.1]],
            )
            .with_nodes(NodeKind::Infrastructure, vec![vec![0.1, 0.2, 0.3], vec![0.6, -0.1, 0.2]])
            .with_edges(EdgeRelation::AppToInfrastructure, EdgeSet::new(vec![(0, 0), (1, 1), (2, 1)]))
            .with_edges(EdgeRelation::AppToApp, EdgeSet::new(vec![(0, 1), (1, 2)]))
            .with_edges(EdgeRelation::InfrastructureToInfrastructure, EdgeSet::new(vec![(0, 1)]))
    }

    fn config() -> TrainerConfig {
        TrainerConfig {
            capacity: 16,
            hidden_size: 6,
            output_size: 3,
            batch_size: 4,
            target_frequency: 3,
            learning_rate: 0.01,
            seed: 7,
            ..TrainerConfig::default()
        }
    }

    fn trainer(config: TrainerConfig) -> DqnTrainer {
        let _ = env_logger::builder().is_test(true).try_init();
        DqnTrainer::new(config, GraphSchema::of(&observation(0.0))).unwrap()
    }

    fn fill(trainer: &mut DqnTrainer, count: usize) {
        for i in 0..count {
            let shift = i as f32 * 0.05;
            trainer
                .add_experience(Experience::new(
                    observation(shift),
                    vec![i % 3, (i + 1) % 3, 2],
                    vec![1.0, -0.5 * i as f32, 0.25],
                    observation(shift + 0.05),
                ))
                .unwrap();
        }
    }

    #[test]
    fn normalization_modes() {
        let rewards = [1.0, 2.0, 3.0];
        assert_eq!(normalize_rewards(&rewards, RewardNormalization::None), rewards.to_vec());

        let standardized = normalize_rewards(&rewards, RewardNormalization::Standardize);
        assert!(mean(&standardized).abs() < 1e-6);
        let var = standardized.iter().map(|r| r * r).sum::<f32>() / 3.0;
        assert!((var - 1.0).abs() < 1e-4);

        let l2 = normalize_rewards(&[3.0, 4.0], RewardNormalization::L2);
        assert!((l2[0] - 0.6).abs() < 1e-6 && (l2[1] - 0.8).abs() < 1e-6);

        let constant = normalize_rewards(&[2.0, 2.0], RewardNormalization::Standardize);
        assert_eq!(constant, vec![0.0, 0.0]);
        assert!(normalize_rewards(&[], RewardNormalization::Standardize).is_empty());
    }

    #[test]
    fn invalid_configuration_is_fatal_at_construction() {
        let bad = TrainerConfig { capacity: 2, batch_size: 3, ..config() };
        assert!(matches!(
            DqnTrainer::new(bad, GraphSchema::of(&observation(0.0))),
            Err(DqnError::Configuration(_))
        ));
    }

    #[test]
    fn target_starts_as_exact_copy() {
        let trainer = trainer(config());
        assert_eq!(trainer.online().parameters(), trainer.target().parameters());
        assert_eq!(trainer.target().mode(), Mode::Eval);
    }

    #[test]
    fn optimize_on_underfilled_buffer_is_a_no_op() {
        let sink = MemorySink::new();
        let mut trainer = trainer(config()).with_metrics(Box::new(sink.clone()));
        fill(&mut trainer, 3);
        let before = trainer.online().parameters();

        assert_eq!(trainer.optimize().unwrap(), 0.0);
        assert_eq!(trainer.ticks(), 0);
        assert_eq!(trainer.online().parameters(), before);
        assert!(trainer.stats().is_empty());
        assert!(sink.records().is_empty());
    }

    #[test]
    fn optimize_updates_online_but_not_target_until_sync() {
        let mut trainer = trainer(config());
        fill(&mut trainer, 8);
        let initial = trainer.target().parameters();

        trainer.optimize().unwrap();
        assert_eq!(trainer.ticks(), 1);
        assert_ne!(trainer.online().parameters(), initial);
        assert_eq!(trainer.target().parameters(), initial);

        trainer.optimize().unwrap();
        assert_eq!(trainer.target().parameters(), initial);

        // third pass reaches target_frequency
        trainer.optimize().unwrap();
        assert_eq!(trainer.ticks(), 3);
        assert_eq!(trainer.target().parameters(), trainer.online().parameters());

        let synced = trainer.target().parameters();
        trainer.optimize().unwrap();
        trainer.optimize().unwrap();
        assert_eq!(trainer.target().parameters(), synced);
        assert_ne!(trainer.online().parameters(), synced);
        trainer.optimize().unwrap();
        assert_eq!(trainer.target().parameters(), trainer.online().parameters());
    }

    #[test]
    fn epochs_advance_ticks_and_sync_within_one_call() {
        let mut trainer = trainer(TrainerConfig { epochs_per_step: 4, ..config() });
        fill(&mut trainer, 8);
        trainer.optimize().unwrap();
        assert_eq!(trainer.ticks(), 4);
        assert_eq!(trainer.stats().len(), 4);
        // synced after the third pass, then one more update
        assert_ne!(trainer.target().parameters(), trainer.online().parameters());
        assert_eq!(
            trainer.stats().iter().map(|s| s.tick).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
    }

    #[test]
    fn diagnostics_reach_the_metrics_sink() {
        let sink = MemorySink::new();
        let mut trainer = trainer(config()).with_metrics(Box::new(sink.clone()));
        fill(&mut trainer, 8);
        let loss = trainer.optimize().unwrap();
        trainer.optimize().unwrap();

        assert_eq!(sink.series("buffer size"), vec![(0, 8.0), (1, 8.0)]);
        assert_eq!(sink.series("loss").len(), 2);
        assert_eq!(sink.series("loss")[0], (0, loss));
        for tag in ["epochs", "average_rewards", "average_values", "average_next_values", "average_target_values"] {
            assert_eq!(sink.series(tag).len(), 2, "{tag}");
        }
        let first = trainer.stats()[0];
        assert!(first.loss.is_finite() && first.loss >= 0.0);
    }

    #[test]
    fn schema_mismatch_is_rejected() {
        let mut trainer = trainer(config());
        let foreign = HeteroGraph::new().with_nodes(NodeKind::Application, vec![vec![1.0, 2.0, 3.0]]);
        let result = trainer.add_experience(Experience::new(
            foreign.clone(),
            vec![0],
            vec![1.0],
            foreign.clone(),
        ));
        assert!(matches!(result, Err(DqnError::SchemaMismatch(_))));
        assert!(matches!(trainer.select_action(&foreign, 0.0), Err(DqnError::SchemaMismatch(_))));
        assert!(trainer.buffer().is_empty());
    }

    #[test]
    fn misaligned_experience_is_rejected() {
        let mut trainer = trainer(config());
        let result = trainer.add_experience(Experience::new(
            observation(0.0),
            vec![0, 1, 5],
            vec![1.0, 1.0, 1.0],
            observation(0.1),
        ));
        assert!(matches!(result, Err(DqnError::InvalidExperience(_))));
    }

    #[test]
    fn same_seed_gives_identical_training() {
        let run = || {
            let mut trainer = trainer(TrainerConfig { sampling: SamplingMode::WithReplacement, ..config() });
            fill(&mut trainer, 10);
            for _ in 0..5 {
                trainer.optimize().unwrap();
            }
            (trainer.online().parameters(), trainer.stats().to_vec())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn smooth_l1_and_unnormalized_rewards_train() {
        let mut trainer = trainer(TrainerConfig {
            loss: LossKind::SmoothL1,
            reward_normalization: RewardNormalization::None,
            ..config()
        });
        fill(&mut trainer, 6);
        let loss = trainer.optimize().unwrap();
        assert!(loss.is_finite() && loss >= 0.0);
        let raw = trainer.stats()[0];
        assert!(raw.reward.is_finite());
    }

    #[test]
    fn repeated_updates_fit_a_fixed_target() {
        // one experience, every batch identical: the loss must go down
        let mut trainer = trainer(TrainerConfig {
            capacity: 1,
            batch_size: 1,
            target_frequency: 1_000,
            learning_rate: 0.01,
            grad_clip: 10.0,
            reward_normalization: RewardNormalization::None,
            ..config()
        });
        trainer
            .add_experience(Experience::new(observation(0.0), vec![0, 1, 2], vec![1.0, 0.0, -1.0], observation(0.0)))
            .unwrap();
        let first = trainer.optimize().unwrap();
        let mut last = first;
        for _ in 0..200 {
            last = trainer.optimize().unwrap();
        }
        assert!(last < first * 0.5, "loss went from {first} to {last}");
    }

    #[test]
    fn infinite_reward_from_cost_is_rejected_before_storage() {
        let mut trainer = trainer(config());
        let costly = |cost: f32| {
            HeteroGraph::new()
                .with_nodes(NodeKind::Application, vec![vec![cost, 0.9], vec![0.5, 0.4], vec![-0.3, 0.1]])
                .with_nodes(NodeKind::Infrastructure, vec![vec![0.1, 0.2, 0.3], vec![0.6, -0.1, 0.2]])
                .with_edges(EdgeRelation::AppToInfrastructure, EdgeSet::new(vec![(0, 0), (1, 1), (2, 1)]))
                .with_edges(EdgeRelation::AppToApp, EdgeSet::new(vec![(0, 1), (1, 2)]))
                .with_edges(EdgeRelation::InfrastructureToInfrastructure, EdgeSet::new(vec![(0, 1)]))
        };
        let (observation, next_observation) = (costly(0.2), costly(100.0));
        let rewards = CostReward { column: 0 }.compute(&observation, &next_observation);
        assert!(rewards[0].is_infinite());

        let result = trainer.add_experience(Experience::new(observation, vec![0, 1, 2], rewards, next_observation));
        assert!(matches!(result, Err(DqnError::InvalidExperience(_))));
        assert!(trainer.buffer().is_empty());
    }

    #[test]
    fn overflowing_loss_leaves_parameters_untouched() {
        let mut trainer = trainer(TrainerConfig {
            reward_normalization: RewardNormalization::None,
            ..config()
        });
        for i in 0..4 {
            let shift = i as f32 * 0.05;
            trainer
                .add_experience(Experience::new(
                    observation(shift),
                    vec![0, 1, 2],
                    vec![1e30, -1e30, 1e30],
                    observation(shift + 0.05),
                ))
                .unwrap();
        }
        let before = trainer.online().parameters();

        assert!(matches!(trainer.optimize(), Err(DqnError::Divergence(_))));
        assert_eq!(trainer.online().parameters(), before);
        assert!(trainer.online().parameters().iter().all(|p| p.is_finite()));
        assert_eq!(trainer.ticks(), 0);
        assert!(trainer.stats().is_empty());
    }

    #[test]
    fn random_streams_are_independent_and_reseedable() {
        let seeds = [NETWORK_STREAM, BUFFER_STREAM, POLICY_STREAM].map(|stream| stream_seed(42, stream));
        assert!(seeds[0] != seeds[1] && seeds[1] != seeds[2] && seeds[0] != seeds[2]);

        let run = |seed: u64| {
            let mut trainer = trainer(TrainerConfig { capacity: 32, ..config() });
            fill(&mut trainer, 32);
            trainer.set_seed(seed);
            for _ in 0..3 {
                trainer.optimize().unwrap();
            }
            let actions: Vec<Vec<usize>> =
                (0..5).map(|_| trainer.select_action(&observation(0.0), 1.0).unwrap()).collect();
            (trainer.online().parameters(), actions)
        };
        assert_eq!(run(11), run(11));
        assert_ne!(run(11), run(12));
    }

    #[test]
    fn snapshot_and_stats_are_written() {
        let mut trainer = trainer(config());
        fill(&mut trainer, 8);
        trainer.optimize().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let snapshot = trainer.model_snapshot(dir.path(), 3).unwrap();
        let restored: HeteroGraphNet = persistence::load_snapshot(&snapshot).unwrap();
        assert_eq!(restored.parameters(), trainer.online().parameters());

        let csv = trainer.save_stats(dir.path(), 7).unwrap();
        let content = std::fs::read_to_string(csv).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
