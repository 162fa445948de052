use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};
use log::{info, warn};

use hetero_dqn::rl::{
    BatteryDifference, BatteryThreshold, CostReward, DqnTrainer, EpsilonSchedule, MixedReward,
    RewardFunction,
};
use hetero_dqn::sim::{self, SyntheticDeployment};
use hetero_dqn::TrainerConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RewardKind {
    Cost,
    BatteryDifference,
    BatteryThreshold,
    Mixed,
}

/// Train a DQN agent on the synthetic deployment environment
#[derive(Parser)]
#[command(name = "hetero-dqn", version, about, long_about = None)]
struct Cli {
    /// JSON trainer configuration (defaults are used for missing fields)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 50)]
    episodes: usize,

    #[arg(long, default_value_t = 100)]
    max_steps: usize,

    /// Application nodes in the environment
    #[arg(long, default_value_t = 4)]
    apps: usize,

    /// Infrastructure nodes in the environment
    #[arg(long, default_value_t = 2)]
    infra: usize,

    #[arg(long, value_enum, default_value_t = RewardKind::Cost)]
    reward: RewardKind,

    /// Battery weight of the mixed reward
    #[arg(long, default_value_t = 0.5)]
    alpha: f32,

    #[arg(long, default_value_t = 1.0)]
    epsilon: f32,

    #[arg(long, default_value_t = 0.95)]
    epsilon_decay: f32,

    #[arg(long, default_value_t = 0.05)]
    epsilon_min: f32,

    /// Where snapshots and statistics go (defaults to runs/<timestamp>)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Save a snapshot every this many episodes (0 disables snapshots)
    #[arg(long, default_value_t = 10)]
    snapshot_every: usize,
}

fn reward_function(kind: RewardKind, alpha: f32) -> Box<dyn RewardFunction> {
    match kind {
        RewardKind::Cost => Box::new(CostReward { column: 0 }),
        RewardKind::BatteryDifference => Box::new(BatteryDifference { column: 1 }),
        RewardKind::BatteryThreshold => Box::new(BatteryThreshold {
            column: 1,
            threshold: 0.5,
            ..BatteryThreshold::default()
        }),
        RewardKind::Mixed => Box::new(MixedReward::new(alpha)),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("hetero_dqn=info"))
        .init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => TrainerConfig::from_json_file(path)
            .with_context(|| format!("loading configuration from {path:?}"))?,
        None => TrainerConfig::default(),
    };
    if config.output_size != sim::NUM_ACTIONS {
        warn!(
            "output_size {} does not match the environment's {} actions, overriding",
            config.output_size,
            sim::NUM_ACTIONS
        );
        config.output_size = sim::NUM_ACTIONS;
    }

    let output_dir = cli.output_dir.clone().unwrap_or_else(|| {
        PathBuf::from("runs").join(Local::now().format("%Y-%m-%d_%H-%M-%S").to_string())
    });
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating output directory {output_dir:?}"))?;

    let seed = config.seed;
    let mut env = SyntheticDeployment::new(cli.apps, cli.infra, seed);
    let mut trainer = DqnTrainer::new(config, SyntheticDeployment::schema())?;
    let reward_fn = reward_function(cli.reward, cli.alpha);
    let mut schedule = EpsilonSchedule::new(cli.epsilon, cli.epsilon_decay, cli.epsilon_min);

    let start_time = Instant::now();
    for episode in 0..cli.episodes {
        let summary = trainer.run_episode(&mut env, reward_fn.as_ref(), schedule.value(), cli.max_steps)?;
        info!(
            "Episode {}: reward = {:.3} over {} steps, loss = {:.5}, epsilon = {:.3}",
            episode + 1,
            summary.total_reward,
            summary.steps,
            summary.last_loss,
            schedule.value()
        );
        schedule.step();

        if cli.snapshot_every > 0 && (episode + 1) % cli.snapshot_every == 0 {
            trainer.model_snapshot(&output_dir, (episode + 1) as u64)?;
        }
    }

    let stats_path = trainer.save_stats(&output_dir, seed)?;
    info!(
        "Training took {:?} ({} optimization steps). Statistics written to {:?}",
        start_time.elapsed(),
        trainer.ticks(),
        stats_path
    );
    Ok(())
}
