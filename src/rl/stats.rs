use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Batch averages of one optimization pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepStats {
    pub tick: u64,
    /// Mean reward before normalization.
    pub reward: f32,
    pub values: f32,
    pub next_values: f32,
    pub target_values: f32,
    pub loss: f32,
}

pub const STATS_HEADER: &str = "tick,reward,values,next_values,target_values,loss";

/// Write `stats` to `{dir}/stats-seed_{seed}.csv`, replacing any previous file.
pub fn save_stats(stats: &[StepStats], dir: &Path, seed: u64) -> Result<PathBuf> {
    let path = dir.join(format!("stats-seed_{seed}.csv"));
    let mut writer = BufWriter::new(File::create(&path)?);
    writeln!(writer, "{STATS_HEADER}")?;
    for s in stats {
        writeln!(
            writer,
            "{},{},{},{},{},{}",
            s.tick, s.reward, s.values, s.next_values, s.target_values, s.loss
        )?;
    }
    writer.flush()?;
    Ok(path)
}
