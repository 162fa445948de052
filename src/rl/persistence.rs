use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Path of the snapshot for `iteration` inside `dir`.
pub fn snapshot_path(dir: &Path, iteration: u64) -> PathBuf {
    dir.join(format!("network-iteration-{iteration}.json"))
}

/// Serialize `model` to `{dir}/network-iteration-{iteration}.json`.
///
/// The model is written to a temporary file first and renamed into place.
pub fn save_snapshot<M: Serialize>(model: &M, dir: &Path, iteration: u64) -> Result<PathBuf> {
    let path = snapshot_path(dir, iteration);
    let tmp_path = path.with_extension("tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        serde_json::to_writer_pretty(&mut writer, model)?;
        writer.flush()?;
    }
    fs::rename(&tmp_path, &path)?;
    info!("Saved model snapshot at {:?}", path);
    Ok(path)
}

pub fn load_snapshot<M: DeserializeOwned>(path: &Path) -> Result<M> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
