//! Checkpoint Management - parameter sets and training state

use anyhow::{Context, Result};
use fs2::FileExt;
use seqvae_core::{ParamSet, Stored};
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::config::RunConfig;

/// Training state for serialization
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct TrainingState {
    pub iteration: usize,
    /// Last finite cost; absent when no iteration has produced one.
    #[serde(default)]
    pub cost: Option<f64>,
    pub date: String,
    pub run: RunConfig,
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// `<encoder path>.state.json`
pub fn state_path(encoder_path: &Path) -> PathBuf {
    with_suffix(encoder_path, ".state.json")
}

/// Save a parameter set while holding an exclusive `<path>.lock`.
pub fn save_securely<T: ParamSet>(stored: &Stored<T>, path: &Path) -> Result<()> {
    let lock_path = with_suffix(path, ".lock");
    let lock_file = File::create(&lock_path)
        .with_context(|| format!("failed to create lock file {:?}", lock_path))?;
    lock_file.lock_exclusive()?;
    let saved = stored.save(path);
    lock_file.unlock()?;
    saved.with_context(|| format!("failed to save {} to {:?}", T::KIND, path))
}

pub fn save_training_state(
    encoder_path: &Path,
    iteration: usize,
    cost: Option<f64>,
    run: &RunConfig,
) -> Result<()> {
    let state = TrainingState {
        iteration,
        cost: cost.filter(|c| c.is_finite()),
        date: chrono::Local::now().to_rfc3339(),
        run: run.clone(),
    };
    let path = state_path(encoder_path);
    let file = File::create(&path).with_context(|| format!("failed to create {:?}", path))?;
    serde_json::to_writer_pretty(file, &state)?;
    Ok(())
}

/// Training state of a previous run, if one was saved.
pub fn load_training_state(encoder_path: &Path) -> Result<Option<TrainingState>> {
    let path = state_path(encoder_path);
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(&path).with_context(|| format!("failed to open {:?}", path))?;
    let state = serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("failed to parse {:?}", path))?;
    Ok(Some(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;
    use seqvae_core::{Encoder, VaeConfig};

    #[test]
    fn test_state_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let enc = dir.path().join("enc_out");
        assert!(load_training_state(&enc)?.is_none());

        let run = RunConfig::default();
        save_training_state(&enc, 42, Some(1.5), &run)?;
        let state = load_training_state(&enc)?.context("state missing")?;
        assert_eq!(state.iteration, 42);
        assert_eq!(state.cost, Some(1.5));
        assert_eq!(state.run, run);
        assert!(dir.path().join("enc_out.state.json").exists());
        Ok(())
    }

    #[test]
    fn test_state_without_cost_reloads() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let enc = dir.path().join("enc_out");
        let run = RunConfig::default();

        save_training_state(&enc, 0, None, &run)?;
        let state = load_training_state(&enc)?.context("state missing")?;
        assert_eq!(state.iteration, 0);
        assert_eq!(state.cost, None);

        save_training_state(&enc, 3, Some(f64::NAN), &run)?;
        let state = load_training_state(&enc)?.context("state missing")?;
        assert_eq!(state.iteration, 3);
        assert_eq!(state.cost, None);

        // files written with a null cost still parse
        std::fs::write(
            state_path(&enc),
            serde_json::to_string(&serde_json::json!({
                "iteration": 7,
                "cost": null,
                "date": "2024-01-01T00:00:00+00:00",
                "run": run,
            }))?,
        )?;
        let state = load_training_state(&enc)?.context("state missing")?;
        assert_eq!(state.iteration, 7);
        assert_eq!(state.cost, None);
        Ok(())
    }

    #[test]
    fn test_save_securely_writes_set_and_lock() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("enc_out");
        let enc: Stored<Encoder> = Stored::fresh(&VaeConfig::new(2, 4, 1), &Device::Cpu)?;
        save_securely(&enc, &path)?;
        assert!(path.exists());
        assert!(dir.path().join("enc_out.json").exists());
        assert!(dir.path().join("enc_out.lock").exists());
        Ok(())
    }
}
