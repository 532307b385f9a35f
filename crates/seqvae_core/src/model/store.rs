//! Parameter-set persistence
//!
//! A parameter set is saved as a safetensors file plus a `<path>.json` sidecar
//! recording which kind of set it is and the sizes needed to rebuild it.

use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Var};
use candle_nn::{VarBuilder, VarMap};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, VaeError};
use crate::model::{Decoder, Encoder, VaeConfig};

/// A model whose parameters can be created from a config and a VarBuilder.
pub trait ParamSet: Sized {
    /// Tag written to the sidecar and checked on load.
    const KIND: &'static str;

    fn build(config: &VaeConfig, vb: VarBuilder) -> Result<Self>;
}

impl ParamSet for Encoder {
    const KIND: &'static str = "encoder";

    fn build(config: &VaeConfig, vb: VarBuilder) -> Result<Self> {
        Encoder::load(config, vb)
    }
}

impl ParamSet for Decoder {
    const KIND: &'static str = "decoder";

    fn build(config: &VaeConfig, vb: VarBuilder) -> Result<Self> {
        Decoder::load(config, vb)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    kind: String,
    config: VaeConfig,
}

/// A model together with the VarMap that owns its parameters.
pub struct Stored<T: ParamSet> {
    pub model: T,
    pub config: VaeConfig,
    varmap: VarMap,
}

pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".json");
    PathBuf::from(name)
}

impl<T: ParamSet> Stored<T> {
    /// Freshly initialised parameters.
    pub fn fresh(config: &VaeConfig, device: &Device) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let model = T::build(config, vb)?;
        Ok(Self {
            model,
            config: *config,
            varmap,
        })
    }

    /// Rebuild from the sidecar, then load weights. Any failure is an error.
    pub fn load(path: &Path, device: &Device) -> Result<Self> {
        let meta_path = sidecar_path(path);
        let file = File::open(&meta_path).map_err(|source| VaeError::Io {
            path: meta_path.clone(),
            source,
        })?;
        let sidecar: Sidecar = serde_json::from_reader(file).map_err(|source| VaeError::Json {
            path: meta_path.clone(),
            source,
        })?;
        if sidecar.kind != T::KIND {
            return Err(VaeError::KindMismatch {
                path: path.to_path_buf(),
                expected: T::KIND.to_string(),
                found: sidecar.kind,
            });
        }
        if let Err(source) = std::fs::metadata(path) {
            return Err(VaeError::Io {
                path: path.to_path_buf(),
                source,
            });
        }

        let mut stored = Self::fresh(&sidecar.config, device)?;
        stored.varmap.load(path)?;
        info!("Loaded {} from {:?}", T::KIND, path);
        Ok(stored)
    }

    /// Load when anything exists at `path`, otherwise start fresh.
    ///
    /// Returns the set and whether it was loaded. A stored config that differs
    /// from `config` wins, since the weights only fit the stored sizes.
    pub fn load_or_fresh(path: &Path, config: &VaeConfig, device: &Device) -> Result<(Self, bool)> {
        if !path.exists() && !sidecar_path(path).exists() {
            info!("No {} at {:?}, starting fresh", T::KIND, path);
            return Ok((Self::fresh(config, device)?, false));
        }
        let stored = Self::load(path, device)?;
        if stored.config != *config {
            warn!(
                "{:?} was trained with {:?}, ignoring requested {:?}",
                path, stored.config, config
            );
        }
        Ok((stored, true))
    }

    /// Write weights and sidecar.
    pub fn save(&self, path: &Path) -> Result<()> {
        let meta_path = sidecar_path(path);
        let sidecar = Sidecar {
            kind: T::KIND.to_string(),
            config: self.config,
        };
        let file = File::create(&meta_path).map_err(|source| VaeError::Io {
            path: meta_path.clone(),
            source,
        })?;
        serde_json::to_writer_pretty(file, &sidecar).map_err(|source| VaeError::Json {
            path: meta_path.clone(),
            source,
        })?;
        self.varmap.save(path)?;
        Ok(())
    }

    pub fn vars(&self) -> Vec<Var> {
        self.varmap.all_vars()
    }

    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> VaeConfig {
        VaeConfig::new(3, 4, 2)
    }

    #[test]
    fn test_save_load_keeps_outputs() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("enc.safetensors");

        let enc: Stored<Encoder> = Stored::fresh(&cfg(), &Device::Cpu)?;
        enc.save(&path)?;
        assert!(sidecar_path(&path).exists());

        let again: Stored<Encoder> = Stored::load(&path, &Device::Cpu)?;
        assert_eq!(again.config, cfg());
        let (m1, _) = enc.model.encode(&["abc"])?;
        let (m2, _) = again.model.encode(&["abc"])?;
        assert_eq!(m1.to_vec2::<f32>()?, m2.to_vec2::<f32>()?);
        Ok(())
    }

    #[test]
    fn test_kind_mismatch_is_fatal() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("dec.safetensors");
        let dec: Stored<Decoder> = Stored::fresh(&cfg(), &Device::Cpu)?;
        dec.save(&path)?;

        let res = Stored::<Encoder>::load(&path, &Device::Cpu);
        assert!(matches!(res, Err(VaeError::KindMismatch { .. })));
        let res = Stored::<Encoder>::load_or_fresh(&path, &cfg(), &Device::Cpu);
        assert!(res.is_err());
        Ok(())
    }

    #[test]
    fn test_missing_means_fresh() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("none.safetensors");
        let (_dec, loaded) = Stored::<Decoder>::load_or_fresh(&path, &cfg(), &Device::Cpu)?;
        assert!(!loaded);
        assert!(Stored::<Decoder>::load(&path, &Device::Cpu).is_err());
        Ok(())
    }

    #[test]
    fn test_corrupt_weights_are_fatal() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("enc.safetensors");
        let enc: Stored<Encoder> = Stored::fresh(&cfg(), &Device::Cpu)?;
        enc.save(&path)?;
        std::fs::write(&path, b"not safetensors")?;

        assert!(Stored::<Encoder>::load_or_fresh(&path, &cfg(), &Device::Cpu).is_err());
        Ok(())
    }
}
