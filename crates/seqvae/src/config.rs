//! Run configuration
//!
//! Snapshot of the hyperparameters of a training run, stored next to the
//! checkpoint so a resumed run can be checked against it.

use serde::{Deserialize, Serialize};
use seqvae_core::{KlSchedule, VaeConfig};

use crate::train::TrainArgs;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RunConfig {
    pub latent_size: usize,
    pub hidden_size: usize,
    pub num_layers: usize,
    pub batch_size: usize,
    pub step_size: f64,
    pub kl_weight: f64,
    pub kl_warmup: usize,
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        let vae = VaeConfig::default();
        Self {
            latent_size: vae.latent_size,
            hidden_size: vae.hidden_size,
            num_layers: vae.num_layers,
            batch_size: 16,
            step_size: 0.001,
            kl_weight: 0.0,
            kl_warmup: 0,
            seed: 0,
        }
    }
}

impl RunConfig {
    pub fn from_args(args: &TrainArgs, seed: u64) -> Self {
        Self {
            latent_size: args.latent,
            hidden_size: args.hidden,
            num_layers: args.layers,
            batch_size: args.batch,
            step_size: args.step,
            kl_weight: args.kl,
            kl_warmup: args.kl_warmup,
            seed,
        }
    }

    /// Adopt the sizes of an existing model.
    pub fn set_model(&mut self, vae: &VaeConfig) {
        self.latent_size = vae.latent_size;
        self.hidden_size = vae.hidden_size;
        self.num_layers = vae.num_layers;
    }

    pub fn to_vae_config(&self) -> VaeConfig {
        VaeConfig::new(self.latent_size, self.hidden_size, self.num_layers)
    }

    pub fn kl_schedule(&self) -> KlSchedule {
        if self.kl_warmup == 0 {
            KlSchedule::Constant(self.kl_weight)
        } else {
            KlSchedule::Linear {
                target: self.kl_weight,
                warmup: self.kl_warmup,
            }
        }
    }
}
