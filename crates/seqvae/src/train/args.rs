//! Training Arguments - CLI configuration for training

use clap::Args;
use std::path::PathBuf;

/// Training configuration from command line arguments
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// CSV file; the last field of each record is the sample body
    #[arg(long, required = true)]
    pub data: PathBuf,

    #[arg(long, default_value = "enc_out")]
    pub encoder: PathBuf,

    #[arg(long, default_value = "dec_out")]
    pub decoder: PathBuf,

    #[arg(long, default_value_t = 128)]
    pub latent: usize,

    #[arg(long, default_value_t = 512)]
    pub hidden: usize,

    #[arg(long, default_value_t = 3)]
    pub layers: usize,

    #[arg(long, default_value_t = 16)]
    pub batch: usize,

    /// Learning rate
    #[arg(long, default_value_t = 0.001)]
    pub step: f64,

    /// Final KL weight
    #[arg(long, default_value_t = 0.0)]
    pub kl: f64,

    /// Iterations over which the KL weight ramps up from 0
    #[arg(long, default_value_t = 0)]
    pub kl_warmup: usize,

    /// Iterations to run, 0 runs until interrupted
    #[arg(long, default_value_t = 0)]
    pub steps: usize,

    #[arg(long, default_value_t = 1)]
    pub log_interval: usize,

    /// Save every N iterations, 0 saves only at exit
    #[arg(long, default_value_t = 0)]
    pub save_interval: usize,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, action)]
    pub cpu: bool,
}
