//! Analysis - per-dimension statistics of the encoder output

use anyhow::{bail, Context, Result};
use candle_core::Tensor;
use clap::Args;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::info;

use seqvae_core::device_utils::select_device;
use seqvae_core::{Encoder, Stored};

use crate::samples::read_samples;

#[derive(Args, Debug, Clone)]
pub struct AnalysisArgs {
    #[arg(long, required = true)]
    pub data: PathBuf,

    #[arg(long, default_value = "enc_out")]
    pub encoder: PathBuf,

    /// Number of samples to encode
    #[arg(long, default_value_t = 512)]
    pub num: usize,

    #[arg(long, default_value_t = 32)]
    pub batch: usize,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, action)]
    pub cpu: bool,
}

/// Running first and second moments, one slot per dimension.
#[derive(Debug, Clone)]
pub struct Moments {
    count: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl Moments {
    pub fn new(dim: usize) -> Self {
        Self {
            count: 0,
            sum: vec![0.0; dim],
            sum_sq: vec![0.0; dim],
        }
    }

    pub fn add(&mut self, row: &[f32]) {
        for ((s, sq), &v) in self.sum.iter_mut().zip(self.sum_sq.iter_mut()).zip(row) {
            let v = v as f64;
            *s += v;
            *sq += v * v;
        }
        self.count += 1;
    }

    /// Add every row of a (batch, dim) tensor.
    pub fn add_tensor(&mut self, rows: &Tensor) -> Result<()> {
        for row in rows.to_vec2::<f32>()? {
            self.add(&row);
        }
        Ok(())
    }

    pub fn mean(&self) -> Vec<f64> {
        let n = self.count.max(1) as f64;
        self.sum.iter().map(|s| s / n).collect()
    }

    /// Population standard deviation.
    pub fn stddev(&self) -> Vec<f64> {
        let n = self.count.max(1) as f64;
        self.sum
            .iter()
            .zip(&self.sum_sq)
            .map(|(s, sq)| {
                let mean = s / n;
                (sq / n - mean * mean).max(0.0).sqrt()
            })
            .collect()
    }
}

/// One line per latent dimension.
pub fn report(means: &Moments, log_stddevs: &Moments) -> Vec<String> {
    let (m_mean, m_std) = (means.mean(), means.stddev());
    let (s_mean, s_std) = (log_stddevs.mean(), log_stddevs.stddev());
    (0..m_mean.len())
        .map(|i| {
            format!(
                "{}\tE[μ]={:.3}\tσ(μ)={:.3}\tE[ln(σ)]={:.3}\tσ(ln(σ))={:.3}",
                i, m_mean[i], m_std[i], s_mean[i], s_std[i]
            )
        })
        .collect()
}

/// A seeded random subset of at most `num` samples. Empty subsets are an error.
pub fn select_samples(
    mut samples: Vec<Vec<u8>>,
    num: usize,
    seed: u64,
) -> Result<Vec<Vec<u8>>> {
    if samples.is_empty() {
        bail!("no non-empty samples");
    }
    samples.shuffle(&mut StdRng::seed_from_u64(seed));
    samples.truncate(num);
    if samples.is_empty() {
        bail!("--num must be at least 1");
    }
    Ok(samples)
}

pub fn run(args: AnalysisArgs) -> Result<()> {
    if args.batch == 0 {
        bail!("--batch must be at least 1");
    }
    let device = select_device(args.cpu);

    info!("Loading encoder...");
    let encoder: Stored<Encoder> = Stored::load(&args.encoder, &device)
        .with_context(|| format!("failed to load encoder {:?}", args.encoder))?;

    let seed = args.seed.unwrap_or_else(rand::random);
    let samples = select_samples(read_samples(&args.data)?, args.num, seed)
        .with_context(|| format!("nothing to analyse in {:?}", args.data))?;

    info!("Encoding {} samples...", samples.len());
    let dim = encoder.config.latent_size;
    let mut means = Moments::new(dim);
    let mut log_stddevs = Moments::new(dim);
    for chunk in samples.chunks(args.batch) {
        let (mean, log_stddev) = encoder.model.encode(chunk)?;
        means.add_tensor(&mean)?;
        log_stddevs.add_tensor(&log_stddev)?;
    }

    for line in report(&means, &log_stddevs) {
        println!("{}", line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moments() {
        let mut m = Moments::new(2);
        m.add(&[1.0, 5.0]);
        m.add(&[3.0, 5.0]);
        assert_eq!(m.mean(), vec![2.0, 5.0]);
        assert_eq!(m.stddev(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_select_samples() -> Result<()> {
        let samples: Vec<Vec<u8>> = vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()];
        let picked = select_samples(samples.clone(), 2, 7)?;
        assert_eq!(picked.len(), 2);
        assert!(picked.iter().all(|p| samples.contains(p)));
        assert_eq!(select_samples(samples.clone(), 10, 7)?.len(), 3);
        assert_eq!(picked, select_samples(samples.clone(), 2, 7)?);

        assert!(select_samples(samples, 0, 7).is_err());
        assert!(select_samples(Vec::new(), 5, 7).is_err());
        Ok(())
    }

    #[test]
    fn test_report_format() {
        let mut m = Moments::new(1);
        m.add(&[0.5]);
        let mut s = Moments::new(1);
        s.add(&[-2.0]);
        assert_eq!(
            report(&m, &s),
            vec!["0\tE[μ]=0.500\tσ(μ)=0.000\tE[ln(σ)]=-2.000\tσ(ln(σ))=0.000".to_string()]
        );
    }
}
