//! Latent sampler and KL term

use candle_core::Tensor;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::Result;

/// Diagonal Gaussian posterior, one row per sample.
#[derive(Debug, Clone)]
pub struct LatentDistribution {
    /// (batch, latent)
    pub mean: Tensor,
    /// (batch, latent), natural log of the standard deviation
    pub log_stddev: Tensor,
}

impl LatentDistribution {
    pub fn batch_size(&self) -> Result<usize> {
        Ok(self.mean.dim(0)?)
    }

    pub fn latent_size(&self) -> Result<usize> {
        Ok(self.mean.dim(1)?)
    }

    /// Fresh standard-normal noise shaped like the mean, drawn from `rng`.
    pub fn draw_noise<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Tensor> {
        let shape = self.mean.shape();
        let noise: Vec<f32> = (0..shape.elem_count())
            .map(|_| rng.sample::<f32, _>(StandardNormal))
            .collect();
        Ok(Tensor::from_vec(noise, shape, self.mean.device())?)
    }

    /// Reparameterized sample `mean + exp(log_stddev) * noise`.
    pub fn sample_with(&self, noise: &Tensor) -> Result<Tensor> {
        let stddev = self.log_stddev.exp()?;
        Ok((&self.mean + (stddev * noise)?)?)
    }

    /// Draw a new sample; noise is never reused between calls.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Tensor> {
        let noise = self.draw_noise(rng)?;
        self.sample_with(&noise)
    }

    /// Closed-form KL divergence to the standard normal, one value per sample:
    /// `0.5 * (sum(stddev^2) + dot(mean, mean) - D) - sum(log_stddev)`.
    pub fn kl_divergence(&self) -> Result<Tensor> {
        let dim = self.latent_size()? as f64;
        let variance = (&self.log_stddev * 2.0)?.exp()?.sum(1)?;
        let mean_sq = self.mean.sqr()?.sum(1)?;
        let log_sum = self.log_stddev.sum(1)?;
        let half = (((variance + mean_sq)? - dim)? * 0.5)?;
        Ok((half - log_sum)?)
    }
}
