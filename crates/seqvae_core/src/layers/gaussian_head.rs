//! GaussianHead - projects an encoder summary to a diagonal Gaussian

use candle_core::{Module, Result, Tensor};
use candle_nn::{Init, Linear, VarBuilder};

/// Initial log-stddev bias. Starts the predicted stddev near e^-2 so the
/// sampling noise does not swamp the signal early in training.
pub const INIT_LOG_STDDEV_BIAS: f64 = -2.0;

/// Two independent linear projections sharing one input.
pub struct GaussianHead {
    pub mean: Linear,
    pub log_stddev: Linear,
}

impl GaussianHead {
    pub fn load(in_dim: usize, latent_dim: usize, vb: VarBuilder) -> Result<Self> {
        let mean = candle_nn::linear(in_dim, latent_dim, vb.pp("mean"))?;

        let vb_ls = vb.pp("log_stddev");
        let weight = vb_ls.get_with_hints(
            (latent_dim, in_dim),
            "weight",
            candle_nn::init::DEFAULT_KAIMING_NORMAL,
        )?;
        let bias = vb_ls.get_with_hints(latent_dim, "bias", Init::Const(INIT_LOG_STDDEV_BIAS))?;
        let log_stddev = Linear::new(weight, Some(bias));

        Ok(Self { mean, log_stddev })
    }

    /// Returns `(mean, log_stddev)`, each (batch, latent).
    pub fn forward(&self, xs: &Tensor) -> Result<(Tensor, Tensor)> {
        let mean = self.mean.forward(xs)?;
        let log_stddev = self.log_stddev.forward(xs)?;
        Ok((mean, log_stddev))
    }
}
