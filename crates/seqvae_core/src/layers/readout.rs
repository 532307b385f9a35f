//! Readout - byte distribution head

use candle_core::{Module, Result, Tensor, D};
use candle_nn::{Linear, VarBuilder};

use crate::codec::ALPHABET;

/// Fully-connected projection to 256 classes followed by log-softmax.
pub struct Readout {
    pub proj: Linear,
}

impl Readout {
    pub fn load(in_dim: usize, vb: VarBuilder) -> Result<Self> {
        let proj = candle_nn::linear(in_dim, ALPHABET, vb.pp("proj"))?;
        Ok(Self { proj })
    }
}

impl Module for Readout {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let logits = self.proj.forward(xs)?;
        candle_nn::ops::log_softmax(&logits, D::Minus1)
    }
}
