//! Encoder - byte strings to Gaussian latent distributions

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;

use crate::batch::SeqBatch;
use crate::error::Result;
use crate::latent::LatentDistribution;
use crate::layers::{GaussianHead, RecurrentStack};
use crate::model::VaeConfig;

/// LSTM stack over the reversed input, summarised at its final timestep.
pub struct Encoder {
    pub stack: RecurrentStack,
    pub head: GaussianHead,
    pub config: VaeConfig,
}

impl Encoder {
    pub fn load(config: &VaeConfig, vb: VarBuilder) -> Result<Self> {
        let stack = RecurrentStack::lstm_stack(config.num_layers, config.hidden_size, vb.pp("stack"))?;
        let head = GaussianHead::load(config.hidden_size, config.latent_size, vb.pp("head"))?;
        Ok(Self {
            stack,
            head,
            config: *config,
        })
    }

    /// Encode a batch of reversed sequences (no terminator).
    ///
    /// There must be at least one sequence and every sequence must be non-empty.
    /// Mean and log-stddev are (batch, latent), one row per sample in batch order.
    pub fn apply(&self, reversed: &SeqBatch) -> Result<LatentDistribution> {
        reversed.check_non_empty()?;

        let mut state = self.stack.start(reversed.batch_size())?;
        let mut outputs = Vec::with_capacity(reversed.max_len());
        for t in 0..reversed.max_len() {
            let xs = reversed.step(t)?;
            let (next, out) = self.stack.step(&state, &xs)?;
            state = next;
            outputs.push(out);
        }

        // (batch, time, hidden) -> (batch, hidden) taken at each sample's last step
        let outputs = Tensor::stack(&outputs, 1)?;
        let selector = reversed.tail_selector()?.unsqueeze(2)?;
        let tail = outputs.broadcast_mul(&selector)?.sum(1)?;

        let (mean, log_stddev) = self.head.forward(&tail)?;
        Ok(LatentDistribution { mean, log_stddev })
    }

    /// Encode strings to their most probable codes, returning `(mean, log_stddev)`.
    pub fn encode<S: AsRef<[u8]>>(&self, samples: &[S]) -> Result<(Tensor, Tensor)> {
        let reversed: Vec<Vec<u8>> = samples
            .iter()
            .map(|s| s.as_ref().iter().rev().copied().collect())
            .collect();
        let batch = SeqBatch::from_sequences(&reversed, self.device())?;
        let dist = self.apply(&batch)?;
        Ok((dist.mean.detach(), dist.log_stddev.detach()))
    }

    pub fn device(&self) -> &Device {
        self.head.mean.weight().device()
    }
}
