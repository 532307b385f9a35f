//! Trainer - the variational objective and its gradient
//!
//! One iteration: encode the reversed samples, draw a latent code with the
//! reparameterization trick, decode it under teacher forcing, then score the
//! output against the desired bytes. Padding slots add neither cost nor count.

use candle_core::backprop::GradStore;
use candle_core::{Device, Tensor, Var};
use candle_nn::Optimizer;
use rand::Rng;

use crate::batch::TrainingBatch;
use crate::error::Result;
use crate::latent::LatentDistribution;
use crate::model::{Decoder, Encoder, Stored};

/// KL weight as a function of the iteration counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KlSchedule {
    Constant(f64),
    /// Ramp from 0 to `target` over `warmup` iterations, then hold.
    Linear { target: f64, warmup: usize },
}

impl KlSchedule {
    pub fn weight_at(&self, iteration: usize) -> f64 {
        match *self {
            Self::Constant(w) => w,
            Self::Linear { target, warmup } => {
                if warmup == 0 {
                    target
                } else {
                    target * (iteration as f64 / warmup as f64).min(1.0)
                }
            }
        }
    }
}

/// Scalar cost of one batch, averaged over present (sample, timestep) pairs.
pub struct Cost {
    /// Differentiable total, rank 0.
    pub total: Tensor,
    pub reconstruction: f64,
    pub kl: f64,
    pub kl_weight: f64,
    pub count: usize,
}

impl Cost {
    pub fn value(&self) -> Result<f64> {
        Ok(self.total.to_scalar::<f32>()? as f64)
    }
}

pub struct Gradient {
    pub grads: GradStore,
    pub cost: Cost,
}

pub struct Trainer<R: Rng> {
    pub encoder: Stored<Encoder>,
    pub decoder: Stored<Decoder>,
    schedule: KlSchedule,
    iteration: usize,
    last_cost: Option<f64>,
    rng: R,
}

impl<R: Rng> Trainer<R> {
    pub fn new(
        encoder: Stored<Encoder>,
        decoder: Stored<Decoder>,
        schedule: KlSchedule,
        rng: R,
    ) -> Self {
        Self {
            encoder,
            decoder,
            schedule,
            iteration: 0,
            last_cost: None,
            rng,
        }
    }

    /// Continue counting from a resumed run.
    pub fn with_iteration(mut self, iteration: usize) -> Self {
        self.iteration = iteration;
        self
    }

    pub fn device(&self) -> &Device {
        self.encoder.model.device()
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn kl_weight(&self) -> f64 {
        self.schedule.weight_at(self.iteration)
    }

    /// Cost recorded by the most recent `gradient` call.
    pub fn last_cost(&self) -> Option<f64> {
        self.last_cost
    }

    pub fn rng(&mut self) -> &mut R {
        &mut self.rng
    }

    pub fn fetch<S: AsRef<[u8]>>(&self, samples: &[S]) -> Result<TrainingBatch> {
        TrainingBatch::build(samples, self.device())
    }

    /// Cost of a batch given its encoding and an explicit noise tensor.
    pub fn cost_with_noise(
        &self,
        batch: &TrainingBatch,
        dist: &LatentDistribution,
        noise: &Tensor,
    ) -> Result<Cost> {
        let latent = dist.sample_with(noise)?;
        let log_probs = self.decoder.model.guided(&latent, &batch.guide)?;

        // desired rows are all-zero at absent slots, so the dot product masks itself
        let desired = batch.desired.inputs();
        let recon_sum = log_probs.mul(desired)?.sum_all()?.neg()?;
        let kl_sum = dist.kl_divergence()?.sum_all()?;

        let count = batch.desired.total_present();
        let weight = self.kl_weight();
        let total = ((&recon_sum + (&kl_sum * weight)?)? / count as f64)?;

        Ok(Cost {
            total,
            reconstruction: recon_sum.to_scalar::<f32>()? as f64 / count as f64,
            kl: kl_sum.to_scalar::<f32>()? as f64 / count as f64,
            kl_weight: weight,
            count,
        })
    }

    /// Encode, sample fresh noise, decode and score.
    pub fn total_cost(&mut self, batch: &TrainingBatch) -> Result<Cost> {
        let dist = self.encoder.model.apply(&batch.reversed)?;
        let noise = dist.draw_noise(&mut self.rng)?;
        self.cost_with_noise(batch, &dist, &noise)
    }

    /// Cost and its gradient. The cost value is kept for `last_cost`.
    pub fn gradient(&mut self, batch: &TrainingBatch) -> Result<Gradient> {
        let cost = self.total_cost(batch)?;
        let grads = cost.total.backward()?;
        self.last_cost = Some(cost.value()?);
        Ok(Gradient { grads, cost })
    }

    /// Encoder parameters followed by decoder (stack, readout and mapper) parameters.
    pub fn parameters(&self) -> Vec<Var> {
        let mut vars = self.encoder.vars();
        vars.extend(self.decoder.vars());
        vars
    }

    pub fn finish_iteration(&mut self) {
        self.iteration += 1;
    }

    /// Gradient, optimizer update, counter bump. Returns the cost before the update.
    pub fn train_step<O: Optimizer>(
        &mut self,
        optimizer: &mut O,
        batch: &TrainingBatch,
    ) -> Result<Cost> {
        let Gradient { grads, cost } = self.gradient(batch)?;
        optimizer.step(&grads)?;
        self.finish_iteration();
        Ok(cost)
    }
}
