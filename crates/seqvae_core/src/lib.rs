//! Sequence VAE Engine
//!
//! Core implementation of the byte-level sequence-to-sequence variational autoencoder.
//! An encoder maps a byte string to a Gaussian over latent codes, a decoder rebuilds
//! the string from a sampled code. Tensor math and autodiff are provided by candle.

pub mod batch;
pub mod codec;
pub mod device_utils;
pub mod error;
pub mod latent;
pub mod layers;
pub mod model;
pub mod reconstruct;
pub mod trainer;

pub use batch::{SeqBatch, TrainingBatch};
pub use error::{Result, VaeError};
pub use latent::LatentDistribution;
pub use model::{Decoded, Decoder, Encoder, ParamSet, StateMapper, Stored, VaeConfig};
pub use reconstruct::{interpolate, reconstruct};
pub use trainer::{Cost, Gradient, KlSchedule, Trainer};
