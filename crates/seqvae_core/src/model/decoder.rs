//! Decoder - latent vectors back to byte sequences

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use tracing::debug;

use crate::batch::SeqBatch;
use crate::codec::{decode_distribution, one_hot, TERMINATOR};
use crate::error::{Result, VaeError};
use crate::layers::{Readout, RecurrentStack, StackLayer};
use crate::model::{StateMapper, VaeConfig};

/// Default cap on bytes produced by unguided decoding.
pub const DEFAULT_MAX_DECODE_LEN: usize = 1024;

/// Output of unguided decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Produced bytes, terminator excluded.
    pub bytes: Vec<u8>,
    /// False when generation stopped at the length cap instead of a terminator.
    pub terminated: bool,
}

impl Decoded {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// LSTM stack topped by a 256-way readout, started from a mapped latent vector.
pub struct Decoder {
    pub stack: RecurrentStack,
    pub mapper: StateMapper,
    pub config: VaeConfig,
}

impl Decoder {
    pub fn load(config: &VaeConfig, vb: VarBuilder) -> Result<Self> {
        let mut stack =
            RecurrentStack::lstm_stack(config.num_layers, config.hidden_size, vb.pp("stack"))?;
        stack.push(StackLayer::Readout(Readout::load(
            config.hidden_size,
            vb.pp("readout"),
        )?));
        let mapper = StateMapper::new(config.latent_size, stack.state_widths(), vb.pp("mapper"))?;
        Ok(Self {
            stack,
            mapper,
            config: *config,
        })
    }

    fn check_latent_width(&self, got: usize) -> Result<()> {
        if got != self.config.latent_size {
            return Err(VaeError::LatentShape {
                expected: self.config.latent_size,
                got,
            });
        }
        Ok(())
    }

    /// Teacher-forced decoding.
    ///
    /// `latent` is (batch, latent) and `guide` holds the terminator-prefixed
    /// samples. Returns log-probabilities (batch, time, 256); rows at absent
    /// slots are computed but carry no meaning.
    pub fn guided(&self, latent: &Tensor, guide: &SeqBatch) -> Result<Tensor> {
        let (b_sz, width) = latent.dims2()?;
        self.check_latent_width(width)?;
        if b_sz != guide.batch_size() {
            return Err(candle_core::Error::Msg(format!(
                "latent batch has {} rows but guide has {} sequences",
                b_sz,
                guide.batch_size()
            ))
            .into());
        }
        guide.check_non_empty()?;

        let mut state = self.mapper.latent_to_state(latent)?;
        let mut outputs = Vec::with_capacity(guide.max_len());
        for t in 0..guide.max_len() {
            let (next, out) = self.stack.step(&state, &guide.step(t)?)?;
            state = next;
            outputs.push(out);
        }
        Ok(Tensor::stack(&outputs, 1)?)
    }

    /// Greedy generation from a single latent vector.
    ///
    /// Starts from the terminator, feeds back the most probable byte each step
    /// and stops when the terminator comes out or `max_len` bytes are produced.
    pub fn unguided(&self, latent: &Tensor, max_len: usize) -> Result<Decoded> {
        let latent = latent.flatten_all()?;
        self.check_latent_width(latent.dim(0)?)?;
        let latent = latent.unsqueeze(0)?;

        let device = self.device().clone();
        let mut state = self.mapper.latent_to_state(&latent)?;
        let mut input = one_hot(TERMINATOR, &device)?;
        let mut bytes = Vec::new();
        loop {
            let (next, out) = self.stack.step(&state, &input)?;
            state = next;
            let byte = decode_distribution(&out)?;
            if byte == TERMINATOR {
                return Ok(Decoded {
                    bytes,
                    terminated: true,
                });
            }
            if bytes.len() == max_len {
                debug!("unguided decode hit the {} byte cap", max_len);
                return Ok(Decoded {
                    bytes,
                    terminated: false,
                });
            }
            bytes.push(byte);
            input = one_hot(byte, &device)?;
        }
    }

    pub fn device(&self) -> &Device {
        self.mapper.projection.weight().device()
    }
}
