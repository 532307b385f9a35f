//! StateMapper - latent vector <-> decoder start state
//!
//! The packed state is the concatenation, over the stateful layers of the
//! decoder stack in order, of each layer's internal cell memory followed by
//! its last output. Stateless layers contribute nothing.

use candle_core::{Module, Tensor};
use candle_nn::rnn::LSTMState;
use candle_nn::{Linear, VarBuilder};

use crate::error::Result;
use crate::layers::{LayerState, StackState};

pub struct StateMapper {
    pub projection: Linear,
    widths: Vec<Option<usize>>,
}

impl StateMapper {
    /// `widths` holds one entry per stack layer, `None` for stateless ones.
    pub fn new(latent_size: usize, widths: Vec<Option<usize>>, vb: VarBuilder) -> Result<Self> {
        let packed: usize = widths.iter().flatten().map(|w| 2 * w).sum();
        let projection = candle_nn::linear(latent_size, packed, vb.pp("projection"))?;
        Ok(Self { projection, widths })
    }

    pub fn packed_width(&self) -> usize {
        self.partition().iter().sum()
    }

    /// Widths of the packed blocks in order: internal then output, per stateful layer.
    pub fn partition(&self) -> Vec<usize> {
        self.widths
            .iter()
            .flatten()
            .flat_map(|&w| [w, w])
            .collect()
    }

    /// Linear map from (batch, latent) to a full stack state.
    pub fn latent_to_state(&self, latent: &Tensor) -> Result<StackState> {
        let packed = self.projection.forward(latent)?;
        self.unpack(&packed)
    }

    /// Split a (batch, packed) tensor into per-layer states.
    pub fn unpack(&self, packed: &Tensor) -> Result<StackState> {
        let mut offset = 0;
        let mut state = Vec::with_capacity(self.widths.len());
        for width in &self.widths {
            match width {
                Some(w) => {
                    let c = packed.narrow(1, offset, *w)?;
                    let h = packed.narrow(1, offset + w, *w)?;
                    offset += 2 * w;
                    state.push(LayerState::Lstm(LSTMState::new(h, c)));
                }
                None => state.push(LayerState::Stateless),
            }
        }
        Ok(state)
    }

    /// Inverse of `unpack`.
    pub fn pack(&self, state: &[LayerState]) -> Result<Tensor> {
        let mut parts = Vec::with_capacity(2 * self.widths.len());
        for layer in state {
            if let LayerState::Lstm(s) = layer {
                parts.push(s.c().clone());
                parts.push(s.h().clone());
            }
        }
        Ok(Tensor::cat(&parts, 1)?)
    }

    /// Pull a gradient with respect to the start state back to the latent vector.
    ///
    /// The map is linear, so this is the packed gradient times the projection weight.
    /// Training takes this gradient from autodiff instead; this is the closed
    /// form, checked against autodiff in `test_gradient_matches_autodiff`.
    pub fn state_to_latent_gradient(&self, state_grad: &[LayerState]) -> Result<Tensor> {
        let packed = self.pack(state_grad)?;
        Ok(packed.matmul(self.projection.weight())?)
    }
}
