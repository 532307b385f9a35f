//! RecurrentStack - LSTM stack with optional stateless layers
//!
//! Each stack element is tagged with whether it owns per-sample state.
//! Only LSTM cells carry state; stateless layers (the decoder readout)
//! get `LayerState::Stateless` and are skipped by state packing.

use candle_core::{Module, Result, Tensor};
use candle_nn::rnn::LSTMState;
use candle_nn::{Init, LSTMConfig, VarBuilder, LSTM, RNN};

use super::Readout;
use crate::codec::ALPHABET;

/// Input-weight stddev for cells that consume one-hot bytes.
///
/// Only one of the 256 inputs is active per step, so the weights start
/// larger than a dense fan-in init would give them.
const ONE_HOT_INPUT_STDDEV: f64 = 1.0;

/// One element of a recurrent stack.
pub enum StackLayer {
    Lstm { cell: LSTM, hidden: usize },
    Readout(Readout),
}

/// Per-layer state for a whole batch.
#[derive(Debug, Clone)]
pub enum LayerState {
    /// `h` is the last output, `c` the internal cell memory, both (batch, hidden).
    Lstm(LSTMState),
    Stateless,
}

pub type StackState = Vec<LayerState>;

impl StackLayer {
    pub fn lstm(in_dim: usize, hidden: usize, vb: VarBuilder) -> Result<Self> {
        let mut config = LSTMConfig::default();
        if in_dim == ALPHABET {
            config.w_ih_init = Init::Randn {
                mean: 0.0,
                stdev: ONE_HOT_INPUT_STDDEV,
            };
        }
        let cell = candle_nn::lstm(in_dim, hidden, config, vb)?;
        Ok(Self::Lstm { cell, hidden })
    }

    /// Width of the state vectors, `None` for stateless layers.
    pub fn state_width(&self) -> Option<usize> {
        match self {
            Self::Lstm { hidden, .. } => Some(*hidden),
            Self::Readout(_) => None,
        }
    }

    /// Default start state for `batch` samples.
    pub fn start(&self, batch: usize) -> Result<LayerState> {
        match self {
            Self::Lstm { cell, .. } => Ok(LayerState::Lstm(cell.zero_state(batch)?)),
            Self::Readout(_) => Ok(LayerState::Stateless),
        }
    }

    /// Advance one timestep. Returns the new state and the layer output.
    pub fn step(&self, state: &LayerState, xs: &Tensor) -> Result<(LayerState, Tensor)> {
        match (self, state) {
            (Self::Lstm { cell, .. }, LayerState::Lstm(s)) => {
                let next = cell.step(xs, s)?;
                let out = next.h().clone();
                Ok((LayerState::Lstm(next), out))
            }
            (Self::Readout(readout), LayerState::Stateless) => {
                Ok((LayerState::Stateless, readout.forward(xs)?))
            }
            _ => candle_core::bail!("stack state does not match its layer"),
        }
    }
}

/// An ordered stack of layers applied one after another at every timestep.
pub struct RecurrentStack {
    pub layers: Vec<StackLayer>,
}

impl RecurrentStack {
    /// `num_layers` LSTM cells of width `hidden`, the first fed one-hot bytes.
    pub fn lstm_stack(num_layers: usize, hidden: usize, vb: VarBuilder) -> Result<Self> {
        let mut layers = Vec::with_capacity(num_layers + 1);
        for i in 0..num_layers {
            let in_dim = if i == 0 { ALPHABET } else { hidden };
            layers.push(StackLayer::lstm(in_dim, hidden, vb.pp(format!("lstm{}", i)))?);
        }
        Ok(Self { layers })
    }

    pub fn push(&mut self, layer: StackLayer) {
        self.layers.push(layer);
    }

    pub fn state_widths(&self) -> Vec<Option<usize>> {
        self.layers.iter().map(StackLayer::state_width).collect()
    }

    pub fn start(&self, batch: usize) -> Result<StackState> {
        self.layers.iter().map(|l| l.start(batch)).collect()
    }

    /// Run every layer once. Returns the new state and the top layer's output.
    pub fn step(&self, state: &[LayerState], xs: &Tensor) -> Result<(StackState, Tensor)> {
        if state.len() != self.layers.len() {
            candle_core::bail!(
                "stack has {} layers but state has {} entries",
                self.layers.len(),
                state.len()
            )
        }
        let mut next = Vec::with_capacity(self.layers.len());
        let mut h = xs.clone();
        for (layer, s) in self.layers.iter().zip(state) {
            let (s_new, out) = layer.step(s, &h)?;
            next.push(s_new);
            h = out;
        }
        Ok((next, h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_stack_shapes() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let mut stack = RecurrentStack::lstm_stack(2, 8, vb.pp("stack"))?;
        stack.push(StackLayer::Readout(Readout::load(8, vb.pp("readout"))?));
        assert_eq!(stack.state_widths(), vec![Some(8), Some(8), None]);

        let state = stack.start(3)?;
        assert!(matches!(state[2], LayerState::Stateless));

        let xs = Tensor::zeros((3, ALPHABET), DType::F32, &device)?;
        let (next, out) = stack.step(&state, &xs)?;
        assert_eq!(out.dims(), &[3, ALPHABET]);
        match &next[1] {
            LayerState::Lstm(s) => {
                assert_eq!(s.h().dims(), &[3, 8]);
                assert_eq!(s.c().dims(), &[3, 8]);
            }
            LayerState::Stateless => panic!("expected lstm state"),
        }

        // log-softmax rows sum to one in probability space
        let total = out.exp()?.sum(1)?.to_vec1::<f32>()?;
        for v in total {
            assert!((v - 1.0).abs() < 1e-4);
        }
        Ok(())
    }

    #[test]
    fn test_mismatched_state_rejected() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let stack = RecurrentStack::lstm_stack(2, 4, vb)?;
        let xs = Tensor::zeros((1, ALPHABET), DType::F32, &device)?;
        assert!(stack.step(&[LayerState::Stateless], &xs).is_err());
        Ok(())
    }
}
