//! Layers Module - Building blocks of the encoder and decoder stacks
//!
//! - RecurrentStack: ordered stack of stateful LSTM cells and stateless layers
//! - Readout: fully-connected projection to 256 classes + log-softmax
//! - GaussianHead: paired mean / log-stddev projections

pub mod gaussian_head;
pub mod readout;
pub mod recurrent;

pub use gaussian_head::GaussianHead;
pub use readout::Readout;
pub use recurrent::{LayerState, RecurrentStack, StackLayer, StackState};
