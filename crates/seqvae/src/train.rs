//! Train Module - Training pipeline for the sequence VAE
//!
//! - TrainArgs: CLI arguments for training
//! - checkpoint: parameter-set and training-state persistence
//! - training_loop: the main loop

pub mod args;
pub mod checkpoint;
pub mod training_loop;

pub use args::TrainArgs;
pub use checkpoint::{save_securely, save_training_state, TrainingState};
pub use training_loop::run;
