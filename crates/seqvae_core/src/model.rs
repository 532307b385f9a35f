//! Model Module - Sequence VAE architecture
//!
//! - VaeConfig: architecture sizes
//! - Encoder: reversed bytes -> (mean, log-stddev)
//! - StateMapper: latent vector <-> decoder stack state
//! - Decoder: latent vector -> byte distributions (guided) or bytes (unguided)
//! - Stored: a parameter set together with its VarMap and on-disk format

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod state_mapper;
pub mod store;

pub use config::VaeConfig;
pub use decoder::{Decoded, Decoder};
pub use encoder::Encoder;
pub use state_mapper::StateMapper;
pub use store::{ParamSet, Stored};
