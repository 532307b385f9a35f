pub mod analysis;
pub mod cli;
pub mod config;
pub mod encode;
pub mod reconstruct;
pub mod samples;
pub mod train;
