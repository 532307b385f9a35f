use crate::analysis::AnalysisArgs;
use crate::encode::EncodeArgs;
use crate::reconstruct::ReconstructArgs;
use crate::train::TrainArgs;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about = "Byte-level sequence VAE toolchain", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train an encoder/decoder pair on a CSV of samples
    Train(TrainArgs),

    /// Append latent means to every record of a CSV file
    Encode(EncodeArgs),

    /// Reconstruct a string, or interpolate between two
    Reconstruct(ReconstructArgs),

    /// Per-dimension statistics of the encoder output
    Analysis(AnalysisArgs),
}
