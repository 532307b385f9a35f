//! Reconstruct - decode a string's code, or walk between two codes

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::{info, warn};

use seqvae_core::device_utils::select_device;
use seqvae_core::model::decoder::DEFAULT_MAX_DECODE_LEN;
use seqvae_core::{interpolate, reconstruct, Decoded, Decoder, Encoder, Stored, VaeError};

#[derive(Args, Debug, Clone)]
pub struct ReconstructArgs {
    #[arg(long, default_value = "enc_out")]
    pub encoder: PathBuf,

    #[arg(long, default_value = "dec_out")]
    pub decoder: PathBuf,

    /// Text to reconstruct (the interpolation start)
    #[arg(long, required = true)]
    pub text: String,

    /// Interpolation end
    #[arg(long)]
    pub end: Option<String>,

    /// Number of interpolation stops
    #[arg(long, default_value_t = 1)]
    pub stops: usize,

    /// Upper bound on generated bytes
    #[arg(long, default_value_t = DEFAULT_MAX_DECODE_LEN)]
    pub max_len: usize,

    #[arg(long, action)]
    pub cpu: bool,
}

fn check_bound(decoded: &Decoded, max_len: usize) {
    if !decoded.terminated {
        warn!("Generation stopped at the {} byte limit without a terminator", max_len);
    }
}

/// Output lines, in order.
pub fn render(args: &ReconstructArgs, encoder: &Encoder, decoder: &Decoder) -> Result<Vec<String>> {
    if args.stops == 0 {
        return Err(VaeError::InvalidStops(0).into());
    }
    if args.stops == 1 {
        let decoded = reconstruct(encoder, decoder, args.text.as_bytes(), args.max_len)?;
        check_bound(&decoded, args.max_len);
        return Ok(vec![format!("Decoded to: {}", decoded.text())]);
    }

    let end = args
        .end
        .as_deref()
        .context("--end is required when --stops is greater than 1")?;
    let points = interpolate(
        encoder,
        decoder,
        args.text.as_bytes(),
        end.as_bytes(),
        args.stops,
        args.max_len,
    )?;
    Ok(points
        .iter()
        .map(|(frac, decoded)| {
            check_bound(decoded, args.max_len);
            format!("{:.3}: {}", frac, decoded.text())
        })
        .collect())
}

pub fn run(args: ReconstructArgs) -> Result<()> {
    let device = select_device(args.cpu);

    info!("Loading encoder and decoder...");
    let encoder: Stored<Encoder> = Stored::load(&args.encoder, &device)
        .with_context(|| format!("failed to load encoder {:?}", args.encoder))?;
    let decoder: Stored<Decoder> = Stored::load(&args.decoder, &device)
        .with_context(|| format!("failed to load decoder {:?}", args.decoder))?;

    for line in render(&args, &encoder.model, &decoder.model)? {
        println!("{}", line);
    }
    Ok(())
}
