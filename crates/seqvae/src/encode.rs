//! Encode - append latent means to a CSV file

use anyhow::{bail, Context, Result};
use clap::Args;
use csv::WriterBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::info;

use seqvae_core::device_utils::select_device;
use seqvae_core::{Encoder, Stored};

use crate::samples::{body, read_records};

#[derive(Args, Debug, Clone)]
pub struct EncodeArgs {
    /// Input CSV file
    #[arg(long, required = true)]
    pub data: PathBuf,

    /// Output CSV file
    #[arg(long, default_value = "out.csv")]
    pub out: PathBuf,

    #[arg(long, default_value = "enc_out")]
    pub encoder: PathBuf,

    /// Computation batch size
    #[arg(long, default_value_t = 8)]
    pub batch: usize,

    #[arg(long, action)]
    pub cpu: bool,
}

pub fn run(args: EncodeArgs) -> Result<()> {
    if args.batch == 0 {
        bail!("--batch must be at least 1");
    }
    let device = select_device(args.cpu);

    info!("Loading encoder...");
    let encoder: Stored<Encoder> = Stored::load(&args.encoder, &device)
        .with_context(|| format!("failed to load encoder {:?}", args.encoder))?;

    info!("Reading samples...");
    let records = read_records(&args.data)?;
    if let Some(index) = records.iter().position(|r| body(r).is_empty()) {
        bail!("record {} of {:?} has an empty body", index, args.data);
    }

    let mut writer = WriterBuilder::new()
        .flexible(true)
        .from_path(&args.out)
        .with_context(|| format!("failed to create {:?}", args.out))?;

    info!("Encoding {} records...", records.len());
    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    for chunk in records.chunks(args.batch) {
        let bodies: Vec<&[u8]> = chunk.iter().map(body).collect();
        let (mean, _) = encoder.model.encode(&bodies)?;
        let mean = mean.to_vec2::<f32>()?;

        for (record, row) in chunk.iter().zip(mean) {
            let mut out = record.clone();
            for v in row {
                out.push_field(format!("{:.6}", v).as_bytes());
            }
            writer.write_byte_record(&out)?;
        }
        writer.flush()?;
        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();

    info!("Wrote {:?}", args.out);
    Ok(())
}
