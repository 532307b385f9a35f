//! Training Loop - Main training execution

use anyhow::{bail, Context, Result};
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use seqvae_core::device_utils::select_device;
use seqvae_core::{Decoder, Encoder, Stored, Trainer};

use super::args::TrainArgs;
use super::checkpoint::{load_training_state, save_securely, save_training_state};
use crate::config::RunConfig;
use crate::samples::read_samples;

fn save_all(trainer: &Trainer<StdRng>, args: &TrainArgs, run: &RunConfig) -> Result<()> {
    save_securely(&trainer.encoder, &args.encoder)?;
    save_securely(&trainer.decoder, &args.decoder)?;
    save_training_state(&args.encoder, trainer.iteration(), trainer.last_cost(), run)?;
    info!(
        "Saved encoder to {:?} and decoder to {:?} at iteration {}",
        args.encoder,
        args.decoder,
        trainer.iteration()
    );
    Ok(())
}

/// Main training function
pub fn run(args: TrainArgs) -> Result<()> {
    // ============================================================
    // Section 1: Initialization
    // ============================================================
    info!("--- Sequence VAE Training ---");
    if args.batch == 0 {
        bail!("--batch must be at least 1");
    }

    let device = select_device(args.cpu);

    let samples = read_samples(&args.data)?;
    if samples.is_empty() {
        bail!("No non-empty samples in {:?}", args.data);
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    info!("Seed: {}", seed);
    let mut run_config = RunConfig::from_args(&args, seed);

    // a stored encoder fixes the sizes for both halves
    let (encoder, enc_loaded) =
        Stored::<Encoder>::load_or_fresh(&args.encoder, &run_config.to_vae_config(), &device)
            .context("failed to load encoder")?;
    run_config.set_model(&encoder.config);
    let vae = encoder.config;
    let (decoder, dec_loaded) = Stored::<Decoder>::load_or_fresh(&args.decoder, &vae, &device)
        .context("failed to load decoder")?;
    if decoder.config != vae {
        bail!(
            "decoder {:?} has {:?} but encoder {:?} has {:?}",
            args.decoder,
            decoder.config,
            args.encoder,
            vae
        );
    }

    info!(
        "Config: Latent={}, Hidden={}, Layers={}, Batch={}",
        vae.latent_size, vae.hidden_size, vae.num_layers, run_config.batch_size
    );
    info!(
        "Hyperparams: Step={}, KL={}, KL warmup={}",
        run_config.step_size, run_config.kl_weight, run_config.kl_warmup
    );
    if enc_loaded != dec_loaded {
        warn!("Only one of encoder/decoder was found; the other starts fresh");
    }

    let start = if enc_loaded {
        match load_training_state(&args.encoder)? {
            Some(state) => {
                match state.cost {
                    Some(cost) => info!(
                        "Resuming from iteration {} (cost {:.6}, saved {})",
                        state.iteration, cost, state.date
                    ),
                    None => info!(
                        "Resuming from iteration {} (saved {})",
                        state.iteration, state.date
                    ),
                }
                if state.run != run_config {
                    info!("Previous run config: {:?}", state.run);
                }
                state.iteration
            }
            None => 0,
        }
    } else {
        0
    };

    let mut trainer = Trainer::new(
        encoder,
        decoder,
        run_config.kl_schedule(),
        StdRng::seed_from_u64(seed),
    )
    .with_iteration(start);

    let mut optimizer = AdamW::new(
        trainer.parameters(),
        ParamsAdamW {
            lr: run_config.step_size,
            weight_decay: 0.0,
            ..Default::default()
        },
    )?;

    // ============================================================
    // Section 2: Interrupt handling
    // ============================================================
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    let ctrl_c_count = Arc::new(AtomicUsize::new(0));
    let c = ctrl_c_count.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        let count = c.fetch_add(1, Ordering::SeqCst) + 1;
        if count == 1 {
            info!("Ctrl+C detected! Finishing current iteration and saving...");
            info!("   (Press Ctrl+C again to force quit WITHOUT saving)");
            r.store(false, Ordering::SeqCst);
        } else {
            error!("Force quit! Exiting immediately without saving.");
            std::process::exit(1);
        }
    }) {
        warn!("Could not install Ctrl+C handler: {}", e);
    }

    // ============================================================
    // Section 3: Loop
    // ============================================================
    info!("Training on {} samples...", samples.len());
    let mut order: Vec<usize> = (0..samples.len()).collect();
    let mut done = 0usize;
    'epochs: while running.load(Ordering::SeqCst) {
        order.shuffle(trainer.rng());
        for chunk in order.chunks(run_config.batch_size) {
            if !running.load(Ordering::SeqCst) {
                break 'epochs;
            }
            if args.steps > 0 && done >= args.steps {
                break 'epochs;
            }

            let batch_samples: Vec<&[u8]> = chunk.iter().map(|&i| samples[i].as_slice()).collect();
            let batch = trainer.fetch(&batch_samples)?;
            let iter = trainer.iteration();
            let cost = trainer.train_step(&mut optimizer, &batch)?;
            done += 1;

            if args.log_interval > 0 && iter % args.log_interval == 0 {
                info!(
                    "iter {}: cost={:.6} (recon={:.6} kl={:.6} weight={})",
                    iter,
                    cost.value()?,
                    cost.reconstruction,
                    cost.kl,
                    cost.kl_weight
                );
            }

            if args.save_interval > 0 && trainer.iteration() % args.save_interval == 0 {
                save_all(&trainer, &args, &run_config)?;
            }
        }
    }

    save_all(&trainer, &args, &run_config)?;
    info!("Training finished after {} iterations this run", done);
    Ok(())
}
