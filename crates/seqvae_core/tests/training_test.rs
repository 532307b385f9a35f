use candle_core::{DType, Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use rand::rngs::StdRng;
use rand::SeedableRng;
use seqvae_core::codec::TERMINATOR;
use seqvae_core::{KlSchedule, Stored, Trainer, VaeConfig};

fn trainer(config: VaeConfig, kl: f64, seed: u64) -> anyhow::Result<Trainer<StdRng>> {
    Ok(Trainer::new(
        Stored::fresh(&config, &Device::Cpu)?,
        Stored::fresh(&config, &Device::Cpu)?,
        KlSchedule::Constant(kl),
        StdRng::seed_from_u64(seed),
    ))
}

fn adam(trainer: &Trainer<StdRng>, lr: f64) -> candle_core::Result<AdamW> {
    AdamW::new(
        trainer.parameters(),
        ParamsAdamW {
            lr,
            weight_decay: 0.0,
            ..Default::default()
        },
    )
}

#[test]
fn test_two_iterations_change_the_cost() -> anyhow::Result<()> {
    let mut t = trainer(VaeConfig::new(4, 8, 3), 0.5, 11)?;
    let mut opt = adam(&t, 0.01)?;
    let batch = t.fetch(&["hi", "yo"])?;

    let first = t.train_step(&mut opt, &batch)?.value()?;
    assert!(first.is_finite(), "first cost {}", first);
    assert_eq!(t.last_cost(), Some(first));
    assert_eq!(t.iteration(), 1);

    let second = t.train_step(&mut opt, &batch)?.value()?;
    assert!(second.is_finite());
    assert_ne!(first, second);
    Ok(())
}

#[test]
fn test_cost_ignores_sample_order() -> anyhow::Result<()> {
    let t = trainer(VaeConfig::new(4, 8, 3), 1.0, 5)?;
    let samples = ["hi", "a longer one", "yo"];
    let permuted = ["yo", "hi", "a longer one"];

    let rows: Vec<Vec<f32>> = vec![
        vec![0.1, -0.4, 1.2, 0.0],
        vec![-1.0, 0.3, 0.2, 0.7],
        vec![0.5, 0.5, -0.5, -0.9],
    ];
    let noise_for = |order: [usize; 3]| -> candle_core::Result<Tensor> {
        let flat: Vec<f32> = order.iter().flat_map(|&i| rows[i].clone()).collect();
        Tensor::from_vec(flat, (3, 4), &Device::Cpu)
    };

    let batch = t.fetch(&samples)?;
    let dist = t.encoder.model.apply(&batch.reversed)?;
    let a = t.cost_with_noise(&batch, &dist, &noise_for([0, 1, 2])?)?;

    let batch = t.fetch(&permuted)?;
    let dist = t.encoder.model.apply(&batch.reversed)?;
    let b = t.cost_with_noise(&batch, &dist, &noise_for([2, 0, 1])?)?;

    assert_eq!(a.count, b.count);
    assert!((a.value()? - b.value()?).abs() < 1e-4);
    Ok(())
}

#[test]
fn test_overfit_single_sample() -> anyhow::Result<()> {
    let config = VaeConfig::new(4, 16, 3);
    let mut t = trainer(config, 0.0, 1)?;
    let mut opt = adam(&t, 0.01)?;
    let batch = t.fetch(&["ab"; 4])?;

    for _ in 0..1000 {
        let cost = t.train_step(&mut opt, &batch)?.value()?;
        if cost < 0.01 {
            break;
        }
    }

    let (mean, _) = t.encoder.model.encode(&["ab"])?;
    let decoded = t.decoder.model.unguided(&mean, 16)?;
    assert!(decoded.terminated);
    assert_eq!(decoded.bytes, b"ab".to_vec());
    assert!(!decoded.bytes.contains(&TERMINATOR));
    Ok(())
}

#[test]
fn test_empty_sample_aborts_the_iteration() -> anyhow::Result<()> {
    let t = trainer(VaeConfig::new(4, 8, 3), 0.0, 2)?;
    assert!(t.fetch(&["ok", ""]).is_err());
    let none: [&str; 0] = [];
    assert!(t.fetch(&none).is_err());

    let zeros = Tensor::zeros((1, 4), DType::F32, &Device::Cpu)?;
    let guide = seqvae_core::SeqBatch::from_sequences(&[Vec::<u8>::new()], &Device::Cpu)?;
    assert!(t.decoder.model.guided(&zeros, &guide).is_err());
    Ok(())
}
