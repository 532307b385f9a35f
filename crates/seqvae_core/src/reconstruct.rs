//! Reconstruction and latent-space interpolation

use crate::error::{Result, VaeError};
use crate::model::{Decoded, Decoder, Encoder};

/// Decode the most probable code of `text`.
pub fn reconstruct(
    encoder: &Encoder,
    decoder: &Decoder,
    text: &[u8],
    max_len: usize,
) -> Result<Decoded> {
    let (mean, _) = encoder.encode(&[text])?;
    decoder.unguided(&mean, max_len)
}

/// Decode `stops` evenly spaced points on the line between the codes of
/// `start` and `end`.
///
/// Point `i` sits at fraction `i / (stops - 1)`. A single stop is the start
/// code itself, so `end` is not encoded in that case.
pub fn interpolate(
    encoder: &Encoder,
    decoder: &Decoder,
    start: &[u8],
    end: &[u8],
    stops: usize,
    max_len: usize,
) -> Result<Vec<(f64, Decoded)>> {
    if stops < 1 {
        return Err(VaeError::InvalidStops(stops));
    }
    if stops == 1 {
        return Ok(vec![(0.0, reconstruct(encoder, decoder, start, max_len)?)]);
    }

    let (means, _) = encoder.encode(&[start, end])?;
    let from = means.get(0)?;
    let to = means.get(1)?;

    let mut out = Vec::with_capacity(stops);
    for i in 0..stops {
        let frac = i as f64 / (stops - 1) as f64;
        let point = ((&from * (1.0 - frac))? + (&to * frac)?)?;
        out.push((frac, decoder.unguided(&point, max_len)?));
    }
    Ok(out)
}
