//! One-hot byte codec
//!
//! Bytes are fed to the recurrent stacks as 256-wide indicator vectors.
//! Byte 0 doubles as the start and end-of-sequence marker.

use candle_core::{Device, Result, Tensor};

/// Number of distinct byte values.
pub const ALPHABET: usize = 0x100;

/// Reserved start/end-of-sequence byte.
pub const TERMINATOR: u8 = 0;

/// Indicator vector for `byte` as host data.
pub fn one_hot_vec(byte: u8) -> Vec<f32> {
    let mut data = vec![0f32; ALPHABET];
    data[byte as usize] = 1.0;
    data
}

/// Indicator vector for `byte` as a `(1, 256)` row, ready to be fed as a batch of one.
pub fn one_hot(byte: u8, device: &Device) -> Result<Tensor> {
    Tensor::from_vec(one_hot_vec(byte), (1, ALPHABET), device)
}

/// Index of the most probable entry of a distribution over bytes.
///
/// Accepts any tensor holding exactly 256 values (log-probabilities work too,
/// since the log is monotonic).
pub fn decode_distribution(probabilities: &Tensor) -> Result<u8> {
    let flat = probabilities.flatten_all()?;
    let n = flat.dim(0)?;
    if n != ALPHABET {
        candle_core::bail!("expected {} probabilities, got {}", ALPHABET, n)
    }
    let idx = flat.argmax(0)?.to_scalar::<u32>()?;
    Ok(idx as u8)
}

/// Host-side argmax, ties resolved to the lowest index.
pub fn argmax_slice(values: &[f32]) -> u8 {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_hot_layout() -> Result<()> {
        let t = one_hot(b'h', &Device::Cpu)?;
        assert_eq!(t.dims(), &[1, ALPHABET]);
        let data = t.flatten_all()?.to_vec1::<f32>()?;
        assert_eq!(data.iter().sum::<f32>(), 1.0);
        assert_eq!(data[b'h' as usize], 1.0);
        Ok(())
    }

    #[test]
    fn test_last_byte_round_trip() -> Result<()> {
        for sample in ["hi", "yo", "a", "\u{7f}", "caf\u{e9}"] {
            let last = *sample.as_bytes().last().unwrap();
            let decoded = decode_distribution(&one_hot(last, &Device::Cpu)?)?;
            assert_eq!(decoded, last);
        }
        for byte in 0..=255u8 {
            assert_eq!(argmax_slice(&one_hot_vec(byte)), byte);
        }
        Ok(())
    }

    #[test]
    fn test_rejects_wrong_width() {
        let t = Tensor::zeros(10, candle_core::DType::F32, &Device::Cpu).unwrap();
        assert!(decode_distribution(&t).is_err());
    }
}
