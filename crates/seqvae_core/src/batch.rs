//! Sample batch builder
//!
//! Turns raw byte strings into padded, masked one-hot sequence batches:
//! - `reversed`: the sample bytes back to front, consumed by the encoder
//! - `guide`: terminator followed by the sample, fed to the decoder under teacher forcing
//! - `desired`: the sample followed by the terminator, what the decoder must predict

use candle_core::{Device, Tensor};

use crate::codec::{ALPHABET, TERMINATOR};
use crate::error::{Result, VaeError};

/// Right-padded batch of one-hot sequences.
///
/// Slots past a sample's length are absent: their one-hot rows are all zero
/// and their mask entry is 0.
#[derive(Debug, Clone)]
pub struct SeqBatch {
    /// (batch, time, 256)
    inputs: Tensor,
    /// (batch, time), 1.0 where the slot holds real data
    mask: Tensor,
    lengths: Vec<usize>,
}

impl SeqBatch {
    /// Build a batch from per-sample byte sequences, one one-hot row per byte.
    pub fn from_sequences<S: AsRef<[u8]>>(seqs: &[S], device: &Device) -> Result<Self> {
        let lengths: Vec<usize> = seqs.iter().map(|s| s.as_ref().len()).collect();
        let b_sz = seqs.len();
        let t_len = lengths.iter().copied().max().unwrap_or(0);

        let mut data = vec![0f32; b_sz * t_len * ALPHABET];
        let mut mask = vec![0f32; b_sz * t_len];
        for (b, seq) in seqs.iter().enumerate() {
            for (t, &byte) in seq.as_ref().iter().enumerate() {
                let slot = b * t_len + t;
                data[slot * ALPHABET + byte as usize] = 1.0;
                mask[slot] = 1.0;
            }
        }

        let inputs = Tensor::from_vec(data, (b_sz, t_len, ALPHABET), device)?;
        let mask = Tensor::from_vec(mask, (b_sz, t_len), device)?;
        Ok(Self {
            inputs,
            mask,
            lengths,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.lengths.len()
    }

    /// Length of the longest sequence (the padded time extent).
    pub fn max_len(&self) -> usize {
        self.lengths.iter().copied().max().unwrap_or(0)
    }

    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    pub fn inputs(&self) -> &Tensor {
        &self.inputs
    }

    pub fn mask(&self) -> &Tensor {
        &self.mask
    }

    /// One-hot rows for timestep `t`, shape (batch, 256).
    pub fn step(&self, t: usize) -> Result<Tensor> {
        Ok(self.inputs.narrow(1, t, 1)?.squeeze(1)?.contiguous()?)
    }

    /// Per-sample present flags at timestep `t`.
    pub fn present(&self, t: usize) -> Vec<bool> {
        self.lengths.iter().map(|&len| t < len).collect()
    }

    pub fn num_present(&self, t: usize) -> usize {
        self.lengths.iter().filter(|&&len| t < len).count()
    }

    /// Count of real (sample, timestep) pairs across the whole batch.
    pub fn total_present(&self) -> usize {
        self.lengths.iter().sum()
    }

    /// (batch, time) selector with a single 1.0 at each sample's final timestep.
    ///
    /// Zero-length sequences get an all-zero row.
    pub fn tail_selector(&self) -> Result<Tensor> {
        let t_len = self.max_len();
        let mut sel = vec![0f32; self.batch_size() * t_len];
        for (b, &len) in self.lengths.iter().enumerate() {
            if len > 0 {
                sel[b * t_len + len - 1] = 1.0;
            }
        }
        Ok(Tensor::from_vec(
            sel,
            (self.batch_size(), t_len),
            self.inputs.device(),
        )?)
    }

    /// Fails unless the batch has at least one sequence and none is empty.
    pub fn check_non_empty(&self) -> Result<()> {
        if self.lengths.is_empty() {
            return Err(VaeError::EmptyBatch);
        }
        if let Some(index) = self.lengths.iter().position(|&len| len == 0) {
            return Err(VaeError::EmptySequence { index });
        }
        Ok(())
    }
}

/// The three aligned sequence batches used by one training iteration.
#[derive(Debug, Clone)]
pub struct TrainingBatch {
    pub reversed: SeqBatch,
    pub guide: SeqBatch,
    pub desired: SeqBatch,
}

impl TrainingBatch {
    /// Build a training batch. Every sample must hold at least one byte.
    pub fn build<S: AsRef<[u8]>>(samples: &[S], device: &Device) -> Result<Self> {
        if samples.is_empty() {
            return Err(VaeError::EmptyBatch);
        }

        let mut reversed = Vec::with_capacity(samples.len());
        let mut guide = Vec::with_capacity(samples.len());
        let mut desired = Vec::with_capacity(samples.len());
        for (index, sample) in samples.iter().enumerate() {
            let data = sample.as_ref();
            if data.is_empty() {
                return Err(VaeError::EmptySample { index });
            }

            let mut seq = Vec::with_capacity(data.len() + 2);
            seq.push(TERMINATOR);
            seq.extend_from_slice(data);
            seq.push(TERMINATOR);

            guide.push(seq[..seq.len() - 1].to_vec());
            desired.push(seq[1..].to_vec());
            reversed.push(data.iter().rev().copied().collect::<Vec<u8>>());
        }

        Ok(Self {
            reversed: SeqBatch::from_sequences(&reversed, device)?,
            guide: SeqBatch::from_sequences(&guide, device)?,
            desired: SeqBatch::from_sequences(&desired, device)?,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.guide.batch_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::argmax_slice;

    fn decode_rows(batch: &SeqBatch, b: usize) -> anyhow::Result<Vec<u8>> {
        let rows = batch.inputs().get(b)?.to_vec2::<f32>()?;
        Ok(rows
            .iter()
            .take(batch.lengths()[b])
            .map(|r| argmax_slice(r))
            .collect())
    }

    #[test]
    fn test_sequences_are_built_around_terminators() -> anyhow::Result<()> {
        let batch = TrainingBatch::build(&["hi", "yo!"], &Device::Cpu)?;

        assert_eq!(decode_rows(&batch.guide, 0)?, vec![0, b'h', b'i']);
        assert_eq!(decode_rows(&batch.desired, 0)?, vec![b'h', b'i', 0]);
        assert_eq!(decode_rows(&batch.reversed, 0)?, vec![b'i', b'h']);
        assert_eq!(decode_rows(&batch.reversed, 1)?, vec![b'!', b'o', b'y']);

        assert_eq!(batch.guide.lengths(), &[3, 4]);
        assert_eq!(batch.desired.lengths(), &[3, 4]);
        assert_eq!(batch.reversed.lengths(), &[2, 3]);
        assert_eq!(batch.desired.total_present(), 7);
        Ok(())
    }

    #[test]
    fn test_padding_is_absent() -> anyhow::Result<()> {
        let batch = TrainingBatch::build(&["a", "abcd"], &Device::Cpu)?;
        let mask = batch.guide.mask().to_vec2::<f32>()?;
        assert_eq!(mask[0], vec![1.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(mask[1], vec![1.0; 5]);

        let padded = batch.guide.inputs().get(0)?.get(3)?.to_vec1::<f32>()?;
        assert!(padded.iter().all(|&v| v == 0.0));
        assert_eq!(batch.guide.present(2), vec![false, true]);
        Ok(())
    }

    #[test]
    fn test_present_count_never_increases() -> anyhow::Result<()> {
        let batch = TrainingBatch::build(&["abc", "a", "hello there", "xy"], &Device::Cpu)?;
        for seqs in [&batch.reversed, &batch.guide, &batch.desired] {
            assert_eq!(seqs.num_present(0), seqs.batch_size());
            for t in 1..seqs.max_len() {
                assert!(seqs.num_present(t) <= seqs.num_present(t - 1));
            }
        }
        Ok(())
    }

    #[test]
    fn test_tail_selector_marks_last_step() -> anyhow::Result<()> {
        let batch = SeqBatch::from_sequences(&[vec![1u8, 2, 3], vec![4u8]], &Device::Cpu)?;
        let sel = batch.tail_selector()?.to_vec2::<f32>()?;
        assert_eq!(sel[0], vec![0.0, 0.0, 1.0]);
        assert_eq!(sel[1], vec![1.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_empty_sample_rejected() {
        let err = TrainingBatch::build(&["ok", ""], &Device::Cpu).unwrap_err();
        assert!(matches!(err, VaeError::EmptySample { index: 1 }));

        let none: [&str; 0] = [];
        let err = TrainingBatch::build(&none, &Device::Cpu).unwrap_err();
        assert!(matches!(err, VaeError::EmptyBatch));
    }

    #[test]
    fn test_check_non_empty() -> anyhow::Result<()> {
        let batch = SeqBatch::from_sequences(&[vec![1u8], vec![]], &Device::Cpu)?;
        assert!(matches!(
            batch.check_non_empty(),
            Err(VaeError::EmptySequence { index: 1 })
        ));
        Ok(())
    }
}
