//! Per-channel sub-block residual coding: a sub-block is partitioned into
//! contiguous regions of at most 32 samples, each an independent [`PredRegion`]
//! (order 0 for a pure PCM residual, >0 for a lattice-predicted one) followed by
//! its own bit-depth and signed residual samples.

use crate::dlc::predictor::PredRegion;
use crate::utils::bitstream_io::{BitReader, BitWriter};
use crate::utils::errors::Result;

const MAX_SAMPLES_PER_REGION: usize = 32;

/// Minimum signed bit width that represents every sample in `samples`, per the
/// "minimum width signed magnitude PCM" residual coding this codec uses (1..=24).
fn bit_depth_for(samples: &[i64]) -> u32 {
    let max_abs = samples.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
    let mut bits = 1u32;
    while bits < 24 && (1i64 << (bits - 1)) <= max_abs as i64 {
        bits += 1;
    }
    bits
}

fn write_region(writer: &mut BitWriter, samples: &[i64]) -> Result<()> {
    debug_assert!(!samples.is_empty() && samples.len() <= MAX_SAMPLES_PER_REGION);
    let mut region = PredRegion::default();
    region.set_region_length((samples.len() - 1) as u8)?;
    region.write(writer)?;
    let bit_depth = bit_depth_for(samples);
    writer.write(bit_depth as u64, 5)?;
    for &sample in samples {
        writer.write_signed(sample, bit_depth)?;
    }
    Ok(())
}

/// Writes `samples` (one DLC sub-block's worth) as a sequence of regions.
pub fn write_subblock(writer: &mut BitWriter, samples: &[i64]) -> Result<()> {
    for chunk in samples.chunks(MAX_SAMPLES_PER_REGION) {
        write_region(writer, chunk)?;
    }
    Ok(())
}

fn read_region(reader: &mut BitReader, history: &[i64]) -> Result<Vec<i64>> {
    let region = PredRegion::read(reader)?;
    let bit_depth = reader.read(5)? as u32;
    let len = region.region_length() as usize + 1;
    let mut residual = Vec::with_capacity(len);
    for _ in 0..len {
        residual.push(reader.read_signed(bit_depth)?);
    }
    Ok(region.reconstruct(&residual, history))
}

/// Reads one sub-block of exactly `sample_count` samples, threading lattice
/// history across region boundaries within the sub-block.
pub fn read_subblock(reader: &mut BitReader, sample_count: usize) -> Result<Vec<i64>> {
    let mut decoded = Vec::with_capacity(sample_count);
    while decoded.len() < sample_count {
        let history_start = decoded.len().saturating_sub(MAX_SAMPLES_PER_REGION);
        let history = decoded[history_start..].to_vec();
        let region_samples = read_region(reader, &history)?;
        decoded.extend(region_samples);
    }
    decoded.truncate(sample_count);
    Ok(decoded)
}
