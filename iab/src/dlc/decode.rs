//! `FullDecoder` (§3 C3): decodes an `AudioDataDLC` payload back to baseband PCM,
//! reconstructing any predictor-coded regions and reversing the 96 kHz band split.

use crate::dlc::encode::interpolate;
use crate::dlc::subblock::read_subblock;
use crate::structs::frame::SampleRate;
use crate::utils::bitstream_io::BitReader;
use crate::utils::errors::Result;

fn read_layout(reader: &mut BitReader, layout: &[usize]) -> Result<Vec<i64>> {
    let mut samples = Vec::with_capacity(layout.iter().sum());
    for &len in layout {
        samples.extend(read_subblock(reader, len)?);
    }
    Ok(samples)
}

/// Decodes an `AudioDataDLC` payload into `desired_sample_rate` samples.
/// Requesting 48 kHz out of a 96 kHz-coded essence only decodes the base band
/// (§3: "only the 48kHz base band data will be used in DLC decoding").
pub fn decode(payload: &[u8], coded_sample_rate: SampleRate, layout_48k: &[usize]) -> Result<Vec<i64>> {
    match coded_sample_rate {
        SampleRate::Hz48000 => {
            let mut reader = BitReader::new(payload);
            read_layout(&mut reader, layout_48k)
        }
        SampleRate::Hz96000 => {
            let mut reader = BitReader::new(payload);
            let bb_len = reader.read_packed_length()? as usize;
            let bb_bytes = reader.read_aligned(bb_len)?;
            let ext_bytes = reader.read_aligned((reader.available() / 8) as usize)?;

            let mut bb_reader = BitReader::new(&bb_bytes);
            let baseband = read_layout(&mut bb_reader, layout_48k)?;

            let layout_96k: Vec<usize> = layout_48k.iter().map(|&n| n * 2).collect();
            let mut ext_reader = BitReader::new(&ext_bytes);
            let extension = read_layout(&mut ext_reader, &layout_96k)?;

            let reconstructed = interpolate(&baseband);
            Ok(reconstructed
                .iter()
                .zip(extension.iter())
                .map(|(r, e)| r + e)
                .collect())
        }
    }
}

/// Decodes only the 48 kHz base band out of a 96 kHz-coded essence, per the
/// decoder's "desired sample rate can be lower than the coded rate" contract.
pub fn decode_baseband_only(payload: &[u8], layout_48k: &[usize]) -> Result<Vec<i64>> {
    let mut reader = BitReader::new(payload);
    let bb_len = reader.read_packed_length()? as usize;
    let bb_bytes = reader.read_aligned(bb_len)?;
    let mut bb_reader = BitReader::new(&bb_bytes);
    read_layout(&mut bb_reader, layout_48k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dlc::encode::DlcEncoder;

    #[test]
    fn baseband_only_decode_matches_full_decode_baseband_segment() {
        let layout = vec![250usize; 8];
        let samples: Vec<i64> = (0..4000).map(|i| (i % 17) as i64 - 8).collect();
        let payload = DlcEncoder::new().encode(&samples, SampleRate::Hz96000, &layout).unwrap();
        let baseband = decode_baseband_only(&payload, &layout).unwrap();
        assert_eq!(baseband.len(), 2000);
    }
}
