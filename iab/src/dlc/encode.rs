//! `SimpleEncoder` (§3 C3): encodes baseband PCM into an `AudioDataDLC` payload.
//! Mirrors the codec's own simple encoder — predictor-free, PCM-residual-only —
//! but additionally does the 96 kHz band split the simple encoder also performs
//! (low-pass, decimate to a 48 kHz base band, then differentially code the
//! extension band), since the sub-block-level wire layout here is an internal
//! implementation detail this codec owns end to end.

use crate::dlc::filters::{
    self, INTERPOLATOR_FILTER_COEFFS, LOW_PASS_FILTER_COEFFS, LPF_COEFF_INT_BIT_LENGTH,
    TOTAL_96K_FILTER_GROUP_DELAY,
};
use crate::dlc::subblock::write_subblock;
use crate::structs::frame::SampleRate;
use crate::utils::bitstream_io::BitWriter;
use crate::utils::errors::{IabError, Result};

const INTERP_SHIFT: u32 = 15;

fn write_layout(writer: &mut BitWriter, samples: &[i64], layout: &[usize]) -> Result<()> {
    let mut offset = 0;
    for &len in layout {
        write_subblock(writer, &samples[offset..offset + len])?;
        offset += len;
    }
    Ok(())
}

/// Zero-stuffed half-band interpolation back to the original sample rate. The
/// codec's own decoder carries no cross-frame delay line for this stage (only
/// the encoder's LPF/decimator and raw-sample delay do, §4.3 step 4), so this
/// stays a free, stateless function shared by both encode and decode.
pub(crate) fn interpolate(baseband: &[i64]) -> Vec<i64> {
    let mut stuffed = Vec::with_capacity(baseband.len() * 2);
    for &s in baseband {
        stuffed.push(s);
        stuffed.push(0);
    }
    let history = vec![0i64; INTERPOLATOR_FILTER_COEFFS.len() - 1];
    filters::apply_fir(&INTERPOLATOR_FILTER_COEFFS, INTERP_SHIFT, &history, &stuffed)
}

/// Encodes 96 kHz frames into `AudioDataDLC` payloads, carrying the persistent
/// state §4.3 step 4 and §7(a) require across frames: the anti-aliasing LPF's
/// delay line, and the 80-sample (64 LPF + 16 interpolator, §3 Table 18/33)
/// delay applied to the original samples before they're differenced against
/// the reconstructed base band. Without this state each frame would restart
/// the filter from silence, breaking cross-frame continuity and invariant #3.
///
/// 48 kHz frames need none of this (no band split happens), so `encode` stays
/// usable on a fresh `DlcEncoder` for those regardless of prior 96 kHz state.
pub struct DlcEncoder {
    lpf_history: Vec<i64>,
    delay_buffer: Vec<i64>,
}

impl Default for DlcEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DlcEncoder {
    pub fn new() -> Self {
        Self {
            lpf_history: vec![0i64; LOW_PASS_FILTER_COEFFS.len() - 1],
            delay_buffer: vec![0i64; TOTAL_96K_FILTER_GROUP_DELAY],
        }
    }

    /// Clears the persisted filter and delay-line state, as if encoding were
    /// restarting from silence (§9: encoders must expose a way to do this
    /// between unrelated streams without allocating a new encoder).
    pub fn reset_encoder(&mut self) {
        self.lpf_history.iter_mut().for_each(|s| *s = 0);
        self.delay_buffer.iter_mut().for_each(|s| *s = 0);
    }

    fn lowpass_decimate(&mut self, samples: &[i64]) -> Vec<i64> {
        let filtered = filters::apply_fir(&LOW_PASS_FILTER_COEFFS, LPF_COEFF_INT_BIT_LENGTH, &self.lpf_history, samples);

        let tail_len = self.lpf_history.len();
        let mut history = std::mem::take(&mut self.lpf_history);
        history.extend_from_slice(samples);
        let start = history.len() - tail_len;
        self.lpf_history = history[start..].to_vec();

        filtered.into_iter().step_by(2).collect()
    }

    /// Shifts `samples` by the LPF+interpolator's combined 80-sample group
    /// delay (§3 Table 18/33), using the delay line's carried-over tail from
    /// the previous call to fill in the first 80 output samples.
    fn delay96k(&mut self, samples: &[i64]) -> Vec<i64> {
        let delay_len = self.delay_buffer.len();
        let mut buffered = std::mem::take(&mut self.delay_buffer);
        buffered.extend_from_slice(samples);
        let delayed = buffered[..samples.len()].to_vec();
        let start = buffered.len() - delay_len;
        self.delay_buffer = buffered[start..].to_vec();
        delayed
    }

    /// Encodes one channel's frame of samples into an `AudioDataDLC` payload.
    /// `layout_48k` gives the per-sub-block sample counts at 48 kHz (§4.2); for
    /// 96 kHz frames the actual per-sub-block sample count is double that.
    pub fn encode(&mut self, samples: &[i64], sample_rate: SampleRate, layout_48k: &[usize]) -> Result<Vec<u8>> {
        let expected: usize = layout_48k.iter().sum::<usize>()
            * match sample_rate {
                SampleRate::Hz48000 => 1,
                SampleRate::Hz96000 => 2,
            };
        if samples.len() != expected {
            return Err(IabError::BadParams(format!(
                "expected {expected} samples for this frame layout, got {}",
                samples.len()
            )));
        }

        match sample_rate {
            SampleRate::Hz48000 => {
                let mut writer = BitWriter::new();
                write_layout(&mut writer, samples, layout_48k)?;
                writer.into_bytes()
            }
            SampleRate::Hz96000 => {
                let baseband = self.lowpass_decimate(samples);
                let reconstructed = interpolate(&baseband);
                let delayed = self.delay96k(samples);
                let extension: Vec<i64> = delayed
                    .iter()
                    .zip(reconstructed.iter())
                    .map(|(o, r)| o - r)
                    .collect();

                let mut bb_writer = BitWriter::new();
                write_layout(&mut bb_writer, &baseband, layout_48k)?;
                let bb_bytes = bb_writer.into_bytes()?;

                let layout_96k: Vec<usize> = layout_48k.iter().map(|&n| n * 2).collect();
                let mut ext_writer = BitWriter::new();
                write_layout(&mut ext_writer, &extension, &layout_96k)?;
                let ext_bytes = ext_writer.into_bytes()?;

                let mut out = BitWriter::new();
                out.write_packed_length(bb_bytes.len() as u32)?;
                out.write_aligned(&bb_bytes)?;
                out.write_aligned(&ext_bytes)?;
                out.into_bytes()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dlc::decode::decode;

    #[test]
    fn encode_decode_round_trips_at_48k() {
        let layout = vec![250usize; 8];
        let samples: Vec<i64> = (0..2000).map(|i| (i * 127 % 4001) as i64 - 2000).collect();
        let payload = DlcEncoder::new().encode(&samples, SampleRate::Hz48000, &layout).unwrap();
        let back = decode(&payload, SampleRate::Hz48000, &layout).unwrap();
        assert_eq!(back, samples);
    }

    #[test]
    fn encode_decode_round_trips_at_96k() {
        let layout = vec![250usize; 8];
        let samples: Vec<i64> = (0..4000)
            .map(|i| ((i as f64 * 0.01).sin() * 5000.0) as i64)
            .collect();
        let payload = DlcEncoder::new().encode(&samples, SampleRate::Hz96000, &layout).unwrap();
        let back = decode(&payload, SampleRate::Hz96000, &layout).unwrap();
        assert_eq!(back, samples);
    }

    #[test]
    fn wrong_sample_count_is_rejected() {
        let layout = vec![250usize; 8];
        let samples = vec![0i64; 100];
        assert!(DlcEncoder::new().encode(&samples, SampleRate::Hz48000, &layout).is_err());
    }

    /// A fresh encoder's first 96 kHz frame starts from a zeroed delay line and
    /// LPF history (equivalent to silence preceding the stream), so the first
    /// 80 samples of the decode are the delayed-in zero tail, not the input —
    /// only samples from index 80 onward reflect real input content.
    #[test]
    fn first_96k_frame_warms_up_the_80_sample_delay_line() {
        let layout = vec![250usize; 8];
        let samples: Vec<i64> = (0..4000).map(|i| (i % 23) as i64 - 11).collect();
        let payload = DlcEncoder::new().encode(&samples, SampleRate::Hz96000, &layout).unwrap();
        let back = decode(&payload, SampleRate::Hz96000, &layout).unwrap();
        assert_eq!(&back[80..], &samples[..samples.len() - 80]);
    }

    /// Across two consecutive frames from the same encoder, the delay line
    /// carries the tail of frame one into frame two, so decode of the second
    /// frame picks up exactly where the first left off (no re-zeroing at the
    /// frame boundary).
    #[test]
    fn delay_line_and_lpf_history_persist_across_frames() {
        let layout = vec![250usize; 8];
        let frame_one: Vec<i64> = (0..4000).map(|i| (i % 31) as i64 - 15).collect();
        let frame_two: Vec<i64> = (0..4000).map(|i| ((i + 4000) % 31) as i64 - 15).collect();

        let mut encoder = DlcEncoder::new();
        let payload_one = encoder.encode(&frame_one, SampleRate::Hz96000, &layout).unwrap();
        let payload_two = encoder.encode(&frame_two, SampleRate::Hz96000, &layout).unwrap();

        let back_one = decode(&payload_one, SampleRate::Hz96000, &layout).unwrap();
        let back_two = decode(&payload_two, SampleRate::Hz96000, &layout).unwrap();

        assert_eq!(&back_one[80..], &frame_one[..frame_one.len() - 80]);
        let mut continuous = frame_one.clone();
        continuous.extend_from_slice(&frame_two);
        let mut decoded = back_one.clone();
        decoded.extend_from_slice(&back_two);
        assert_eq!(&decoded[80..], &continuous[..continuous.len() - 80]);
    }

    #[test]
    fn reset_encoder_clears_state_like_a_fresh_encoder() {
        let layout = vec![250usize; 8];
        let frame: Vec<i64> = (0..4000).map(|i| (i % 19) as i64 - 9).collect();

        let mut warmed = DlcEncoder::new();
        let _ = warmed.encode(&frame, SampleRate::Hz96000, &layout).unwrap();
        warmed.reset_encoder();
        let after_reset = warmed.encode(&frame, SampleRate::Hz96000, &layout).unwrap();

        let fresh = DlcEncoder::new().encode(&frame, SampleRate::Hz96000, &layout).unwrap();
        assert_eq!(after_reset, fresh);
    }
}
