//! Sub-block gain smoothing and the cross-frame gain cache (§4.5 "Sub-block gain
//! smoothing", "Per-frame gain cache").

use std::collections::HashMap;

use crate::render::vbap::GainVector;

/// Maximum ramp span, in samples, before the slope cap forces a hold (§4.5).
pub const MAX_RAMP_SAMPLES: usize = 4800;
/// Maximum |Δgain| per sample during a ramp.
pub const MAX_SLOPE_PER_SAMPLE: f32 = 1.0 / 480.0;

/// Tracks each entity's (bed channel or object, keyed by metadata-ID) last
/// end-of-frame gain vector across frames, for smoothing continuity.
#[derive(Debug, Default)]
pub struct GainCache {
    entries: HashMap<u32, GainVector>,
    touched: std::collections::HashSet<u32>,
}

impl GainCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evicts every entry not touched during the frame just finished (§4.5).
    pub fn start_frame(&mut self) {
        let touched = std::mem::take(&mut self.touched);
        self.entries.retain(|id, _| touched.contains(id));
    }

    pub fn previous(&mut self, metadata_id: u32, channel_count: usize) -> GainVector {
        self.touched.insert(metadata_id);
        self.entries
            .get(&metadata_id)
            .cloned()
            .unwrap_or_else(|| GainVector(vec![0.0; channel_count]))
    }

    pub fn record(&mut self, metadata_id: u32, gain: GainVector) {
        self.entries.insert(metadata_id, gain);
    }
}

/// One smoothed per-sample gain-vector ramp across a sub-block's sample window,
/// plus the gain vector actually reached by the window's last sample.
///
/// When the natural ramp (one sub-block wide) would exceed the `1/480` slope
/// cap, the ramp is extended to `|Δ|/cap` samples instead of being squeezed
/// back into the sub-block (§4.5): the window only ever emits `sub_block_samples`
/// values, but those values may fall short of `target` when the extended ramp
/// runs past this window's end. The second return value is that "as far as we
/// got" gain — callers must cache it (not `target`) so the next window's ramp
/// picks up the slope from where this one left off, rather than resetting.
pub fn ramp_gains(
    previous: &GainVector,
    target: &GainVector,
    sub_block_samples: usize,
    smoothing_enabled: bool,
) -> (Vec<GainVector>, GainVector) {
    if !smoothing_enabled || sub_block_samples == 0 {
        return (vec![target.clone(); sub_block_samples], target.clone());
    }

    let max_delta = previous
        .0
        .iter()
        .zip(&target.0)
        .map(|(p, t)| (t - p).abs())
        .fold(0.0f32, f32::max);

    let ramp_len = if max_delta > 0.0 && max_delta / sub_block_samples as f32 > MAX_SLOPE_PER_SAMPLE {
        ((max_delta / MAX_SLOPE_PER_SAMPLE).ceil() as usize).min(MAX_RAMP_SAMPLES)
    } else {
        sub_block_samples
    }
    .max(1);

    let mut out = Vec::with_capacity(sub_block_samples);
    let mut reached = previous.clone();
    for i in 0..sub_block_samples {
        reached = if i < ramp_len {
            let t = (i + 1) as f32 / ramp_len as f32;
            let channels = previous
                .0
                .iter()
                .zip(&target.0)
                .map(|(p, g)| p + (g - p) * t)
                .collect();
            GainVector(channels)
        } else {
            target.clone()
        };
        out.push(reached.clone());
    }
    (out, reached)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_cache_evicts_untouched_entries_at_frame_start() {
        let mut cache = GainCache::new();
        cache.record(1, GainVector(vec![1.0]));
        cache.record(2, GainVector(vec![0.5]));
        let _ = cache.previous(1, 1);
        cache.start_frame();
        assert_eq!(cache.previous(1, 1).0, vec![1.0]);
        assert_eq!(cache.previous(2, 1).0, vec![0.0]);
    }

    #[test]
    fn ramp_reaches_target_by_the_end_of_the_subblock_when_within_slope_cap() {
        let prev = GainVector(vec![0.0]);
        let target = GainVector(vec![0.1]);
        let (ramp, held) = ramp_gains(&prev, &target, 100, true);
        assert_eq!(ramp.len(), 100);
        assert!((ramp.last().unwrap().0[0] - 0.1).abs() < 1e-6);
        assert!((held.0[0] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn ramp_extends_and_holds_when_delta_exceeds_slope_cap() {
        let prev = GainVector(vec![0.0]);
        let target = GainVector(vec![1.0]);
        // delta 1.0 over 10 samples = 0.1/sample, far above the 1/480 cap, so
        // the ramp extends to ceil(1.0 / (1/480)) = 480 samples.
        let (ramp, held) = ramp_gains(&prev, &target, 10, true);
        assert_eq!(ramp.len(), 10);
        // the slope actually applied never exceeds the cap...
        for i in 0..ramp.len() {
            let previous = if i == 0 { 0.0 } else { ramp[i - 1].0[0] };
            assert!(ramp[i].0[0] - previous <= MAX_SLOPE_PER_SAMPLE + 1e-6);
        }
        // ...so after only 10 of the needed 480 samples, target has not been
        // reached; the window holds at the partial value instead.
        assert!(ramp[9].0[0] < 1.0);
        assert_eq!(held.0[0], ramp[9].0[0]);
    }

    #[test]
    fn held_value_lets_the_next_window_continue_the_same_ramp() {
        let prev = GainVector(vec![0.0]);
        let target = GainVector(vec![1.0]);
        let (first, held) = ramp_gains(&prev, &target, 10, true);
        let (second, _) = ramp_gains(&held, &target, 10, true);
        // the slope stays capped across the window boundary instead of
        // resetting to a fresh (steeper) ramp computed from the full delta.
        let boundary_step = second[0].0[0] - first[9].0[0];
        assert!(boundary_step <= MAX_SLOPE_PER_SAMPLE + 1e-6);
        assert!(boundary_step > 0.0);
    }

    #[test]
    fn smoothing_disabled_applies_target_immediately() {
        let prev = GainVector(vec![0.0]);
        let target = GainVector(vec![1.0]);
        let (ramp, held) = ramp_gains(&prev, &target, 5, false);
        assert!(ramp.iter().all(|g| g.0[0] == 1.0));
        assert_eq!(held.0[0], 1.0);
    }
}
