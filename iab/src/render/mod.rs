//! The renderer (§4.5, C5): decodes every essence element into float buffers,
//! then walks the frame graph routing bed channels, bed remaps and objects into
//! a pre-allocated set of physical output-channel buffers.
//!
//! [`config`] holds the external loudspeaker/downmix configuration; [`vbap`] is
//! the panning core; [`smoothing`] and [`decorrelate`] are the two stateful,
//! cross-sub-block/cross-frame passes; [`pool`] is the optional multi-threaded
//! worker pool described in §5 (not wired into [`Renderer::render_frame`] by
//! default — single-threaded rendering is the baseline contract).

pub mod config;
pub mod decorrelate;
pub mod pool;
pub mod smoothing;
pub mod vbap;

use std::collections::HashMap;

use crate::render::config::RendererConfig;
use crate::render::decorrelate::Decorrelator;
use crate::render::smoothing::{ramp_gains, GainCache};
use crate::render::vbap::{GainVector, VbapEngine};
use crate::structs::bed::BedDefinition;
use crate::structs::bed_remap::BedRemap;
use crate::structs::channel::ChannelId;
use crate::structs::element::Element;
use crate::structs::essence::{AudioDataDlc, AudioDataPcm};
use crate::structs::frame::{AudioId, Frame, SampleRate};
use crate::structs::object::ObjectDefinition;
use crate::structs::object_subblock::DecorPrefix;
use crate::structs::position::UnitCubePosition;
use crate::utils::errors::{IabError, IabWarning, Result};

/// Full scale used to normalise DLC residual samples to `[-1, 1)`: DLC regions
/// carry at most a 24-bit signed residual (§4.3 "bit depth 0..24").
const DLC_FULL_SCALE_BITS: u32 = 24;

pub struct RenderOutput {
    pub channels: Vec<Vec<f32>>,
    pub warnings: Vec<IabWarning>,
}

/// Single-threaded renderer core. Owns the cross-frame state §6 calls out as
/// "persisted": the gain cache and the decorrelator's all-pass state.
pub struct Renderer {
    config: RendererConfig,
    gain_cache: GainCache,
    decorrelator: Decorrelator,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        let decorrelator = Decorrelator::new(config.output_count());
        Self {
            config,
            gain_cache: GainCache::new(),
            decorrelator,
        }
    }

    pub fn render_frame(&mut self, frame: &Frame) -> Result<RenderOutput> {
        let pcm_only = !frame.elements.iter().any(|e| matches!(e, Element::DlcEssence(_)));
        if !frame.frame_rate.supported_for_render(frame.sample_rate, pcm_only) {
            return Err(IabError::UnsupportedRate {
                sample_rate: frame.sample_rate.hz(),
                frame_rate: frame.frame_rate,
            });
        }

        self.gain_cache.start_frame();
        let channel_count = self.config.output_count();
        let total_samples = frame.frame_rate.samples_per_frame(frame.sample_rate);
        let mut output = vec![vec![0.0f32; total_samples]; channel_count];
        let mut decor_buffer = vec![vec![0.0f32; total_samples]; channel_count];
        let mut warnings = Vec::new();

        let essence = decode_essence_buffers(frame)?;
        let remaps: HashMap<u32, &BedRemap> = frame
            .elements
            .iter()
            .filter_map(|e| match e {
                Element::BedRemap(r) => Some((r.metadata_id, r)),
                _ => None,
            })
            .collect();

        let sample_layout = sub_block_layout(frame);
        let mut vbap = VbapEngine::new(&self.config);
        let mut decor_requested = false;
        let target_use_case = self.config.target_use_case();

        for element in &frame.elements {
            match element {
                Element::Bed(bed) => {
                    if let Some(active) = bed.active_variant(target_use_case) {
                        render_bed(
                            &self.config,
                            active,
                            &remaps,
                            &essence,
                            &mut vbap,
                            &mut output,
                            &mut warnings,
                        )?;
                    }
                }
                Element::Object(object) => {
                    if let Some(active) = object.active_variant(target_use_case) {
                        let requested = render_object(
                            &self.config,
                            &mut self.gain_cache,
                            active,
                            &essence,
                            &sample_layout,
                            &mut vbap,
                            &mut output,
                            &mut decor_buffer,
                        )?;
                        decor_requested |= requested;
                    }
                }
                _ => {}
            }
        }

        self.decorrelator.begin_frame(decor_requested);
        if self.config.decorr_enabled {
            self.decorrelator.process_into(&decor_buffer, &mut output);
        }

        Ok(RenderOutput {
            channels: output,
            warnings,
        })
    }
}

fn render_bed(
    config: &RendererConfig,
    bed: &BedDefinition,
    remaps: &HashMap<u32, &BedRemap>,
    essence: &HashMap<AudioId, Vec<f32>>,
    vbap: &mut VbapEngine,
    output: &mut [Vec<f32>],
    warnings: &mut Vec<IabWarning>,
) -> Result<()> {
    if let Some(remap) = remaps
        .get(&bed.metadata_id)
        .and_then(|r| r.active_variant(config.target_use_case()))
    {
        return render_bed_remap(config, bed, remap, essence, vbap, output, warnings);
    }

    for channel in &bed.channels {
        let samples = essence_for(essence, channel.audio_data_id);
        let gain = channel.gain.to_linear();
        let uri = channel.channel_id.canonical_uri();

        if let Some(physical) = config.physical_by_uri(uri) {
            accumulate(&mut output[physical.output_index], samples, gain);
        } else if let Some(virt) = config.virtual_by_uri(uri).cloned() {
            for target in &virt.downmix {
                accumulate(&mut output[target.target_physical_index], samples, gain * target.coefficient);
            }
        } else if !channel.channel_id.is_lfe() {
            let gains = vbap.solve_static(channel.channel_id.canonical_position())?;
            for (out, &g) in output.iter_mut().zip(&gains.0) {
                accumulate(out, samples, gain * g);
            }
        } else {
            warnings.push(IabWarning::NoLfe);
        }
    }
    Ok(())
}

fn render_bed_remap(
    config: &RendererConfig,
    bed: &BedDefinition,
    remap: &BedRemap,
    essence: &HashMap<AudioId, Vec<f32>>,
    vbap: &mut VbapEngine,
    output: &mut [Vec<f32>],
    warnings: &mut Vec<IabWarning>,
) -> Result<()> {
    let source_count = remap.source_channels.len();
    let destination_count = remap.destination_channels.len();

    let source_buffers: Vec<(&[f32], f32)> = remap
        .source_channels
        .iter()
        .map(|channel_id| {
            let channel = bed.channels.iter().find(|c| c.channel_id == *channel_id);
            let samples = channel
                .map(|c| essence_for(essence, c.audio_data_id))
                .unwrap_or(&[]);
            let gain = channel.map(|c| c.gain.to_linear()).unwrap_or(0.0);
            (samples, gain)
        })
        .collect();

    let matrix = remap
        .sub_block_gains
        .first()
        .map(|row| row.iter().map(|g| g.to_linear()).collect::<Vec<_>>())
        .unwrap_or_else(|| vec![0.0; source_count * destination_count]);
    if matrix.len() != source_count * destination_count {
        return Err(IabError::DataInvalid(format!(
            "bed remap {} matrix size {} does not match {source_count}x{destination_count}",
            remap.metadata_id,
            matrix.len()
        )));
    }

    for (dest_idx, dest_channel) in remap.destination_channels.iter().enumerate() {
        let uri = dest_channel.canonical_uri();
        let mut mixed = vec![0.0f32; output.first().map(Vec::len).unwrap_or(0)];
        for (src_idx, (samples, source_gain)) in source_buffers.iter().enumerate() {
            let coefficient = matrix[src_idx * destination_count + dest_idx];
            if coefficient == 0.0 {
                continue;
            }
            accumulate(&mut mixed, samples, source_gain * coefficient);
        }

        if let Some(physical) = config.physical_by_uri(uri) {
            for (o, m) in output[physical.output_index].iter_mut().zip(&mixed) {
                *o += m;
            }
        } else if let Some(virt) = config.virtual_by_uri(uri).cloned() {
            for target in &virt.downmix {
                for (o, m) in output[target.target_physical_index].iter_mut().zip(&mixed) {
                    *o += m * target.coefficient;
                }
            }
        } else if !dest_channel.is_lfe() {
            let gains = vbap.solve_static(dest_channel.canonical_position())?;
            for (out, &g) in output.iter_mut().zip(&gains.0) {
                for (o, m) in out.iter_mut().zip(&mixed) {
                    *o += m * g;
                }
            }
        } else {
            warnings.push(IabWarning::NoLfe);
        }
    }
    Ok(())
}

/// Renders one object's sub-block trajectory (§4.5 steps 3-5 plus smoothing).
/// Returns whether this object requested decorrelation (`decor_prefix ==
/// MaxDecor` in sub-block 0).
fn render_object(
    config: &RendererConfig,
    gain_cache: &mut GainCache,
    object: &ObjectDefinition,
    essence: &HashMap<AudioId, Vec<f32>>,
    sample_layout: &[usize],
    vbap: &mut VbapEngine,
    output: &mut [Vec<f32>],
    decor_buffer: &mut [Vec<f32>],
) -> Result<bool> {
    let samples = essence_for(essence, object.audio_data_id);
    let channel_count = output.len();
    let decor_requested = config.decorr_enabled
        && object
            .sub_blocks
            .first()
            .and_then(|b| b.pan.as_ref())
            .map(|p| p.decor.prefix == DecorPrefix::Max)
            .unwrap_or(false);

    let mut offset = 0usize;
    let mut last_gain: Option<GainVector> = None;
    let mut last_snap: Option<usize> = None;

    for (i, &window) in sample_layout.iter().enumerate() {
        let block = object.sub_blocks.get(i);
        let (gains, snap) = match block.and_then(|b| b.pan.as_ref()) {
            Some(pan) => {
                let position = pan.position;
                if let Some(speaker) = vbap.try_snap(position, pan) {
                    (None, Some(speaker))
                } else {
                    let solved = vbap.solve(position, pan)?;
                    (Some(solved), None)
                }
            }
            None => (last_gain.clone(), last_snap),
        };

        let destination: &mut [Vec<f32>] = if decor_requested { decor_buffer } else { output };

        if let Some(speaker_index) = snap {
            let clip = &samples[offset.min(samples.len())..(offset + window).min(samples.len())];
            accumulate(&mut destination[speaker_index], clip, 1.0);
        } else if let Some(target) = &gains {
            let previous = gain_cache.previous(object.metadata_id, channel_count);
            let (ramp, held) = ramp_gains(&previous, target, window, config.smoothing_enabled);
            let clip = &samples[offset.min(samples.len())..(offset + window).min(samples.len())];
            for (sample_index, sample) in clip.iter().enumerate() {
                let gain_vector = &ramp[sample_index.min(ramp.len().saturating_sub(1))];
                for (channel, &g) in gain_vector.0.iter().enumerate() {
                    destination[channel][offset + sample_index] += sample * g;
                }
            }
            gain_cache.record(object.metadata_id, held);
        }

        last_gain = gains;
        last_snap = snap;
        offset += window;
    }

    Ok(decor_requested)
}

fn essence_for(essence: &HashMap<AudioId, Vec<f32>>, audio_data_id: AudioId) -> &[f32] {
    if audio_data_id == 0 {
        return &[];
    }
    essence.get(&audio_data_id).map(Vec::as_slice).unwrap_or(&[])
}

fn accumulate(output: &mut [f32], samples: &[f32], gain: f32) {
    if gain == 0.0 {
        return;
    }
    for (o, s) in output.iter_mut().zip(samples) {
        *o += s * gain;
    }
}

/// Per-sub-block sample-window layout at the frame's actual sample rate.
fn sub_block_layout(frame: &Frame) -> Vec<usize> {
    let layout_48k = frame.frame_rate.sub_block_sample_layout_48k();
    match frame.sample_rate {
        SampleRate::Hz48000 => layout_48k,
        SampleRate::Hz96000 => layout_48k.into_iter().map(|n| n * 2).collect(),
    }
}

/// Decodes every essence element in `frame` into a per-audio-ID float buffer,
/// normalised to `[-1, 1)` (§4.5 step 2).
fn decode_essence_buffers(frame: &Frame) -> Result<HashMap<AudioId, Vec<f32>>> {
    let layout_48k = frame.frame_rate.sub_block_sample_layout_48k();
    let mut buffers = HashMap::new();

    for element in &frame.elements {
        match element {
            Element::DlcEssence(AudioDataDlc { audio_data_id, payload }) => {
                let decoded = crate::dlc::decode::decode(payload, frame.sample_rate, &layout_48k)?;
                let scale = (1i64 << (DLC_FULL_SCALE_BITS - 1)) as f32;
                let floats = decoded.iter().map(|&s| s as f32 / scale).collect();
                buffers.insert(*audio_data_id, floats);
            }
            Element::PcmEssence(AudioDataPcm {
                audio_data_id,
                bits_per_sample,
                samples,
            }) => {
                let scale = (1i64 << (bits_per_sample.saturating_sub(1))) as f32;
                let floats = samples.iter().map(|&s| s as f32 / scale).collect();
                buffers.insert(*audio_data_id, floats);
            }
            _ => {}
        }
    }
    Ok(buffers)
}

impl<'a> VbapEngine<'a> {
    /// Solves a single, static gain vector for a fixed direction — used for bed
    /// channels and remap destinations rendered "as an object with unity extent"
    /// (§4.5), which carry no per-sub-block pan trajectory.
    pub fn solve_static(&mut self, position: UnitCubePosition) -> Result<GainVector> {
        use crate::structs::object_subblock::PanInfo;
        self.solve(position, &PanInfo::centered())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::channel::AudioDescription;
    use crate::structs::element::UseCase;
    use crate::structs::essence::AudioDataPcm;
    use crate::structs::frame::{FrameRate, SampleRate};
    use crate::structs::gain::GainCode;

    fn test_config() -> RendererConfig {
        let yaml = r#"
physical_speakers:
  - uri: "L"
    vbap_xyz: [-1.0, 1.0, 0.0]
    output_index: 0
  - uri: "R"
    vbap_xyz: [1.0, 1.0, 0.0]
    output_index: 1
vbap_triangulation: []
target_soundfield: custom
"#;
        RendererConfig::from_yaml(yaml).unwrap()
    }

    #[test]
    fn bed_channel_mapped_to_physical_speaker_routes_directly() {
        let mut renderer = Renderer::new(test_config());
        let mut frame = Frame::new(FrameRate::Fps24, SampleRate::Hz48000);
        frame.elements.push(Element::PcmEssence(AudioDataPcm {
            audio_data_id: 1,
            bits_per_sample: 16,
            samples: vec![16384; frame.frame_rate.samples_per_frame_48k()],
        }));
        frame.elements.push(Element::Bed(BedDefinition {
            metadata_id: 1,
            audio_description: AudioDescription::Music,
            description_text: None,
            conditional: false,
            use_case: None,
            channels: vec![crate::structs::bed::BedChannel {
                channel_id: ChannelId::Left,
                audio_data_id: 1,
                gain: GainCode::UNITY,
            }],
            sub_elements: vec![],
        }));

        let output = renderer.render_frame(&frame).unwrap();
        assert!((output.channels[0][0] - 0.5).abs() < 1e-3);
        assert_eq!(output.channels[1][0], 0.0);
    }

    #[test]
    fn unsupported_rate_combination_is_rejected() {
        let mut renderer = Renderer::new(test_config());
        let frame = Frame::new(FrameRate::Fps100, SampleRate::Hz96000);
        assert!(matches!(renderer.render_frame(&frame), Err(IabError::UnsupportedRate { .. })));
    }

    fn conditional_variant_bed(metadata_id: u32, use_case: UseCase, channel_id: ChannelId, audio_data_id: u32) -> BedDefinition {
        BedDefinition {
            metadata_id,
            audio_description: AudioDescription::Music,
            description_text: None,
            conditional: true,
            use_case: Some(use_case),
            channels: vec![crate::structs::bed::BedChannel {
                channel_id,
                audio_data_id,
                gain: GainCode::UNITY,
            }],
            sub_elements: vec![],
        }
    }

    fn target_soundfield_config(target: &str) -> RendererConfig {
        let yaml = format!(
            r#"
physical_speakers:
  - uri: "L"
    vbap_xyz: [-1.0, 1.0, 0.0]
    output_index: 0
  - uri: "R"
    vbap_xyz: [1.0, 1.0, 0.0]
    output_index: 1
vbap_triangulation: []
target_soundfield: {target}
"#
        );
        RendererConfig::from_yaml(&yaml).unwrap()
    }

    #[test]
    fn conditional_bed_variant_follows_target_soundfield() {
        let mut frame = Frame::new(FrameRate::Fps24, SampleRate::Hz48000);
        let frame_len = frame.frame_rate.samples_per_frame_48k();
        frame.elements.push(Element::PcmEssence(AudioDataPcm {
            audio_data_id: 1,
            bits_per_sample: 16,
            samples: vec![16384; frame_len],
        }));
        frame.elements.push(Element::PcmEssence(AudioDataPcm {
            audio_data_id: 2,
            bits_per_sample: 16,
            samples: vec![16384; frame_len],
        }));
        frame.elements.push(Element::Bed(BedDefinition {
            metadata_id: 1,
            audio_description: AudioDescription::Music,
            description_text: None,
            conditional: false,
            use_case: None,
            channels: vec![],
            sub_elements: vec![
                conditional_variant_bed(2, UseCase::Bed5_1, ChannelId::Left, 1),
                conditional_variant_bed(3, UseCase::Bed7_1Ds, ChannelId::Right, 2),
            ],
        }));

        let mut surround5_1 = Renderer::new(target_soundfield_config("surround5_1"));
        let output = surround5_1.render_frame(&frame).unwrap();
        assert!((output.channels[0][0] - 0.5).abs() < 1e-3);
        assert_eq!(output.channels[1][0], 0.0);

        let mut surround7_1 = Renderer::new(target_soundfield_config("surround7_1"));
        let output = surround7_1.render_frame(&frame).unwrap();
        assert_eq!(output.channels[0][0], 0.0);
        assert!((output.channels[1][0] - 0.5).abs() < 1e-3);
    }

    fn snap_matched_object(metadata_id: u32, audio_data_id: u32) -> ObjectDefinition {
        use crate::structs::object_subblock::{Decor, DecorPrefix, ObjectSubBlock, PanInfo, Snap};
        use crate::structs::position::SphericalPosition;

        let position = SphericalPosition::from_cartesian_direction([-1.0, 1.0, 0.0]).to_unit_cube();
        let pan = PanInfo {
            position,
            snap: Snap {
                present: true,
                tolerance: 4095,
            },
            decor: Decor {
                prefix: DecorPrefix::Max,
                value: None,
            },
            ..PanInfo::centered()
        };

        ObjectDefinition {
            metadata_id,
            audio_data_id,
            audio_description: AudioDescription::Music,
            description_text: None,
            conditional: false,
            use_case: None,
            sub_blocks: vec![ObjectSubBlock {
                pan_info_exists: true,
                pan: Some(pan),
            }],
            zone19: None,
            sub_elements: vec![],
        }
    }

    #[test]
    fn decorr_enabled_false_routes_object_audio_directly_and_keeps_decorrelator_inactive() {
        let mut yaml_config = test_config();
        yaml_config.decorr_enabled = false;
        let mut renderer = Renderer::new(yaml_config);

        let mut frame = Frame::new(FrameRate::Fps24, SampleRate::Hz48000);
        let frame_len = frame.frame_rate.samples_per_frame_48k();
        frame.elements.push(Element::PcmEssence(AudioDataPcm {
            audio_data_id: 1,
            bits_per_sample: 16,
            samples: vec![16384; frame_len],
        }));
        frame.elements.push(Element::Object(snap_matched_object(1, 1)));

        let output = renderer.render_frame(&frame).unwrap();
        assert!((output.channels[0][0] - 0.5).abs() < 1e-3);
        assert!(!renderer.decorrelator.is_active());
    }
}
