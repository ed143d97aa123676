//! `iabd pack`: wraps a mono PCM WAV file into a sequence of IAB frames, one
//! `BedDefinition` (or, with `--as-object`, a centered `ObjectDefinition`) per
//! frame, each pointing at its own slice of PCM essence.

use std::fs;

use iab::process::pack::pack_frame;
use iab::structs::bed::{BedChannel, BedDefinition};
use iab::structs::channel::{AudioDescription, ChannelId};
use iab::structs::element::Element;
use iab::structs::essence::AudioDataPcm;
use iab::structs::frame::{Frame, SampleRate};
use iab::structs::gain::GainCode;
use iab::structs::object::ObjectDefinition;
use iab::structs::object_subblock::{ObjectSubBlock, PanInfo};

use super::command::PackArgs;
use crate::wav::WavReader;
use crate::CliError;

pub fn cmd_pack(args: &PackArgs) -> Result<(), CliError> {
    let wav = WavReader::open(&args.input).map_err(|e| CliError::Usage(e.to_string()))?;
    if wav.channels != 1 {
        return Err(CliError::Usage(format!(
            "{} has {} channels; iabd pack only wraps mono PCM",
            args.input.display(),
            wav.channels
        )));
    }

    let sample_rate = match wav.sample_rate {
        48_000 => SampleRate::Hz48000,
        96_000 => SampleRate::Hz96000,
        other => {
            return Err(CliError::Usage(format!(
                "unsupported WAV sample rate {other}Hz; IAB requires 48000 or 96000"
            )))
        }
    };
    let frame_rate = args.frame_rate.to_frame_rate();
    let samples_per_frame = frame_rate.samples_per_frame(sample_rate);

    let channel_id = if args.as_object {
        None
    } else {
        Some(channel_from_name(&args.channel)?)
    };

    let mut out_bytes = Vec::new();
    let mut offset = 0usize;
    let mut frame_index = 0usize;

    while offset < wav.samples.len() {
        let end = (offset + samples_per_frame).min(wav.samples.len());
        let mut chunk = wav.samples[offset..end].to_vec();
        chunk.resize(samples_per_frame, 0);

        let mut frame = Frame::new(frame_rate, sample_rate);
        frame.elements.push(Element::PcmEssence(AudioDataPcm {
            audio_data_id: 1,
            bits_per_sample: wav.bits_per_sample as u8,
            samples: chunk,
        }));

        match channel_id {
            Some(channel_id) => {
                frame.elements.push(Element::Bed(BedDefinition {
                    metadata_id: 1,
                    audio_description: AudioDescription::NotIndicated,
                    description_text: None,
                    conditional: false,
                    use_case: None,
                    channels: vec![BedChannel {
                        channel_id,
                        audio_data_id: 1,
                        gain: GainCode::UNITY,
                    }],
                    sub_elements: vec![],
                }));
            }
            None => {
                frame.elements.push(Element::Object(ObjectDefinition {
                    metadata_id: 1,
                    audio_data_id: 1,
                    audio_description: AudioDescription::NotIndicated,
                    description_text: None,
                    conditional: false,
                    use_case: None,
                    sub_blocks: vec![
                        ObjectSubBlock {
                            pan_info_exists: true,
                            pan: Some(PanInfo::centered()),
                        };
                        frame_rate.sub_block_count()
                    ],
                    zone19: None,
                    sub_elements: vec![],
                }));
            }
        }

        out_bytes.extend(pack_frame(&frame).map_err(CliError::Bitstream)?);
        offset = end;
        frame_index += 1;
    }

    fs::write(&args.output, &out_bytes).map_err(|e| CliError::Usage(e.to_string()))?;
    log::info!(
        "packed {frame_index} frame(s) ({} bytes) into {}",
        out_bytes.len(),
        args.output.display()
    );
    Ok(())
}

fn channel_from_name(name: &str) -> Result<ChannelId, CliError> {
    ChannelId::ALL
        .into_iter()
        .find(|c| c.canonical_uri().eq_ignore_ascii_case(name))
        .ok_or_else(|| CliError::Usage(format!("unknown channel label {name:?}")))
}
