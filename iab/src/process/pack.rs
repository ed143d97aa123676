//! `pack_frame` (§C2 "Packer and parser entry points"): recomputes max-rendered
//! and serialises a [`Frame`] to bytes.

use crate::structs::element::UseCase;
use crate::structs::frame::Frame;
use crate::utils::bitstream_io::BitWriter;
use crate::utils::errors::Result;

/// Serialises `frame`, after recomputing its `max_rendered` field against the
/// always-active baseline use-case — the sum of every unconditional bed channel
/// and object plus any sub-element tagged `Always` (§4.2, §4.4).
pub fn pack_frame(frame: &Frame) -> Result<Vec<u8>> {
    let mut frame = frame.clone();
    frame.recompute_max_rendered(UseCase::Always);
    frame.check_invariants()?;

    let mut writer = BitWriter::new();
    frame.write(&mut writer)?;
    writer.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::bed::{BedChannel, BedDefinition};
    use crate::structs::channel::{AudioDescription, ChannelId};
    use crate::structs::element::Element;
    use crate::structs::frame::{FrameRate, SampleRate};
    use crate::structs::gain::GainCode;

    #[test]
    fn pack_recomputes_max_rendered_from_bed_channel_count() {
        let mut frame = Frame::new(FrameRate::Fps24, SampleRate::Hz48000);
        frame.elements.push(Element::Bed(BedDefinition {
            metadata_id: 1,
            audio_description: AudioDescription::Music,
            description_text: None,
            conditional: false,
            use_case: None,
            channels: vec![
                BedChannel {
                    channel_id: ChannelId::Left,
                    audio_data_id: 10,
                    gain: GainCode::UNITY,
                },
                BedChannel {
                    channel_id: ChannelId::Right,
                    audio_data_id: 11,
                    gain: GainCode::UNITY,
                },
            ],
            sub_elements: vec![],
        }));

        let bytes = pack_frame(&frame).unwrap();
        let outcome = crate::process::parse::parse_frame(&bytes, true).unwrap();
        assert_eq!(outcome.frame.max_rendered, 2);
    }
}
