//! `BedDefinition` (§3): a fixed channel bed, optionally nesting conditional
//! variants selected by use-case at render time (§4.2 "Conditional activation rules").

use crate::structs::channel::{AudioDescription, ChannelId};
use crate::structs::element::UseCase;
use crate::structs::gain::GainCode;
use crate::utils::bitstream_io::{BitReader, BitWriter};
use crate::utils::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BedChannel {
    pub channel_id: ChannelId,
    pub audio_data_id: u32,
    pub gain: GainCode,
}

impl BedChannel {
    pub fn read(reader: &mut BitReader) -> Result<Self> {
        let channel_id = ChannelId::from_wire_code(reader.read(8)? as u8)?;
        let audio_data_id = reader.read_plex(8)? as u32;
        let gain = GainCode::from_code(reader.read(10)? as u16)?;
        Ok(Self {
            channel_id,
            audio_data_id,
            gain,
        })
    }

    pub fn write(self, writer: &mut BitWriter) -> Result<()> {
        writer.write(self.channel_id.wire_code() as u64, 8)?;
        writer.write_plex(self.audio_data_id as u64, 8)?;
        writer.write(self.gain.code() as u64, 10)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BedDefinition {
    pub metadata_id: u32,
    pub audio_description: AudioDescription,
    pub description_text: Option<String>,
    pub conditional: bool,
    pub use_case: Option<UseCase>,
    pub channels: Vec<BedChannel>,
    /// Nested, conditionally-tagged beds (§3: "Sub-elements may include nested
    /// BedDefinitions... used to carry alternate channel layouts").
    pub sub_elements: Vec<BedDefinition>,
}

impl BedDefinition {
    /// Walks this bed's conditional tree and returns the single bed definition
    /// active for `target` (§4.2 invariant: at most one active child).
    pub fn active_variant(&self, target: UseCase) -> Option<&BedDefinition> {
        if self.conditional {
            return match self.use_case {
                Some(use_case) if use_case.matches_target(target) => Some(self),
                _ => None,
            };
        }
        for sub in &self.sub_elements {
            if let Some(active) = sub.active_variant(target) {
                return Some(active);
            }
        }
        Some(self)
    }

    pub fn contains_lfe(&self) -> bool {
        self.channels.iter().any(|c| c.channel_id.is_lfe())
    }

    pub fn read(reader: &mut BitReader) -> Result<Self> {
        let metadata_id = reader.read_plex(8)? as u32;
        let text_present = reader.read_bit()?;
        let (audio_description, description_text) =
            AudioDescription::read(reader, text_present)?;
        let conditional = reader.read_bit()?;
        let use_case = if conditional {
            Some(UseCase::read(reader)?)
        } else {
            None
        };
        let channels = reader.read_vector(BedChannel::read)?;
        let sub_elements = reader.read_vector(BedDefinition::read)?;
        Ok(Self {
            metadata_id,
            audio_description,
            description_text,
            conditional,
            use_case,
            channels,
            sub_elements,
        })
    }

    pub fn write(&self, writer: &mut BitWriter) -> Result<()> {
        writer.write_plex(self.metadata_id as u64, 8)?;
        writer.write_bit(self.description_text.is_some())?;
        self.audio_description
            .write(writer, self.description_text.as_deref())?;
        writer.write_bit(self.conditional)?;
        if let Some(use_case) = self.use_case {
            use_case.write(writer)?;
        }
        writer.write_vector(&self.channels, |w, c| c.write(w))?;
        writer.write_vector(&self.sub_elements, |w, b| b.write(w))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bed() -> BedDefinition {
        BedDefinition {
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
                    channel_id: ChannelId::Lfe,
                    audio_data_id: 11,
                    gain: GainCode::UNITY,
                },
            ],
            sub_elements: vec![],
        }
    }

    #[test]
    fn bed_round_trips() {
        let bed = sample_bed();
        let mut w = BitWriter::new();
        bed.write(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        let back = BedDefinition::read(&mut r).unwrap();
        assert_eq!(back.metadata_id, 1);
        assert_eq!(back.channels.len(), 2);
        assert!(back.contains_lfe());
    }

    #[test]
    fn unconditional_bed_is_its_own_active_variant() {
        let bed = sample_bed();
        assert!(bed.active_variant(UseCase::Always).is_some());
    }

    #[test]
    fn conditional_child_only_activates_for_matching_use_case() {
        let mut bed = sample_bed();
        bed.sub_elements.push(BedDefinition {
            metadata_id: 2,
            audio_description: AudioDescription::Music,
            description_text: None,
            conditional: true,
            use_case: Some(UseCase::Bed7_1Ds),
            channels: vec![],
            sub_elements: vec![],
        });
        assert_eq!(
            bed.active_variant(UseCase::Bed7_1Ds).unwrap().metadata_id,
            2
        );
        assert_eq!(bed.active_variant(UseCase::Bed9_1Oh).unwrap().metadata_id, 1);
    }
}
