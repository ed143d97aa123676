//! `ObjectDefinition` (§3): a single audio object, its per-sub-block trajectory,
//! optional zone-19 override, and any nested conditional objects.

use crate::structs::channel::AudioDescription;
use crate::structs::element::UseCase;
use crate::structs::object_subblock::ObjectSubBlock;
use crate::structs::object_zone19::ObjectZoneDefinition19;
use crate::utils::bitstream_io::{BitReader, BitWriter};
use crate::utils::errors::Result;

#[derive(Debug, Clone)]
pub struct ObjectDefinition {
    pub metadata_id: u32,
    /// 0 means the object is silent and carries no essence (§3).
    pub audio_data_id: u32,
    pub audio_description: AudioDescription,
    pub description_text: Option<String>,
    pub conditional: bool,
    pub use_case: Option<UseCase>,
    pub sub_blocks: Vec<ObjectSubBlock>,
    pub zone19: Option<ObjectZoneDefinition19>,
    /// Nested, conditionally-tagged objects (§3).
    pub sub_elements: Vec<ObjectDefinition>,
}

impl ObjectDefinition {
    pub fn active_variant(&self, target: UseCase) -> Option<&ObjectDefinition> {
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

    pub fn is_silent(&self) -> bool {
        self.audio_data_id == 0
    }

    pub fn read(reader: &mut BitReader) -> Result<Self> {
        let metadata_id = reader.read_plex(8)? as u32;
        let audio_data_id = reader.read_plex(8)? as u32;
        let text_present = reader.read_bit()?;
        let (audio_description, description_text) =
            AudioDescription::read(reader, text_present)?;
        let conditional = reader.read_bit()?;
        let use_case = if conditional {
            Some(UseCase::read(reader)?)
        } else {
            None
        };
        let sub_block_count = reader.read_packed_length()? as usize;
        let sub_blocks = (0..sub_block_count)
            .map(|i| ObjectSubBlock::read(reader, i == 0))
            .collect::<Result<Vec<_>>>()?;
        let zone19 = reader.read_optional(ObjectZoneDefinition19::read)?;
        let sub_elements = reader.read_vector(ObjectDefinition::read)?;
        Ok(Self {
            metadata_id,
            audio_data_id,
            audio_description,
            description_text,
            conditional,
            use_case,
            sub_blocks,
            zone19,
            sub_elements,
        })
    }

    pub fn write(&self, writer: &mut BitWriter) -> Result<()> {
        writer.write_plex(self.metadata_id as u64, 8)?;
        writer.write_plex(self.audio_data_id as u64, 8)?;
        writer.write_bit(self.description_text.is_some())?;
        self.audio_description
            .write(writer, self.description_text.as_deref())?;
        writer.write_bit(self.conditional)?;
        if let Some(use_case) = self.use_case {
            use_case.write(writer)?;
        }
        writer.write_packed_length(self.sub_blocks.len() as u32)?;
        for (i, block) in self.sub_blocks.iter().enumerate() {
            block.write(writer, i == 0)?;
        }
        writer.write_optional(&self.zone19, |w, z| z.write(w))?;
        writer.write_vector(&self.sub_elements, |w, o| o.write(w))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::object_subblock::PanInfo;

    fn sample_object() -> ObjectDefinition {
        ObjectDefinition {
            metadata_id: 7,
            audio_data_id: 70,
            audio_description: AudioDescription::Effects,
            description_text: None,
            conditional: false,
            use_case: None,
            sub_blocks: vec![ObjectSubBlock {
                pan_info_exists: true,
                pan: Some(PanInfo::centered()),
            }],
            zone19: None,
            sub_elements: vec![],
        }
    }

    #[test]
    fn object_round_trips() {
        let object = sample_object();
        let mut w = BitWriter::new();
        object.write(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        let back = ObjectDefinition::read(&mut r).unwrap();
        assert_eq!(back.metadata_id, 7);
        assert_eq!(back.audio_data_id, 70);
        assert_eq!(back.sub_blocks.len(), 1);
        assert!(!back.is_silent());
    }

    #[test]
    fn silent_object_has_zero_audio_data_id() {
        let mut object = sample_object();
        object.audio_data_id = 0;
        assert!(object.is_silent());
    }
}
