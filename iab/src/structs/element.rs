//! The polymorphic element tree (§3, §9): a tagged sum type over every known IAB
//! element kind, with an `Unknown { tag, bytes }` fallthrough so forward-compatible
//! payloads survive a round trip (§9 "Polymorphic element tree").
//!
//! `Frame` itself is not a variant here: it is always the single outermost element a
//! stream contains, handled directly by [`crate::process::pack`]/[`crate::process::parse`].
//! [`crate::structs::object_subblock::ObjectSubBlock`] is likewise not a variant: per
//! §4.2 it has no independent element-ID/length header of its own — it is read inline,
//! once per sub-block, as part of its parent `ObjectDefinition`'s payload.

use crate::structs::authoring::{AuthoringToolInfo, UserData};
use crate::structs::bed::BedDefinition;
use crate::structs::bed_remap::BedRemap;
use crate::structs::essence::{AudioDataDlc, AudioDataPcm};
use crate::structs::object::ObjectDefinition;
use crate::structs::object_zone19::ObjectZoneDefinition19;
use crate::utils::bitstream_io::{BitReader, BitWriter};
use crate::utils::errors::{IabError, IabWarning, Result};

/// The rendering-target identifier selected by the renderer configuration and
/// compared against an element's `use-case` tag (§4.2 "Conditional activation rules").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UseCase {
    Always,
    Bed5_1,
    Bed7_1Ds,
    Bed9_1Oh,
    Custom(u8),
}

impl UseCase {
    fn wire_code(self) -> u8 {
        match self {
            UseCase::Always => 0,
            UseCase::Bed5_1 => 1,
            UseCase::Bed7_1Ds => 2,
            UseCase::Bed9_1Oh => 3,
            UseCase::Custom(v) => v,
        }
    }

    fn from_wire_code(code: u8) -> Self {
        match code {
            0 => UseCase::Always,
            1 => UseCase::Bed5_1,
            2 => UseCase::Bed7_1Ds,
            3 => UseCase::Bed9_1Oh,
            v => UseCase::Custom(v),
        }
    }

    pub fn read(reader: &mut BitReader) -> Result<Self> {
        Ok(Self::from_wire_code(reader.read(8)? as u8))
    }

    pub fn write(self, writer: &mut BitWriter) -> Result<()> {
        writer.write(self.wire_code() as u64, 8)
    }

    pub fn matches_target(self, target: UseCase) -> bool {
        self == target || self == UseCase::Always
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementTag {
    BedDefinition,
    BedRemap,
    ObjectDefinition,
    ObjectZoneDefinition19,
    AudioDataDlc,
    AudioDataPcm,
    AuthoringToolInfo,
    UserData,
}

impl ElementTag {
    fn wire_code(self) -> u32 {
        match self {
            ElementTag::BedDefinition => 1,
            ElementTag::BedRemap => 2,
            ElementTag::ObjectDefinition => 3,
            ElementTag::ObjectZoneDefinition19 => 4,
            ElementTag::AudioDataDlc => 5,
            ElementTag::AudioDataPcm => 6,
            ElementTag::AuthoringToolInfo => 7,
            ElementTag::UserData => 8,
        }
    }

    fn from_wire_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => ElementTag::BedDefinition,
            2 => ElementTag::BedRemap,
            3 => ElementTag::ObjectDefinition,
            4 => ElementTag::ObjectZoneDefinition19,
            5 => ElementTag::AudioDataDlc,
            6 => ElementTag::AudioDataPcm,
            7 => ElementTag::AuthoringToolInfo,
            8 => ElementTag::UserData,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub enum Element {
    Bed(BedDefinition),
    BedRemap(BedRemap),
    Object(ObjectDefinition),
    ObjectZone19(ObjectZoneDefinition19),
    DlcEssence(AudioDataDlc),
    PcmEssence(AudioDataPcm),
    AuthoringToolInfo(AuthoringToolInfo),
    UserData(UserData),
    /// Unrecognised element-ID; counted and skipped, never raised as an error (§7).
    Unknown { tag: u32, bytes: Vec<u8> },
}

impl Element {
    pub fn metadata_id(&self) -> Option<u32> {
        match self {
            Element::Bed(b) => Some(b.metadata_id),
            Element::Object(o) => Some(o.metadata_id),
            _ => None,
        }
    }

    pub fn audio_data_id(&self) -> Option<u32> {
        match self {
            Element::DlcEssence(e) => Some(e.audio_data_id),
            Element::PcmEssence(e) => Some(e.audio_data_id),
            _ => None,
        }
    }

    /// Reads one `{ Plex(8) tag, PackedLength length, payload }` element (§4.2).
    pub fn read(reader: &mut BitReader) -> Result<Self> {
        let tag = reader.read_plex(8)? as u32;
        let length = reader.read_packed_length()? as u64;
        let start_bit = reader.position();

        let element = match ElementTag::from_wire_code(tag) {
            Some(ElementTag::BedDefinition) => Element::Bed(BedDefinition::read(reader)?),
            Some(ElementTag::BedRemap) => Element::BedRemap(BedRemap::read(reader)?),
            Some(ElementTag::ObjectDefinition) => {
                Element::Object(ObjectDefinition::read(reader)?)
            }
            Some(ElementTag::ObjectZoneDefinition19) => {
                Element::ObjectZone19(ObjectZoneDefinition19::read(reader)?)
            }
            Some(ElementTag::AudioDataDlc) => Element::DlcEssence(AudioDataDlc::read(reader)?),
            Some(ElementTag::AudioDataPcm) => Element::PcmEssence(AudioDataPcm::read(reader)?),
            Some(ElementTag::AuthoringToolInfo) => {
                Element::AuthoringToolInfo(AuthoringToolInfo::read(reader)?)
            }
            Some(ElementTag::UserData) => Element::UserData(UserData::read(reader)?),
            None => {
                let bytes = reader.read_aligned(length as usize)?;
                return Ok(Element::Unknown { tag, bytes });
            }
        };

        let consumed_bits = reader.position() - start_bit;
        let window_bits = length * 8;
        if consumed_bits > window_bits {
            return Err(IabError::DataInvalid(format!(
                "element {tag} overran its length window: consumed {consumed_bits} bits, window {window_bits} bits"
            )));
        }
        if consumed_bits < window_bits {
            reader.align()?;
            let remaining_bytes = ((window_bits - consumed_bits) / 8) as usize;
            let _ = reader.read_aligned(remaining_bytes)?;
        }

        Ok(element)
    }

    /// Writes the element via a length-prefixed sub-buffer, the in-memory
    /// equivalent of "write payload then back-patch the length" (§4.2) for a writer
    /// that builds a byte vector rather than seeking a live stream.
    pub fn write(&self, writer: &mut BitWriter) -> Result<()> {
        if let Element::Unknown { tag, bytes } = self {
            writer.write_plex(*tag as u64, 8)?;
            writer.write_packed_length(bytes.len() as u32)?;
            writer.write_aligned(bytes)?;
            return Ok(());
        }

        let tag = match self {
            Element::Bed(_) => ElementTag::BedDefinition,
            Element::BedRemap(_) => ElementTag::BedRemap,
            Element::Object(_) => ElementTag::ObjectDefinition,
            Element::ObjectZone19(_) => ElementTag::ObjectZoneDefinition19,
            Element::DlcEssence(_) => ElementTag::AudioDataDlc,
            Element::PcmEssence(_) => ElementTag::AudioDataPcm,
            Element::AuthoringToolInfo(_) => ElementTag::AuthoringToolInfo,
            Element::UserData(_) => ElementTag::UserData,
            Element::Unknown { .. } => unreachable!(),
        };

        let mut payload_writer = BitWriter::new();
        match self {
            Element::Bed(bed) => bed.write(&mut payload_writer)?,
            Element::BedRemap(remap) => remap.write(&mut payload_writer)?,
            Element::Object(object) => object.write(&mut payload_writer)?,
            Element::ObjectZone19(zone) => zone.write(&mut payload_writer)?,
            Element::DlcEssence(dlc) => dlc.write(&mut payload_writer)?,
            Element::PcmEssence(pcm) => pcm.write(&mut payload_writer)?,
            Element::AuthoringToolInfo(info) => info.write(&mut payload_writer)?,
            Element::UserData(ud) => ud.write(&mut payload_writer)?,
            Element::Unknown { .. } => unreachable!(),
        }
        let payload = payload_writer.into_bytes()?;

        writer.write_plex(tag.wire_code() as u64, 8)?;
        writer.write_packed_length(payload.len() as u32)?;
        writer.write_aligned(&payload)?;
        Ok(())
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Element::Unknown { .. })
    }
}

pub(crate) fn warn_unknown_tag(warnings: &mut Vec<IabWarning>, tag: u32) {
    warnings.push(IabWarning::UnknownElementSkipped { tag });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tag_round_trips_verbatim() {
        let element = Element::Unknown {
            tag: 200,
            bytes: vec![1, 2, 3, 4],
        };
        let mut w = BitWriter::new();
        element.write(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();

        let mut r = BitReader::new(&bytes);
        let back = Element::read(&mut r).unwrap();
        match back {
            Element::Unknown { tag, bytes } => {
                assert_eq!(tag, 200);
                assert_eq!(bytes, vec![1, 2, 3, 4]);
            }
            _ => panic!("expected Unknown"),
        }
    }

    #[test]
    fn use_case_always_matches_any_target() {
        assert!(UseCase::Always.matches_target(UseCase::Bed5_1));
        assert!(UseCase::Bed5_1.matches_target(UseCase::Bed5_1));
        assert!(!UseCase::Bed5_1.matches_target(UseCase::Bed9_1Oh));
    }
}
