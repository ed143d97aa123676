//! `BedRemap` (§3): a per-sub-block dense gain matrix re-routing one channel set
//! onto another, used when a bed's channel layout must be reconciled with the
//! active rendering configuration.

use crate::structs::channel::ChannelId;
use crate::structs::element::UseCase;
use crate::structs::gain::GainCode;
use crate::utils::bitstream_io::{BitReader, BitWriter};
use crate::utils::errors::{IabError, Result};

#[derive(Debug, Clone)]
pub struct BedRemap {
    pub metadata_id: u32,
    pub conditional: bool,
    pub use_case: Option<UseCase>,
    pub source_channels: Vec<ChannelId>,
    pub destination_channels: Vec<ChannelId>,
    /// One dense `source x destination` gain matrix per sub-block, row-major over
    /// destination channels.
    pub sub_block_gains: Vec<Vec<GainCode>>,
    pub sub_elements: Vec<BedRemap>,
}

impl BedRemap {
    pub fn active_variant(&self, target: UseCase) -> Option<&BedRemap> {
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

    fn matrix_len(&self) -> usize {
        self.source_channels.len() * self.destination_channels.len()
    }

    pub fn read(reader: &mut BitReader) -> Result<Self> {
        let metadata_id = reader.read_plex(8)? as u32;
        let conditional = reader.read_bit()?;
        let use_case = if conditional {
            Some(UseCase::read(reader)?)
        } else {
            None
        };
        let source_channels =
            reader.read_vector(|r| ChannelId::from_wire_code(r.read(8)? as u8))?;
        let destination_channels =
            reader.read_vector(|r| ChannelId::from_wire_code(r.read(8)? as u8))?;
        let sub_block_gains = reader
            .read_vector(|r| r.read_vector(|r| GainCode::from_code(r.read(10)? as u16)))?;

        let sub_elements = reader.read_vector(BedRemap::read)?;

        let remap = Self {
            metadata_id,
            conditional,
            use_case,
            source_channels,
            destination_channels,
            sub_block_gains,
            sub_elements,
        };
        for row in &remap.sub_block_gains {
            if row.len() != remap.matrix_len() {
                return Err(IabError::DataInvalid(format!(
                    "bed remap {} sub-block gain row has {} cells, expected {}",
                    remap.metadata_id,
                    row.len(),
                    remap.matrix_len()
                )));
            }
        }
        Ok(remap)
    }

    pub fn write(&self, writer: &mut BitWriter) -> Result<()> {
        writer.write_plex(self.metadata_id as u64, 8)?;
        writer.write_bit(self.conditional)?;
        if let Some(use_case) = self.use_case {
            use_case.write(writer)?;
        }
        writer.write_vector(&self.source_channels, |w, c| w.write(c.wire_code() as u64, 8))?;
        writer.write_vector(&self.destination_channels, |w, c| {
            w.write(c.wire_code() as u64, 8)
        })?;
        writer.write_vector(&self.sub_block_gains, |w, row| {
            w.write_vector(row, |w, gain| w.write(gain.code() as u64, 10))
        })?;
        writer.write_vector(&self.sub_elements, |w, r| r.write(w))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bed_remap_round_trips() {
        let remap = BedRemap {
            metadata_id: 5,
            conditional: false,
            use_case: None,
            source_channels: vec![ChannelId::Left, ChannelId::Right],
            destination_channels: vec![ChannelId::Center],
            sub_block_gains: vec![vec![GainCode::UNITY, GainCode::UNITY]],
            sub_elements: vec![],
        };
        let mut w = BitWriter::new();
        remap.write(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        let back = BedRemap::read(&mut r).unwrap();
        assert_eq!(back.metadata_id, 5);
        assert_eq!(back.sub_block_gains, remap.sub_block_gains);
    }

    #[test]
    fn malformed_gain_row_length_is_rejected() {
        let mut w = BitWriter::new();
        w.write_plex(1, 8).unwrap(); // metadata_id
        w.write_bit(false).unwrap(); // conditional
        w.write_vector(&[ChannelId::Left], |w, c| w.write(c.wire_code() as u64, 8))
            .unwrap();
        w.write_vector(&[ChannelId::Center], |w, c| w.write(c.wire_code() as u64, 8))
            .unwrap();
        // one sub-block row with the wrong cell count (2 instead of the expected 1)
        w.write_vector(&[vec![0u16, 0u16]], |w, row| {
            w.write_vector(row, |w, code| w.write(*code as u64, 10))
        })
        .unwrap();
        w.write_vector::<BedRemap>(&[], |w, r| r.write(w)).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        assert!(BedRemap::read(&mut r).is_err());
    }
}
