//! `ObjectZoneDefinition19` (§3): a fixed 19-way zone gain override carried by at
//! most one sub-element of an `ObjectDefinition` (§4.2, §9 Open Question: activation
//! on a conditional object is accepted but not rendered — see
//! [`crate::utils::errors::IabWarning::ObjectZone19Activated`]).

use crate::structs::gain::GainCode;
use crate::utils::bitstream_io::{BitReader, BitWriter};
use crate::utils::errors::Result;

pub const ZONE_COUNT: usize = 19;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectZoneDefinition19 {
    pub zone_gains: [GainCode; ZONE_COUNT],
}

impl ObjectZoneDefinition19 {
    pub fn get(&self, zone_index: usize) -> Option<GainCode> {
        self.zone_gains.get(zone_index).copied()
    }

    pub fn read(reader: &mut BitReader) -> Result<Self> {
        let mut zone_gains = [GainCode::UNITY; ZONE_COUNT];
        for slot in zone_gains.iter_mut() {
            *slot = GainCode::from_code(reader.read(10)? as u16)?;
        }
        Ok(Self { zone_gains })
    }

    pub fn write(&self, writer: &mut BitWriter) -> Result<()> {
        for gain in &self.zone_gains {
            writer.write(gain.code() as u64, 10)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone19_round_trips() {
        let mut zones = [GainCode::UNITY; ZONE_COUNT];
        zones[5] = GainCode::from_code(500).unwrap();
        let zone = ObjectZoneDefinition19 { zone_gains: zones };
        let mut w = BitWriter::new();
        zone.write(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        let back = ObjectZoneDefinition19::read(&mut r).unwrap();
        assert_eq!(back.get(5).unwrap().code(), 500);
        assert_eq!(back.get(0).unwrap(), GainCode::UNITY);
        assert_eq!(back.get(ZONE_COUNT), None);
    }
}
