//! `ObjectSubBlock` (§3, §4.2): one per-sub-block slice of an object's pan
//! trajectory. Not an independently tagged element — read inline, once per entry
//! in the parent `ObjectDefinition`'s sub-block list.
//!
//! Sub-block 0 always carries pan info (the wire format elides its presence bit);
//! every later sub-block carries an explicit presence bit and, when clear, holds
//! its entire pan state over from the previous active sub-block (§4.5 step "if
//! pan-info-exists... else reuse the previous sub-block's gain vector").

use crate::structs::gain::GainCode;
use crate::structs::position::UnitCubePosition;
use crate::utils::bitstream_io::{BitReader, BitWriter};
use crate::utils::errors::{IabError, Result};

/// Object snap: render as unity gain directly to one matching speaker instead of
/// a VBAP solve, when the object's position is within `tolerance` of a speaker's
/// cube position (§4.5 step 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snap {
    pub present: bool,
    /// 12-bit tolerance, `0..=4095` representing `tolerance/4095` in cube units.
    pub tolerance: u16,
}

impl Snap {
    pub const NONE: Snap = Snap {
        present: false,
        tolerance: 0,
    };

    pub fn tolerance_fraction(self) -> f32 {
        self.tolerance as f32 / 4095.0
    }

    pub fn read(reader: &mut BitReader) -> Result<Self> {
        let present = reader.read_bit()?;
        let tolerance = reader.read(12)? as u16;
        Ok(Self { present, tolerance })
    }

    pub fn write(self, writer: &mut BitWriter) -> Result<()> {
        writer.write_bit(self.present)?;
        writer.write(self.tolerance as u64, 12)?;
        Ok(())
    }
}

pub const ZONE9_COUNT: usize = 9;

/// A 2-bit zone-gain level: 4 discrete multipliers rather than a continuous code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneGainLevel(pub u8);

impl ZoneGainLevel {
    pub fn to_linear(self) -> f32 {
        match self.0 {
            0 => 0.0,
            1 => 1.0 / 3.0,
            2 => 2.0 / 3.0,
            _ => 1.0,
        }
    }
}

/// Nine per-octant gain multipliers (§4.2 "zone-gains-9"), applied after the VBAP
/// triangle solve (§4.5 step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneGains9 {
    pub enabled: bool,
    pub levels: [ZoneGainLevel; ZONE9_COUNT],
}

impl ZoneGains9 {
    pub const DISABLED: ZoneGains9 = ZoneGains9 {
        enabled: false,
        levels: [ZoneGainLevel(3); ZONE9_COUNT],
    };

    pub fn read(reader: &mut BitReader) -> Result<Self> {
        let enabled = reader.read_bit()?;
        let mut levels = [ZoneGainLevel(3); ZONE9_COUNT];
        for level in levels.iter_mut() {
            *level = ZoneGainLevel(reader.read(2)? as u8);
        }
        Ok(Self { enabled, levels })
    }

    pub fn write(self, writer: &mut BitWriter) -> Result<()> {
        writer.write_bit(self.enabled)?;
        for level in &self.levels {
            writer.write(level.0 as u64, 2)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadMode {
    Low1D,
    High1D,
    High3D,
}

impl SpreadMode {
    fn wire_code(self) -> u8 {
        match self {
            SpreadMode::Low1D => 0,
            SpreadMode::High1D => 1,
            SpreadMode::High3D => 2,
        }
    }

    fn from_wire_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(SpreadMode::Low1D),
            1 => Ok(SpreadMode::High1D),
            2 => Ok(SpreadMode::High3D),
            v => Err(IabError::DataInvalid(format!("unknown spread mode code {v}"))),
        }
    }

    /// Number of `[0,1]` values this mode carries: the two 1D modes collapse to a
    /// single aperture value, the 3D mode carries one per axis.
    pub fn value_count(self) -> usize {
        match self {
            SpreadMode::Low1D | SpreadMode::High1D => 1,
            SpreadMode::High3D => 3,
        }
    }
}

/// Spread/aperture amount(s), one `u8` code per axis (`code / 255.0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spread {
    pub mode: SpreadMode,
    pub values: [u8; 3],
}

impl Spread {
    pub const POINT_SOURCE: Spread = Spread {
        mode: SpreadMode::Low1D,
        values: [0, 0, 0],
    };

    /// Collapses to the single 1D aperture fraction used by the VBAP extended-
    /// source generator (§4.5 step 2: "3D spread averages into a 1D value").
    pub fn aperture_fraction(self) -> f32 {
        let n = self.mode.value_count();
        let sum: u32 = self.values[..n].iter().map(|&v| v as u32).sum();
        (sum as f32 / n as f32) / 255.0
    }

    pub fn read(reader: &mut BitReader) -> Result<Self> {
        let mode = SpreadMode::from_wire_code(reader.read(2)? as u8)?;
        let mut values = [0u8; 3];
        for value in values.iter_mut().take(mode.value_count()) {
            *value = reader.read(8)? as u8;
        }
        Ok(Self { mode, values })
    }

    pub fn write(self, writer: &mut BitWriter) -> Result<()> {
        writer.write(self.mode.wire_code() as u64, 2)?;
        for value in &self.values[..self.mode.value_count()] {
            writer.write(*value as u64, 8)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorPrefix {
    None,
    Max,
    Reserved(u8),
}

impl DecorPrefix {
    fn wire_code(self) -> u8 {
        match self {
            DecorPrefix::None => 0,
            DecorPrefix::Max => 1,
            DecorPrefix::Reserved(v) => v,
        }
    }

    fn from_wire_code(code: u8) -> Self {
        match code {
            0 => DecorPrefix::None,
            1 => DecorPrefix::Max,
            v => DecorPrefix::Reserved(v),
        }
    }
}

/// Decorrelation toggle for this sub-block (§4.5 "Decorrelation"). Only a
/// `Reserved` prefix carries an accompanying 8-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decor {
    pub prefix: DecorPrefix,
    pub value: Option<u8>,
}

impl Decor {
    pub const OFF: Decor = Decor {
        prefix: DecorPrefix::None,
        value: None,
    };

    pub fn is_max(self) -> bool {
        self.prefix == DecorPrefix::Max
    }

    pub fn read(reader: &mut BitReader) -> Result<Self> {
        let prefix = DecorPrefix::from_wire_code(reader.read(2)? as u8);
        let value = if matches!(prefix, DecorPrefix::Reserved(_)) {
            Some(reader.read(8)? as u8)
        } else {
            None
        };
        Ok(Self { prefix, value })
    }

    pub fn write(self, writer: &mut BitWriter) -> Result<()> {
        writer.write(self.prefix.wire_code() as u64, 2)?;
        if let Some(value) = self.value {
            writer.write(value as u64, 8)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanInfo {
    pub position: UnitCubePosition,
    pub gain: GainCode,
    pub snap: Snap,
    pub zone_gains9: ZoneGains9,
    pub spread: Spread,
    pub decor: Decor,
}

impl PanInfo {
    pub fn read(reader: &mut BitReader) -> Result<Self> {
        let position = UnitCubePosition::read(reader)?;
        let gain = GainCode::from_code(reader.read(10)? as u16)?;
        let snap = Snap::read(reader)?;
        let zone_gains9 = ZoneGains9::read(reader)?;
        let spread = Spread::read(reader)?;
        let decor = Decor::read(reader)?;
        Ok(Self {
            position,
            gain,
            snap,
            zone_gains9,
            spread,
            decor,
        })
    }

    pub fn write(self, writer: &mut BitWriter) -> Result<()> {
        self.position.write(writer)?;
        writer.write(self.gain.code() as u64, 10)?;
        self.snap.write(writer)?;
        self.zone_gains9.write(writer)?;
        self.spread.write(writer)?;
        self.decor.write(writer)?;
        Ok(())
    }

    pub fn centered() -> Self {
        Self {
            position: UnitCubePosition::CENTER,
            gain: GainCode::UNITY,
            snap: Snap::NONE,
            zone_gains9: ZoneGains9::DISABLED,
            spread: Spread::POINT_SOURCE,
            decor: Decor::OFF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectSubBlock {
    pub pan_info_exists: bool,
    pub pan: Option<PanInfo>,
}

impl ObjectSubBlock {
    /// `is_first` elides the presence bit for sub-block 0, which always carries
    /// pan info (§4.2).
    pub fn read(reader: &mut BitReader, is_first: bool) -> Result<Self> {
        let pan_info_exists = if is_first { true } else { reader.read_bit()? };
        let pan = if pan_info_exists {
            Some(PanInfo::read(reader)?)
        } else {
            None
        };
        Ok(Self {
            pan_info_exists,
            pan,
        })
    }

    pub fn write(self, writer: &mut BitWriter, is_first: bool) -> Result<()> {
        if !is_first {
            writer.write_bit(self.pan_info_exists)?;
        }
        if let Some(pan) = self.pan {
            pan.write(writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sub_block_elides_presence_bit_but_still_round_trips() {
        let block = ObjectSubBlock {
            pan_info_exists: true,
            pan: Some(PanInfo::centered()),
        };
        let mut w = BitWriter::new();
        block.write(&mut w, true).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        let back = ObjectSubBlock::read(&mut r, true).unwrap();
        assert!(back.pan.is_some());
    }

    #[test]
    fn later_sub_block_with_no_pan_info_carries_no_payload() {
        let block = ObjectSubBlock {
            pan_info_exists: false,
            pan: None,
        };
        let mut w = BitWriter::new();
        block.write(&mut w, false).unwrap();
        let bytes = w.into_bytes().unwrap();
        assert_eq!(bytes.len(), 1); // just the presence bit, byte-aligned on flush
        let mut r = BitReader::new(&bytes);
        let back = ObjectSubBlock::read(&mut r, false).unwrap();
        assert!(back.pan.is_none());
    }

    #[test]
    fn spread_3d_averages_its_three_values() {
        let spread = Spread {
            mode: SpreadMode::High3D,
            values: [255, 0, 255],
        };
        assert!((spread.aperture_fraction() - (510.0 / 3.0 / 255.0)).abs() < 1e-6);
    }

    #[test]
    fn reserved_decor_prefix_carries_a_value() {
        let decor = Decor {
            prefix: DecorPrefix::Reserved(2),
            value: Some(200),
        };
        let mut w = BitWriter::new();
        decor.write(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        let back = Decor::read(&mut r).unwrap();
        assert_eq!(back.value, Some(200));
    }
}
