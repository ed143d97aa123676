//! Channel identifiers and the audio-description metadata attached to beds and
//! objects (§3: "channel-ID (from the ST 2098-2 enum of ~17 labels...)").

use crate::utils::bitstream_io::{BitReader, BitWriter};
use crate::utils::errors::{IabError, Result};

/// A bed channel label, one of the fixed ST 2098-2 speaker-slot identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelId {
    Left,
    Right,
    Center,
    Lfe,
    LeftSideSurround,
    RightSideSurround,
    LeftRearSurround,
    RightRearSurround,
    LeftTopSurround,
    RightTopSurround,
    LeftHeightFront,
    RightHeightFront,
    LeftHeightRear,
    RightHeightRear,
    TopSurround,
    LeftWide,
    RightWide,
}

impl ChannelId {
    pub const ALL: [ChannelId; 17] = [
        ChannelId::Left,
        ChannelId::Right,
        ChannelId::Center,
        ChannelId::Lfe,
        ChannelId::LeftSideSurround,
        ChannelId::RightSideSurround,
        ChannelId::LeftRearSurround,
        ChannelId::RightRearSurround,
        ChannelId::LeftTopSurround,
        ChannelId::RightTopSurround,
        ChannelId::LeftHeightFront,
        ChannelId::RightHeightFront,
        ChannelId::LeftHeightRear,
        ChannelId::RightHeightRear,
        ChannelId::TopSurround,
        ChannelId::LeftWide,
        ChannelId::RightWide,
    ];

    pub fn wire_code(self) -> u8 {
        match self {
            ChannelId::Left => 1,
            ChannelId::Right => 2,
            ChannelId::Center => 3,
            ChannelId::Lfe => 4,
            ChannelId::LeftSideSurround => 5,
            ChannelId::RightSideSurround => 6,
            ChannelId::LeftRearSurround => 7,
            ChannelId::RightRearSurround => 8,
            ChannelId::LeftTopSurround => 9,
            ChannelId::RightTopSurround => 10,
            ChannelId::LeftHeightFront => 11,
            ChannelId::RightHeightFront => 12,
            ChannelId::LeftHeightRear => 13,
            ChannelId::RightHeightRear => 14,
            ChannelId::TopSurround => 15,
            ChannelId::LeftWide => 16,
            ChannelId::RightWide => 17,
        }
    }

    pub fn from_wire_code(code: u8) -> Result<Self> {
        ChannelId::ALL
            .into_iter()
            .find(|c| c.wire_code() == code)
            .ok_or_else(|| IabError::DataInvalid(format!("unknown channel-ID code {code}")))
    }

    pub fn is_lfe(self) -> bool {
        matches!(self, ChannelId::Lfe)
    }

    /// The speaker-position URI this channel canonically maps to, used to look up a
    /// physical or virtual speaker slot in the renderer configuration (§4.5).
    pub fn canonical_uri(self) -> &'static str {
        match self {
            ChannelId::Left => "L",
            ChannelId::Right => "R",
            ChannelId::Center => "C",
            ChannelId::Lfe => "LFE",
            ChannelId::LeftSideSurround => "Lss",
            ChannelId::RightSideSurround => "Rss",
            ChannelId::LeftRearSurround => "Lrs",
            ChannelId::RightRearSurround => "Rrs",
            ChannelId::LeftTopSurround => "Lts",
            ChannelId::RightTopSurround => "Rts",
            ChannelId::LeftHeightFront => "Ltf",
            ChannelId::RightHeightFront => "Rtf",
            ChannelId::LeftHeightRear => "Ltr",
            ChannelId::RightHeightRear => "Rtr",
            ChannelId::TopSurround => "Ts",
            ChannelId::LeftWide => "Lw",
            ChannelId::RightWide => "Rw",
        }
    }

    /// Canonical IAB unit-cube position used when a channel has no matching physical
    /// or virtual speaker slot and must be rendered as a point-source object (§4.5).
    pub fn canonical_position(self) -> crate::structs::position::UnitCubePosition {
        use crate::structs::position::UnitCubePosition as P;
        match self {
            ChannelId::Left => P::new(0.0, 0.0, 0.5),
            ChannelId::Right => P::new(1.0, 0.0, 0.5),
            ChannelId::Center => P::new(0.5, 0.0, 0.5),
            ChannelId::Lfe => P::new(0.5, 0.0, 0.0),
            ChannelId::LeftSideSurround => P::new(0.0, 0.5, 0.5),
            ChannelId::RightSideSurround => P::new(1.0, 0.5, 0.5),
            ChannelId::LeftRearSurround => P::new(0.0, 1.0, 0.5),
            ChannelId::RightRearSurround => P::new(1.0, 1.0, 0.5),
            ChannelId::LeftTopSurround => P::new(0.0, 0.5, 1.0),
            ChannelId::RightTopSurround => P::new(1.0, 0.5, 1.0),
            ChannelId::LeftHeightFront => P::new(0.0, 0.0, 1.0),
            ChannelId::RightHeightFront => P::new(1.0, 0.0, 1.0),
            ChannelId::LeftHeightRear => P::new(0.0, 1.0, 1.0),
            ChannelId::RightHeightRear => P::new(1.0, 1.0, 1.0),
            ChannelId::TopSurround => P::new(0.5, 0.5, 1.0),
            ChannelId::LeftWide => P::new(0.1, 0.0, 0.5),
            ChannelId::RightWide => P::new(0.9, 0.0, 0.5),
        }
    }
}

/// Free-form description of a bed or object's audio content (§3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioDescription {
    NotIndicated,
    Dialog,
    Music,
    Effects,
    Foley,
    Background,
    Reserved(u8),
}

impl AudioDescription {
    fn wire_code(self) -> u8 {
        match self {
            AudioDescription::NotIndicated => 0,
            AudioDescription::Dialog => 1,
            AudioDescription::Music => 2,
            AudioDescription::Effects => 3,
            AudioDescription::Foley => 4,
            AudioDescription::Background => 5,
            AudioDescription::Reserved(v) => v,
        }
    }

    fn from_wire_code(code: u8) -> Self {
        match code {
            0 => AudioDescription::NotIndicated,
            1 => AudioDescription::Dialog,
            2 => AudioDescription::Music,
            3 => AudioDescription::Effects,
            4 => AudioDescription::Foley,
            5 => AudioDescription::Background,
            v => AudioDescription::Reserved(v),
        }
    }

    pub fn read(reader: &mut BitReader, text_present: bool) -> Result<(Self, Option<String>)> {
        let code = reader.read(8)? as u8;
        let kind = Self::from_wire_code(code);
        let text = if text_present {
            Some(reader.read_packed_string()?)
        } else {
            None
        };
        Ok((kind, text))
    }

    pub fn write(self, writer: &mut BitWriter, text: Option<&str>) -> Result<()> {
        writer.write(self.wire_code() as u64, 8)?;
        if let Some(text) = text {
            writer.write_packed_string(text)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_code_round_trip_for_every_channel() {
        for channel in ChannelId::ALL {
            let code = channel.wire_code();
            assert_eq!(ChannelId::from_wire_code(code).unwrap(), channel);
        }
    }

    #[test]
    fn only_lfe_is_lfe() {
        assert!(ChannelId::Lfe.is_lfe());
        assert!(!ChannelId::Center.is_lfe());
    }
}
