//! The top-level [`Frame`] entity (§3) and the frame-rate/sample-rate enums its
//! header carries.

use std::collections::HashMap;

use crate::structs::element::Element;
use crate::utils::bitstream_io::{BitReader, BitWriter};
use crate::utils::errors::{IabError, Result};

pub const CURRENT_VERSION: u8 = 1;
/// §7: "more than 128 essence elements in one frame" is `AssetLimitExceeded`.
pub const MAX_ESSENCE_ELEMENTS: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRate {
    Hz48000,
    Hz96000,
}

impl SampleRate {
    pub fn hz(self) -> u32 {
        match self {
            SampleRate::Hz48000 => 48_000,
            SampleRate::Hz96000 => 96_000,
        }
    }

    fn wire_code(self) -> u8 {
        match self {
            SampleRate::Hz48000 => 0,
            SampleRate::Hz96000 => 1,
        }
    }

    fn from_wire_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(SampleRate::Hz48000),
            1 => Ok(SampleRate::Hz96000),
            v => Err(IabError::DataInvalid(format!(
                "unknown sample-rate code {v}"
            ))),
        }
    }
}

/// The ten frame rates ST 2098-2 defines (§2 C2, §4.2 "Sub-block counts").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameRate {
    Fps23_976,
    Fps24,
    Fps25,
    Fps30,
    Fps48,
    Fps50,
    Fps60,
    Fps96,
    Fps100,
    Fps120,
}

impl FrameRate {
    pub const ALL: [FrameRate; 10] = [
        FrameRate::Fps23_976,
        FrameRate::Fps24,
        FrameRate::Fps25,
        FrameRate::Fps30,
        FrameRate::Fps48,
        FrameRate::Fps50,
        FrameRate::Fps60,
        FrameRate::Fps96,
        FrameRate::Fps100,
        FrameRate::Fps120,
    ];

    fn wire_code(self) -> u8 {
        match self {
            FrameRate::Fps23_976 => 0,
            FrameRate::Fps24 => 1,
            FrameRate::Fps25 => 2,
            FrameRate::Fps30 => 3,
            FrameRate::Fps48 => 4,
            FrameRate::Fps50 => 5,
            FrameRate::Fps60 => 6,
            FrameRate::Fps96 => 7,
            FrameRate::Fps100 => 8,
            FrameRate::Fps120 => 9,
        }
    }

    fn from_wire_code(code: u8) -> Result<Self> {
        FrameRate::ALL
            .into_iter()
            .find(|f| f.wire_code() == code)
            .ok_or_else(|| IabError::DataInvalid(format!("unknown frame-rate code {code}")))
    }

    /// Sub-block count per frame (§4.2 "Sub-block counts").
    pub fn sub_block_count(self) -> usize {
        match self {
            FrameRate::Fps24 | FrameRate::Fps23_976 | FrameRate::Fps48 | FrameRate::Fps96 => 8,
            FrameRate::Fps25 | FrameRate::Fps50 | FrameRate::Fps100 => 10,
            FrameRate::Fps30 | FrameRate::Fps60 | FrameRate::Fps120 => 6,
        }
    }

    /// 48 kHz samples per frame for this rate (§4.3 "Frame sizes").
    pub fn samples_per_frame_48k(self) -> usize {
        match self {
            FrameRate::Fps23_976 => 2000,
            FrameRate::Fps24 => 2000,
            FrameRate::Fps25 => 1920,
            FrameRate::Fps30 => 1600,
            FrameRate::Fps48 => 1000,
            FrameRate::Fps50 => 960,
            FrameRate::Fps60 => 800,
            FrameRate::Fps96 => 500,
            FrameRate::Fps100 => 480,
            FrameRate::Fps120 => 400,
        }
    }

    pub fn samples_per_frame(self, sample_rate: SampleRate) -> usize {
        let base = self.samples_per_frame_48k();
        match sample_rate {
            SampleRate::Hz48000 => base,
            SampleRate::Hz96000 => base * 2,
        }
    }

    /// 48 kHz per-sub-block sample counts. Every rate but 23.976 fps is uniform;
    /// 23.976 fps uses the irregular `[250]*7 + [252]` layout (§4.2).
    pub fn sub_block_sample_layout_48k(self) -> Vec<usize> {
        let k = self.sub_block_count();
        if self == FrameRate::Fps23_976 {
            return vec![250, 250, 250, 250, 250, 250, 250, 252];
        }
        let total = self.samples_per_frame_48k();
        vec![total / k; k]
    }

    /// §4.5 "Supported rate combinations" for the renderer. `pcm_only` distinguishes
    /// the 23.976 fps / 48 kHz exception, which the renderer only accepts when every
    /// essence element in the frame is raw PCM (not DLC).
    pub fn supported_for_render(self, sample_rate: SampleRate, pcm_only: bool) -> bool {
        match sample_rate {
            SampleRate::Hz48000 => match self {
                FrameRate::Fps24
                | FrameRate::Fps25
                | FrameRate::Fps30
                | FrameRate::Fps48
                | FrameRate::Fps60
                | FrameRate::Fps120 => true,
                FrameRate::Fps23_976 => pcm_only,
                _ => false,
            },
            SampleRate::Hz96000 => matches!(self, FrameRate::Fps24 | FrameRate::Fps48),
        }
    }
}

pub type AudioId = u32;
pub type MetadataId = u32;

/// Resolves audio-data-IDs to essence element indices within a frame (§9:
/// "do not store pointers from channels/objects to essence").
#[derive(Debug, Default, Clone)]
pub struct AssetIndex {
    map: HashMap<AudioId, usize>,
}

impl AssetIndex {
    pub fn build(elements: &[Element]) -> Self {
        let mut map = HashMap::new();
        for (i, element) in elements.iter().enumerate() {
            if let Some(id) = element.audio_data_id() {
                map.insert(id, i);
            }
        }
        Self { map }
    }

    pub fn resolve(&self, id: AudioId) -> Option<usize> {
        if id == 0 {
            return None; // 0 means "silent channel" (§3)
        }
        self.map.get(&id).copied()
    }
}

/// Top-level bitstream entity: exactly one per bitstream frame (§3).
#[derive(Debug, Clone)]
pub struct Frame {
    pub version: u8,
    pub sample_rate: SampleRate,
    pub frame_rate: FrameRate,
    pub max_rendered: u32,
    pub elements: Vec<Element>,
}

impl Frame {
    pub fn new(frame_rate: FrameRate, sample_rate: SampleRate) -> Self {
        Self {
            version: CURRENT_VERSION,
            sample_rate,
            frame_rate,
            max_rendered: 0,
            elements: Vec::new(),
        }
    }

    pub fn sub_block_count(&self) -> usize {
        self.frame_rate.sub_block_count()
    }

    pub fn asset_index(&self) -> AssetIndex {
        AssetIndex::build(&self.elements)
    }

    pub fn essence_element_count(&self) -> usize {
        self.elements.iter().filter(|e| e.audio_data_id().is_some()).count()
    }

    pub fn check_invariants(&self) -> Result<()> {
        if self.essence_element_count() > MAX_ESSENCE_ELEMENTS {
            return Err(IabError::AssetLimitExceeded {
                found: self.essence_element_count(),
                max: MAX_ESSENCE_ELEMENTS,
            });
        }
        let mut metadata_ids = std::collections::HashSet::new();
        let mut audio_ids = std::collections::HashSet::new();
        for element in &self.elements {
            if let Some(id) = element.metadata_id() {
                if !metadata_ids.insert(id) {
                    return Err(IabError::DataInvalid(format!(
                        "duplicate metadata-ID {id} within frame"
                    )));
                }
            }
            if let Some(id) = element.audio_data_id() {
                if id != 0 && !audio_ids.insert(id) {
                    return Err(IabError::DataInvalid(format!(
                        "duplicate audio-data-ID {id} within frame"
                    )));
                }
            }
        }
        Ok(())
    }

    /// §4.4 "recomputes the frame's max-rendered as the sum of contributing bed
    /// channels and conditionally-active objects for the dominant use-case".
    pub fn recompute_max_rendered(&mut self, target_use_case: crate::structs::element::UseCase) {
        use crate::structs::element::Element as E;

        let mut total = 0u32;
        for element in &self.elements {
            match element {
                E::Bed(bed) => {
                    if let Some(active) = bed.active_variant(target_use_case) {
                        total += active.channels.len() as u32;
                    }
                }
                E::Object(object) => {
                    if object.active_variant(target_use_case).is_some() {
                        total += 1;
                    }
                }
                _ => {}
            }
        }
        self.max_rendered = total;
    }

    pub fn read(reader: &mut BitReader, fail_on_version_mismatch: bool) -> Result<Self> {
        let version = reader.read(8)? as u8;
        if fail_on_version_mismatch && version != CURRENT_VERSION {
            return Err(IabError::UnsupportedVersion(version));
        }
        let sample_rate = SampleRate::from_wire_code(reader.read(4)? as u8)?;
        let frame_rate = FrameRate::from_wire_code(reader.read(4)? as u8)?;
        let max_rendered = reader.read_plex(8)? as u32;

        let sub_element_count = reader.read_plex(8)? as usize;
        let mut elements = Vec::with_capacity(sub_element_count);
        for _ in 0..sub_element_count {
            elements.push(Element::read(reader)?);
        }

        Ok(Self {
            version,
            sample_rate,
            frame_rate,
            max_rendered,
            elements,
        })
    }

    pub fn write(&self, writer: &mut BitWriter) -> Result<()> {
        writer.write(self.version as u64, 8)?;
        writer.write(self.sample_rate.wire_code() as u64, 4)?;
        writer.write(self.frame_rate.wire_code() as u64, 4)?;
        writer.write_plex(self.max_rendered as u64, 8)?;
        writer.write_plex(self.elements.len() as u64, 8)?;
        for element in &self.elements {
            element.write(writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_block_counts_match_frame_rate_table() {
        assert_eq!(FrameRate::Fps24.sub_block_count(), 8);
        assert_eq!(FrameRate::Fps25.sub_block_count(), 10);
        assert_eq!(FrameRate::Fps30.sub_block_count(), 6);
    }

    #[test]
    fn irregular_23_976_layout_sums_to_frame_size() {
        let layout = FrameRate::Fps23_976.sub_block_sample_layout_48k();
        assert_eq!(layout, vec![250, 250, 250, 250, 250, 250, 250, 252]);
        assert_eq!(layout.iter().sum::<usize>(), 2000);
    }

    #[test]
    fn minimum_frame_round_trips() {
        let frame = Frame::new(FrameRate::Fps24, SampleRate::Hz48000);
        let mut w = BitWriter::new();
        frame.write(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();

        let mut r = BitReader::new(&bytes);
        let back = Frame::read(&mut r, true).unwrap();
        assert_eq!(back.version, CURRENT_VERSION);
        assert_eq!(back.sample_rate, SampleRate::Hz48000);
        assert_eq!(back.frame_rate, FrameRate::Fps24);
        assert_eq!(back.max_rendered, 0);
        assert!(back.elements.is_empty());
    }

    #[test]
    fn max_rendered_of_empty_frame_is_zero() {
        let mut frame = Frame::new(FrameRate::Fps24, SampleRate::Hz48000);
        frame.recompute_max_rendered(crate::structs::element::UseCase::Always);
        assert_eq!(frame.max_rendered, 0);
    }
}
