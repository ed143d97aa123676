//! Essence elements (§3): `AudioDataDLC` carries DLC-coded sub-block payloads
//! (decoded by [`crate::dlc`]); `AudioDataPCM` carries raw linear PCM samples.

use crate::utils::bitstream_io::{BitReader, BitWriter};
use crate::utils::errors::Result;

#[derive(Debug, Clone)]
pub struct AudioDataDlc {
    pub audio_data_id: u32,
    /// Raw encoded bytes for this essence's DLC sub-blocks; structure is owned by
    /// `crate::dlc::decode`/`crate::dlc::encode`, not this wire-framing layer.
    pub payload: Vec<u8>,
}

impl AudioDataDlc {
    pub fn read(reader: &mut BitReader) -> Result<Self> {
        let audio_data_id = reader.read_plex(8)? as u32;
        let len = reader.read_packed_length()? as usize;
        let payload = reader.read_aligned(len)?;
        Ok(Self {
            audio_data_id,
            payload,
        })
    }

    pub fn write(&self, writer: &mut BitWriter) -> Result<()> {
        writer.write_plex(self.audio_data_id as u64, 8)?;
        writer.write_packed_length(self.payload.len() as u32)?;
        writer.write_aligned(&self.payload)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AudioDataPcm {
    pub audio_data_id: u32,
    pub bits_per_sample: u8,
    pub samples: Vec<i32>,
}

impl AudioDataPcm {
    pub fn read(reader: &mut BitReader) -> Result<Self> {
        let audio_data_id = reader.read_plex(8)? as u32;
        let bits_per_sample = reader.read(8)? as u8;
        let count = reader.read_packed_length()? as usize;
        let mut samples = Vec::with_capacity(count);
        for _ in 0..count {
            samples.push(reader.read_signed(bits_per_sample as u32)? as i32);
        }
        Ok(Self {
            audio_data_id,
            bits_per_sample,
            samples,
        })
    }

    pub fn write(&self, writer: &mut BitWriter) -> Result<()> {
        writer.write_plex(self.audio_data_id as u64, 8)?;
        writer.write(self.bits_per_sample as u64, 8)?;
        writer.write_packed_length(self.samples.len() as u32)?;
        for sample in &self.samples {
            writer.write_signed(*sample as i64, self.bits_per_sample as u32)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dlc_essence_round_trips() {
        let dlc = AudioDataDlc {
            audio_data_id: 3,
            payload: vec![1, 2, 3, 4, 5],
        };
        let mut w = BitWriter::new();
        dlc.write(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        let back = AudioDataDlc::read(&mut r).unwrap();
        assert_eq!(back.audio_data_id, 3);
        assert_eq!(back.payload, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn pcm_essence_round_trips_negative_samples() {
        let pcm = AudioDataPcm {
            audio_data_id: 4,
            bits_per_sample: 16,
            samples: vec![-32768, -1, 0, 1, 32767],
        };
        let mut w = BitWriter::new();
        pcm.write(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        let back = AudioDataPcm::read(&mut r).unwrap();
        assert_eq!(back.samples, pcm.samples);
    }
}
