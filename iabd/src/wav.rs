//! Minimal RIFF/WAVE PCM reader and writer: headers are written up front with
//! placeholder sizes and patched on [`WavWriter::finish`], the same
//! write-then-patch-at-close shape as the teacher's Wave64 writer, adapted here
//! to the plain 44-byte RIFF header most tools expect rather than Sony's W64
//! GUID chunks (nothing in this workspace needs files above the 4 GiB RIFF
//! size ceiling).

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

pub struct WavReader {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub samples: Vec<i32>,
}

impl WavReader {
    pub fn open(path: &Path) -> io::Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut riff = [0u8; 12];
        reader.read_exact(&mut riff)?;
        if &riff[0..4] != b"RIFF" || &riff[8..12] != b"WAVE" {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "not a RIFF/WAVE file"));
        }

        let mut sample_rate = 48_000u32;
        let mut channels = 1u16;
        let mut bits_per_sample = 16u16;
        let mut samples = Vec::new();

        loop {
            let mut chunk_header = [0u8; 8];
            if reader.read_exact(&mut chunk_header).is_err() {
                break;
            }
            let chunk_id = &chunk_header[0..4];
            let chunk_size = u32::from_le_bytes(chunk_header[4..8].try_into().unwrap()) as usize;

            if chunk_id == b"fmt " {
                let mut fmt = vec![0u8; chunk_size];
                reader.read_exact(&mut fmt)?;
                channels = u16::from_le_bytes(fmt[2..4].try_into().unwrap());
                sample_rate = u32::from_le_bytes(fmt[4..8].try_into().unwrap());
                bits_per_sample = u16::from_le_bytes(fmt[14..16].try_into().unwrap());
            } else if chunk_id == b"data" {
                let mut data = vec![0u8; chunk_size];
                reader.read_exact(&mut data)?;
                samples = decode_pcm(&data, bits_per_sample);
            } else {
                let mut skip = vec![0u8; chunk_size];
                reader.read_exact(&mut skip)?;
            }
            if chunk_size % 2 == 1 {
                let _ = reader.read_exact(&mut [0u8; 1]);
            }
        }

        Ok(Self {
            sample_rate,
            channels,
            bits_per_sample,
            samples,
        })
    }
}

fn decode_pcm(data: &[u8], bits_per_sample: u16) -> Vec<i32> {
    match bits_per_sample {
        16 => data
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as i32)
            .collect(),
        24 => data
            .chunks_exact(3)
            .map(|b| {
                let bytes = [b[0], b[1], b[2], if b[2] & 0x80 != 0 { 0xFF } else { 0x00 }];
                i32::from_le_bytes(bytes)
            })
            .collect(),
        32 => data
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        _ => Vec::new(),
    }
}

/// Streaming multi-channel PCM writer: `write_block` takes one interleaved
/// sample block at a time, so a caller can feed it frame-by-frame render output
/// without holding the whole file in memory.
pub struct WavWriter {
    writer: BufWriter<File>,
    data_size_position: u64,
    data_written_bytes: u64,
    channels: u16,
}

impl WavWriter {
    pub fn create(path: &Path, sample_rate: u32, channels: u16, bits_per_sample: u16) -> io::Result<Self> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(b"RIFF")?;
        writer.write_all(&0u32.to_le_bytes())?; // patched in `finish`
        writer.write_all(b"WAVE")?;

        writer.write_all(b"fmt ")?;
        writer.write_all(&16u32.to_le_bytes())?;
        writer.write_all(&1u16.to_le_bytes())?; // PCM
        writer.write_all(&channels.to_le_bytes())?;
        writer.write_all(&sample_rate.to_le_bytes())?;
        let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
        writer.write_all(&byte_rate.to_le_bytes())?;
        let block_align = channels * (bits_per_sample / 8);
        writer.write_all(&block_align.to_le_bytes())?;
        writer.write_all(&bits_per_sample.to_le_bytes())?;

        writer.write_all(b"data")?;
        let data_size_position = writer.stream_position()?;
        writer.write_all(&0u32.to_le_bytes())?; // patched in `finish`

        Ok(Self {
            writer,
            data_size_position,
            data_written_bytes: 0,
            channels,
        })
    }

    /// Writes one block of interleaved 16-bit samples, `block.len()` must be a
    /// multiple of `channels`.
    pub fn write_block_i16(&mut self, block: &[i16]) -> io::Result<()> {
        debug_assert_eq!(block.len() % self.channels as usize, 0);
        for &sample in block {
            self.writer.write_all(&sample.to_le_bytes())?;
            self.data_written_bytes += 2;
        }
        Ok(())
    }

    pub fn finish(mut self) -> io::Result<()> {
        self.writer.flush()?;
        let end = self.writer.stream_position()?;

        self.writer.seek(SeekFrom::Start(self.data_size_position))?;
        self.writer.write_all(&(self.data_written_bytes as u32).to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(4))?;
        self.writer.write_all(&((end - 8) as u32).to_le_bytes())?;

        self.writer.seek(SeekFrom::End(0))?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_16_bit_pcm_little_endian() {
        let data = [0x34, 0x12, 0xCD, 0xAB];
        let samples = decode_pcm(&data, 16);
        assert_eq!(samples, vec![0x1234, -0x5433]);
    }

    #[test]
    fn round_trip_header_reports_correct_channel_count() {
        let path = std::env::temp_dir().join("iabd_wav_writer_test.wav");
        let mut writer = WavWriter::create(&path, 48_000, 2, 16).unwrap();
        writer.write_block_i16(&[0, 0, 100, -100]).unwrap();
        writer.finish().unwrap();

        let read = WavReader::open(&path).unwrap();
        assert_eq!(read.channels, 2);
        assert_eq!(read.sample_rate, 48_000);
        assert_eq!(read.samples, vec![0, 0, 100, -100]);
        std::fs::remove_file(&path).ok();
    }
}
