//! The sole primitive layer (C1) every element is serialized through: a big-endian,
//! MSB-first bit reader and writer over `bitstream_io`, plus the composite types
//! `PackedLength`, `PackedUInt32`, `PackedUInt64`, `Plex(N)`, `PackedString`,
//! `NullTerminatedString`, `OptionalParameter<T>` and `Vector<T>` from §4.1.

use std::io::{self, Cursor, SeekFrom};

use bitstream_io::{BigEndian, BitRead, BitReader as RawBitReader, BitWrite, BitWriter as RawBitWriter};

use crate::utils::crc::Crc16Accumulator;
use crate::utils::errors::{IabError, Result};
use crate::utils::md5::Md5Accumulator;

/// Which kind of stream observer is attached, if any (§4.1: "exactly one of either
/// kind may be attached to a stream at a time").
#[derive(Debug, Default)]
enum Tee {
    #[default]
    None,
    Crc(Crc16Accumulator),
    Md5(Md5Accumulator),
}

impl Tee {
    fn observe_bits(&mut self, bits: u64, bit_count: u32) {
        if let Tee::Crc(crc) = self {
            crc.accumulate(bits, bit_count);
        }
    }

    fn observe_bytes(&mut self, bytes: &[u8]) {
        if let Tee::Md5(md5) = self {
            md5.accumulate(bytes);
        }
    }

    fn pause(&mut self) {
        match self {
            Tee::Crc(c) => c.pause(),
            Tee::Md5(m) => m.pause(),
            Tee::None => {}
        }
    }

    fn resume(&mut self) {
        match self {
            Tee::Crc(c) => c.resume(),
            Tee::Md5(m) => m.resume(),
            Tee::None => {}
        }
    }
}

/// A scoped restore point for a reader's cursor. Dropping it without calling
/// [`BitReader::restore`] leaves the stream at whatever position it reached; callers
/// that want peek semantics must explicitly restore (§9: "implement as an explicit
/// guard object with a deterministic destroy step, not ambient stack unwinding").
pub struct Snapshot {
    bit_position: u64,
}

/// Big-endian, MSB-first bit reader over an in-memory byte slice.
pub struct BitReader<'a> {
    bs: RawBitReader<Cursor<&'a [u8]>, BigEndian>,
    len_bits: u64,
    tee: Tee,
}

impl<'a> BitReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            bs: RawBitReader::new(Cursor::new(buf)),
            len_bits: (buf.len() as u64) * 8,
            tee: Tee::None,
        }
    }

    pub fn attach_crc(&mut self) {
        let mut crc = Crc16Accumulator::new();
        crc.start();
        self.tee = Tee::Crc(crc);
    }

    pub fn attach_md5(&mut self) {
        let mut md5 = Md5Accumulator::new();
        md5.start();
        self.tee = Tee::Md5(md5);
    }

    pub fn take_crc(&mut self) -> Option<u16> {
        match std::mem::take(&mut self.tee) {
            Tee::Crc(mut c) => Some(c.stop()),
            other => {
                self.tee = other;
                None
            }
        }
    }

    pub fn take_md5(&mut self) -> Option<[u8; 16]> {
        match std::mem::take(&mut self.tee) {
            Tee::Md5(mut m) => Some(m.stop()),
            other => {
                self.tee = other;
                None
            }
        }
    }

    #[inline]
    pub fn position(&mut self) -> u64 {
        self.bs.position_in_bits().unwrap_or(0)
    }

    #[inline]
    pub fn available(&mut self) -> u64 {
        self.len_bits.saturating_sub(self.position())
    }

    fn check_available(&mut self, n: u64) -> Result<()> {
        if n > self.available() {
            return Err(IabError::EndOfStream(self.position()));
        }
        Ok(())
    }

    /// `read(n)`: next n bits (1..=64) as an unsigned integer, MSB-first.
    pub fn read(&mut self, n: u32) -> Result<u64> {
        if n == 0 {
            return Ok(0);
        }
        self.check_available(n as u64)?;
        let value: u64 = self
            .bs
            .read_var(n)
            .map_err(|e| IabError::IoFail(e.to_string()))?;
        self.tee.observe_bits(value, n);
        Ok(value)
    }

    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read(1)? != 0)
    }

    pub fn read_signed(&mut self, n: u32) -> Result<i64> {
        let raw = self.read(n)?;
        if n == 64 {
            return Ok(raw as i64);
        }
        let sign_bit = 1u64 << (n - 1);
        Ok(if raw & sign_bit != 0 {
            (raw as i64) - ((sign_bit as i64) << 1)
        } else {
            raw as i64
        })
    }

    /// `peek(n)`: `read(n)` rolled back on exit; does not advance the CRC/MD5 tee.
    pub fn peek(&mut self, n: u32) -> Result<u64> {
        let snap = self.snapshot();
        self.tee.pause();
        let value = self.read(n);
        self.restore(snap)?;
        self.tee.resume();
        value
    }

    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot {
            bit_position: self.position(),
        }
    }

    pub fn restore(&mut self, snap: Snapshot) -> Result<()> {
        self.tee.pause();
        self.bs
            .seek_bits(SeekFrom::Start(snap.bit_position))
            .map_err(|e| IabError::IoFail(e.to_string()))?;
        self.tee.resume();
        Ok(())
    }

    pub fn skip(&mut self, n: u32) -> Result<()> {
        self.check_available(n as u64)?;
        self.bs
            .skip(n)
            .map_err(|e| IabError::IoFail(e.to_string()))?;
        Ok(())
    }

    pub fn align(&mut self) -> Result<()> {
        self.bs.byte_align();
        Ok(())
    }

    pub fn read_aligned(&mut self, bytes: usize) -> Result<Vec<u8>> {
        self.align()?;
        self.check_available((bytes as u64) * 8)?;
        let mut buf = vec![0u8; bytes];
        self.bs
            .read_bytes(&mut buf)
            .map_err(|e| IabError::IoFail(e.to_string()))?;
        self.tee.observe_bytes(&buf);
        Ok(buf)
    }

    /// Searches forward byte-aligned for `pattern` (optionally masked), leaving the
    /// cursor at the first matching byte; restores the pre-call position on a miss.
    pub fn sync(&mut self, pattern: &[u8], mask: Option<&[u8]>) -> Result<()> {
        let start = self.snapshot();
        self.align()?;

        loop {
            let probe = self.snapshot();
            if self.available() < (pattern.len() as u64) * 8 {
                self.restore(start)?;
                return Err(IabError::EndOfStream(self.position()));
            }

            let bytes = self.read_aligned(pattern.len())?;
            let matched = bytes.iter().zip(pattern).enumerate().all(|(i, (b, p))| {
                let m = mask.map(|m| m[i]).unwrap_or(0xFF);
                (b & m) == (p & m)
            });

            if matched {
                self.restore(probe)?;
                return Ok(());
            }
            self.restore(probe)?;
            self.skip(8)?;
        }
    }

    /// `Plex(N)`: read N bits; on all-ones, double the width (N, 2N, 4N, 8N, capped at
    /// 32 bits) until the value read at that width is not all-ones.
    pub fn read_plex(&mut self, n: u32) -> Result<u64> {
        let mut width = n;
        loop {
            let max = (1u64 << width) - 1;
            let value = self.read(width)?;
            if value != max || width >= 32 {
                return Ok(value);
            }
            width *= 2;
        }
    }

    /// `PackedLength`: one byte if < 128, else an escape byte `0x83` then a u32.
    pub fn read_packed_length(&mut self) -> Result<u32> {
        let first = self.read(8)? as u8;
        if first < 128 {
            Ok(first as u32)
        } else if first == 0x83 {
            Ok(self.read(32)? as u32)
        } else {
            Err(IabError::DataInvalid(format!(
                "invalid PackedLength escape byte {first:#x}"
            )))
        }
    }

    /// `PackedUInt32`: two-bit escape `0b11` then a 32-bit value.
    pub fn read_packed_u32(&mut self) -> Result<u32> {
        let escape = self.read(2)?;
        if escape != 0b11 {
            return Err(IabError::DataInvalid(format!(
                "invalid PackedUInt32 escape {escape:#b}"
            )));
        }
        Ok(self.read(32)? as u32)
    }

    /// `PackedUInt64`: three-bit escape `0b111` then a 64-bit value.
    pub fn read_packed_u64(&mut self) -> Result<u64> {
        let escape = self.read(3)?;
        if escape != 0b111 {
            return Err(IabError::DataInvalid(format!(
                "invalid PackedUInt64 escape {escape:#b}"
            )));
        }
        self.read(64)
    }

    /// `PackedString`: `PackedLength` + UTF-8 bytes (no terminator).
    pub fn read_packed_string(&mut self) -> Result<String> {
        let len = self.read_packed_length()? as usize;
        let bytes = self.read_aligned(len)?;
        String::from_utf8(bytes).map_err(|e| IabError::DataInvalid(e.to_string()))
    }

    /// `NullTerminatedString`: bytes up to and including a zero byte.
    pub fn read_null_terminated_string(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        loop {
            let b = self.read(8)? as u8;
            if b == 0 {
                break;
            }
            bytes.push(b);
        }
        String::from_utf8(bytes).map_err(|e| IabError::DataInvalid(e.to_string()))
    }

    /// `OptionalParameter<T>`: one presence bit, then `T` if set.
    pub fn read_optional<T>(&mut self, read_t: impl FnOnce(&mut Self) -> Result<T>) -> Result<Option<T>> {
        if self.read_bit()? {
            Ok(Some(read_t(self)?))
        } else {
            Ok(None)
        }
    }

    /// `Vector<T>`: `PackedLength` count, then that many `T`s.
    pub fn read_vector<T>(&mut self, mut read_t: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let count = self.read_packed_length()? as usize;
        (0..count).map(|_| read_t(self)).collect()
    }
}

/// Big-endian, MSB-first bit writer over an in-memory byte buffer.
pub struct BitWriter {
    bs: RawBitWriter<Vec<u8>, BigEndian>,
    tee: Tee,
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWriter {
    pub fn new() -> Self {
        Self {
            bs: RawBitWriter::new(Vec::new()),
            tee: Tee::None,
        }
    }

    pub fn attach_crc(&mut self) {
        let mut crc = Crc16Accumulator::new();
        crc.start();
        self.tee = Tee::Crc(crc);
    }

    pub fn attach_md5(&mut self) {
        let mut md5 = Md5Accumulator::new();
        md5.start();
        self.tee = Tee::Md5(md5);
    }

    pub fn take_crc(&mut self) -> Option<u16> {
        match std::mem::take(&mut self.tee) {
            Tee::Crc(mut c) => Some(c.stop()),
            other => {
                self.tee = other;
                None
            }
        }
    }

    pub fn take_md5(&mut self) -> Option<[u8; 16]> {
        match std::mem::take(&mut self.tee) {
            Tee::Md5(mut m) => Some(m.stop()),
            other => {
                self.tee = other;
                None
            }
        }
    }

    /// Writes the low `n` bits (1..=64) of `value`, MSB-first. The maximum value
    /// writable in an n-bit field is `(1 << n) - 1`; exceeding it is `BadParams`.
    pub fn write(&mut self, value: u64, n: u32) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        if n < 64 && value > (1u64 << n) - 1 {
            return Err(IabError::BadParams(format!(
                "value {value} does not fit in {n} bits"
            )));
        }
        self.bs
            .write_var(n, value)
            .map_err(|e| IabError::IoFail(e.to_string()))?;
        self.tee.observe_bits(value, n);
        Ok(())
    }

    pub fn write_bit(&mut self, value: bool) -> Result<()> {
        self.write(value as u64, 1)
    }

    pub fn write_signed(&mut self, value: i64, n: u32) -> Result<()> {
        if n == 64 {
            return self.write(value as u64, 64);
        }
        let min = -(1i64 << (n - 1));
        let max = (1i64 << (n - 1)) - 1;
        if value < min || value > max {
            return Err(IabError::BadParams(format!(
                "signed value {value} does not fit in {n} bits"
            )));
        }
        let mask = (1u64 << n) - 1;
        self.write((value as u64) & mask, n)
    }

    pub fn align(&mut self) -> Result<()> {
        self.bs
            .byte_align()
            .map_err(|e| IabError::IoFail(e.to_string()))
    }

    pub fn write_aligned(&mut self, bytes: &[u8]) -> Result<()> {
        self.align()?;
        self.bs
            .write_bytes(bytes)
            .map_err(|e| IabError::IoFail(e.to_string()))?;
        self.tee.observe_bytes(bytes);
        Ok(())
    }

    /// `Plex(N)`: writes the smallest width in `{N, 2N, 4N, 8N}` that strictly holds
    /// `value`, emitting one all-ones escape per doubling before the final value.
    pub fn write_plex(&mut self, value: u64, n: u32) -> Result<()> {
        let mut width = n;
        loop {
            let max = (1u64 << width) - 1;
            if value < max || width >= 32 {
                return self.write(value, width);
            }
            self.write(max, width)?;
            width *= 2;
        }
    }

    pub fn write_packed_length(&mut self, len: u32) -> Result<()> {
        if len < 128 {
            self.write(len as u64, 8)
        } else {
            self.write(0x83, 8)?;
            self.write(len as u64, 32)
        }
    }

    pub fn write_packed_u32(&mut self, value: u32) -> Result<()> {
        self.write(0b11, 2)?;
        self.write(value as u64, 32)
    }

    pub fn write_packed_u64(&mut self, value: u64) -> Result<()> {
        self.write(0b111, 3)?;
        self.write(value, 64)
    }

    pub fn write_packed_string(&mut self, s: &str) -> Result<()> {
        self.write_packed_length(s.len() as u32)?;
        self.write_aligned(s.as_bytes())
    }

    pub fn write_null_terminated_string(&mut self, s: &str) -> Result<()> {
        for byte in s.as_bytes() {
            self.write(*byte as u64, 8)?;
        }
        self.write(0, 8)
    }

    pub fn write_optional<T>(
        &mut self,
        value: &Option<T>,
        write_t: impl FnOnce(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        self.write_bit(value.is_some())?;
        if let Some(v) = value {
            write_t(self, v)?;
        }
        Ok(())
    }

    pub fn write_vector<T>(
        &mut self,
        items: &[T],
        mut write_t: impl FnMut(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        self.write_packed_length(items.len() as u32)?;
        for item in items {
            write_t(self, item)?;
        }
        Ok(())
    }

    /// Pads the current partial byte with zeros and writes it.
    pub fn flush(&mut self) -> Result<()> {
        self.bs
            .byte_align()
            .map_err(|e| IabError::IoFail(e.to_string()))
    }

    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        self.flush()?;
        Ok(self.bs.into_writer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_round_trip() {
        for n in 1..=32u32 {
            let mut w = BitWriter::new();
            let value = ((1u64 << n) - 1) / 2;
            w.write(value, n).unwrap();
            let bytes = w.into_bytes().unwrap();
            let mut r = BitReader::new(&bytes);
            assert_eq!(r.read(n).unwrap(), value);
        }
    }

    #[test]
    fn packed_length_round_trip_and_single_byte_threshold() {
        for &x in &[0u32, 1, 127, 128, 200, 65535, 1 << 20] {
            let mut w = BitWriter::new();
            w.write_packed_length(x).unwrap();
            let bytes = w.into_bytes().unwrap();
            assert_eq!(bytes.len(), if x < 128 { 1 } else { 5 });
            let mut r = BitReader::new(&bytes);
            assert_eq!(r.read_packed_length().unwrap(), x);
        }
    }

    #[test]
    fn plex_round_trip_never_writes_all_ones_as_terminal() {
        for &x in &[0u64, 1, 14, 15, 16, 254, 255, 256, 65535, 1 << 20] {
            let mut w = BitWriter::new();
            w.write_plex(x, 4).unwrap();
            let bytes = w.into_bytes().unwrap();
            let mut r = BitReader::new(&bytes);
            assert_eq!(r.read_plex(4).unwrap(), x);
        }
    }

    #[test]
    fn write_rejects_values_too_wide_for_field() {
        let mut w = BitWriter::new();
        assert!(w.write(16, 4).is_err());
    }

    #[test]
    fn read_zero_bits_is_a_no_op() {
        let bytes = [0xAAu8];
        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read(0).unwrap(), 0);
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn sync_miss_restores_position_and_reports_end_of_stream() {
        let bytes = [0x00u8, 0x01, 0x02, 0x03];
        let mut r = BitReader::new(&bytes);
        r.skip(8).unwrap();
        let before = r.position();
        let err = r.sync(&[0xFF, 0xFF], None).unwrap_err();
        assert!(matches!(err, IabError::EndOfStream(_)));
        assert_eq!(r.position(), before);
    }

    #[test]
    fn optional_parameter_round_trip() {
        let mut w = BitWriter::new();
        w.write_optional(&Some(42u64), |w, v| w.write(*v, 8)).unwrap();
        w.write_optional(&None::<u64>, |w, v| w.write(*v, 8)).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read_optional(|r| r.read(8)).unwrap(), Some(42));
        assert_eq!(r.read_optional(|r| r.read(8)).unwrap(), None);
    }

    #[test]
    fn vector_round_trip() {
        let mut w = BitWriter::new();
        w.write_vector(&[1u64, 2, 3], |w, v| w.write(*v, 8)).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        let items = r.read_vector(|r| r.read(8)).unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn crc_tee_observes_writes_and_matches_reader_replay() {
        let mut w = BitWriter::new();
        w.attach_crc();
        w.write(0xABu64, 8).unwrap();
        w.write(0xCDu64, 8).unwrap();
        let write_crc = w.take_crc().unwrap();
        let bytes = w.into_bytes().unwrap();

        let mut r = BitReader::new(&bytes);
        r.attach_crc();
        let _ = r.read(8).unwrap();
        let _ = r.read(8).unwrap();
        let read_crc = r.take_crc().unwrap();

        assert_eq!(write_crc, read_crc);
    }

    #[test]
    fn peek_does_not_advance_or_double_count_crc() {
        let bytes = [0xAB, 0xCD];
        let mut r = BitReader::new(&bytes);
        r.attach_crc();
        let peeked = r.peek(8).unwrap();
        assert_eq!(peeked, 0xAB);
        assert_eq!(r.position(), 0);
        let read = r.read(8).unwrap();
        assert_eq!(read, 0xAB);

        let mut baseline = BitReader::new(&bytes[..1]);
        baseline.attach_crc();
        let _ = baseline.read(8).unwrap();
        assert_eq!(r.take_crc(), baseline.take_crc());
    }
}
