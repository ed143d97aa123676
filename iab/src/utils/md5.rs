//! MD5 payload hash accumulator, the second kind of stream "tee" observer in §4.1.
//!
//! Mirrors the lifecycle of [`crate::utils::crc::Crc16Accumulator`] (`start`/`stop`/
//! `pause`/`resume`/`accumulate`) so the bitstream reader/writer can attach either one
//! interchangeably, matching the "exactly one of either kind" contract in §4.1. The
//! transform itself is the standard RFC 1321 algorithm; only the byte-oriented
//! accumulate/pause/resume wrapper around it is specific to this crate.

const S: [u32; 64] = [
    7, 12, 17, 22, 7, 12, 17, 22, 7, 12, 17, 22, 7, 12, 17, 22, 5, 9, 14, 20, 5, 9, 14, 20, 5, 9,
    14, 20, 5, 9, 14, 20, 4, 11, 16, 23, 4, 11, 16, 23, 4, 11, 16, 23, 4, 11, 16, 23, 6, 10, 15,
    21, 6, 10, 15, 21, 6, 10, 15, 21, 6, 10, 15, 21,
];

const K: [u32; 64] = [
    0xd76aa478, 0xe8c7b756, 0x242070db, 0xc1bdceee, 0xf57c0faf, 0x4787c62a, 0xa8304613,
    0xfd469501, 0x698098d8, 0x8b44f7af, 0xffff5bb1, 0x895cd7be, 0x6b901122, 0xfd987193,
    0xa679438e, 0x49b40821, 0xf61e2562, 0xc040b340, 0x265e5a51, 0xe9b6c7aa, 0xd62f105d,
    0x02441453, 0xd8a1e681, 0xe7d3fbc8, 0x21e1cde6, 0xc33707d6, 0xf4d50d87, 0x455a14ed,
    0xa9e3e905, 0xfcefa3f8, 0x676f02d9, 0x8d2a4c8a, 0xfffa3942, 0x8771f681, 0x6d9d6122,
    0xfde5380c, 0xa4beea44, 0x4bdecfa9, 0xf6bb4b60, 0xbebfbc70, 0x289b7ec6, 0xeaa127fa,
    0xd4ef3085, 0x04881d05, 0xd9d4d039, 0xe6db99e5, 0x1fa27cf8, 0xc4ac5665, 0xf4292244,
    0x432aff97, 0xab9423a7, 0xfc93a039, 0x655b59c3, 0x8f0ccc92, 0xffeff47d, 0x85845dd1,
    0x6fa87e4f, 0xfe2ce6e0, 0xa3014314, 0x4e0811a1, 0xf7537e82, 0xbd3af235, 0x2ad7d2bb,
    0xeb86d391,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Stopped,
    Started,
    Paused,
}

#[derive(Debug, Clone)]
pub struct Md5Accumulator {
    buf: [u32; 4],
    bit_count: u64,
    block: [u8; 64],
    block_len: usize,
    state: State,
}

impl Default for Md5Accumulator {
    fn default() -> Self {
        Self {
            buf: [0x67452301, 0xefcdab89, 0x98badcfe, 0x10325476],
            bit_count: 0,
            block: [0; 64],
            block_len: 0,
            state: State::Stopped,
        }
    }
}

impl Md5Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        *self = Self::default();
        self.state = State::Started;
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Started | State::Paused)
    }

    pub fn pause(&mut self) {
        if self.state == State::Started {
            self.state = State::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == State::Paused {
            self.state = State::Started;
        }
    }

    /// Folds `bytes` into the running hash. A no-op when stopped or paused.
    pub fn accumulate(&mut self, bytes: &[u8]) {
        if self.state != State::Started {
            return;
        }

        self.bit_count += (bytes.len() as u64) * 8;

        let mut input = bytes;
        if self.block_len > 0 {
            let take = (64 - self.block_len).min(input.len());
            self.block[self.block_len..self.block_len + take].copy_from_slice(&input[..take]);
            self.block_len += take;
            input = &input[take..];

            if self.block_len == 64 {
                let block = self.block;
                self.transform(&block);
                self.block_len = 0;
            }
        }

        let mut chunks = input.chunks_exact(64);
        for chunk in &mut chunks {
            self.transform(chunk.try_into().unwrap());
        }
        let remainder = chunks.remainder();
        self.block[..remainder.len()].copy_from_slice(remainder);
        self.block_len = remainder.len();
    }

    /// Finalises the digest without altering the running state (`stop()` also
    /// transitions to `Stopped`; this can be called mid-stream to peek the digest).
    fn digest_from(&self) -> [u8; 16] {
        let mut copy = self.clone();
        let bit_count = copy.bit_count;

        let mut pad = vec![0x80u8];
        let mod_len = ((copy.block_len + 1) % 64) as i64;
        let zeros = if mod_len <= 56 {
            56 - mod_len
        } else {
            120 - mod_len
        };
        pad.extend(std::iter::repeat_n(0u8, zeros as usize));
        pad.extend_from_slice(&bit_count.to_le_bytes());

        // Padding bytes must not re-count into bit_count bookkeeping.
        copy.state = State::Started;
        let saved = copy.bit_count;
        copy.accumulate(&pad);
        copy.bit_count = saved;

        let mut out = [0u8; 16];
        for (i, word) in copy.buf.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    pub fn stop(&mut self) -> [u8; 16] {
        let digest = self.digest_from();
        self.state = State::Stopped;
        digest
    }

    fn transform(&mut self, block: &[u8; 64]) {
        let mut m = [0u32; 16];
        for (i, chunk) in block.chunks_exact(4).enumerate() {
            m[i] = u32::from_le_bytes(chunk.try_into().unwrap());
        }

        let [mut a, mut b, mut c, mut d] = self.buf;

        for i in 0..64 {
            let (f, g) = match i {
                0..=15 => ((b & c) | (!b & d), i),
                16..=31 => ((d & b) | (!d & c), (5 * i + 1) % 16),
                32..=47 => (b ^ c ^ d, (3 * i + 5) % 16),
                _ => (c ^ (b | !d), (7 * i) % 16),
            };

            let f = f
                .wrapping_add(a)
                .wrapping_add(K[i])
                .wrapping_add(m[g]);
            a = d;
            d = c;
            c = b;
            b = b.wrapping_add(f.rotate_left(S[i]));
        }

        self.buf[0] = self.buf[0].wrapping_add(a);
        self.buf[1] = self.buf[1].wrapping_add(b);
        self.buf[2] = self.buf[2].wrapping_add(c);
        self.buf[3] = self.buf[3].wrapping_add(d);
    }
}

/// One-shot convenience wrapper for tests and fixture generation.
pub fn md5(bytes: &[u8]) -> [u8; 16] {
    let mut acc = Md5Accumulator::new();
    acc.start();
    acc.accumulate(bytes);
    acc.stop()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn empty_string_digest() {
        assert_eq!(hex(&md5(b"")), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn known_vector() {
        assert_eq!(
            hex(&md5(b"The quick brown fox jumps over the lazy dog")),
            "9e107d9d372bb6826bd81d3542a419d6"
        );
    }

    #[test]
    fn incremental_accumulate_matches_one_shot() {
        let mut acc = Md5Accumulator::new();
        acc.start();
        acc.accumulate(b"The quick brown ");
        acc.accumulate(b"fox jumps over the lazy dog");
        assert_eq!(hex(&acc.stop()), hex(&md5(b"The quick brown fox jumps over the lazy dog")));
    }

    #[test]
    fn pause_resume_skips_paused_bytes() {
        let mut a = Md5Accumulator::new();
        a.start();
        a.accumulate(b"abc");
        a.pause();
        a.accumulate(b"IGNORED");
        a.resume();
        a.accumulate(b"def");

        assert_eq!(hex(&a.stop()), hex(&md5(b"abcdef")));
    }
}
