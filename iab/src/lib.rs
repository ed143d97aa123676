//! Parser, encoder, DLC codec and VBAP renderer for Immersive Audio Bitstreams
//! (SMPTE ST 2098-2).
//!
//! ## Bitstream organization
//!
//! A frame is a flat sequence of tagged elements: bed and object definitions carry
//! the scene description, `AudioDataDLC`/`AudioDataPCM` elements carry the essence
//! audio, and every channel or object refers to its essence by an audio-data-ID
//! rather than a direct pointer.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use iab::process::{pack::pack_frame, parse::parse_frame};
//!
//! let bytes: Vec<u8> = std::fs::read("frame.iab").unwrap();
//! let outcome = parse_frame(&bytes, true)?;
//! let round_tripped = pack_frame(&outcome.frame)?;
//! # Ok::<(), iab::utils::errors::IabError>(())
//! ```

/// Bit-level I/O primitives and the shared error taxonomy.
///
/// - **Bitstream I/O** ([`utils::bitstream_io`]): big-endian bit reader/writer plus
///   the `Plex`/`PackedLength`/`PackedUInt`/`Vector`/`OptionalParameter` composites.
/// - **CRC** ([`utils::crc`]): bit-serial CRC16-CCITT accumulator.
/// - **MD5** ([`utils::md5`]): RFC 1321 digest accumulator.
/// - **Errors** ([`utils::errors`]): the flat `IabError`/`IabWarning` taxonomy.
pub mod utils;

/// The element tree's concrete types: frames, beds, objects and essence.
pub mod structs;

/// Differential Lossless Coding: the 48 kHz/96 kHz codec behind `AudioDataDLC`.
pub mod dlc;

/// Frame-level packing and parsing entry points.
pub mod process;

/// VBAP-based spatial renderer. Requires the `config` feature (on by default),
/// since the renderer has no sensible construction path without a loudspeaker
/// configuration to drive it.
#[cfg(feature = "config")]
pub mod render;
