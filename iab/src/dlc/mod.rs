//! Differential Lossless Coding (§3 C3): the codec behind `AudioDataDLC`.
//!
//! - [`filters`]: fixed FIR coefficient tables for the 96 kHz band split.
//! - [`predictor`]: the lattice-synthesis AR predictor region.
//! - [`subblock`]: per-sub-block region framing shared by encode and decode.
//! - [`encode`] / [`decode`]: the simple PCM-residual encoder and the full decoder.

pub mod decode;
pub mod encode;
pub mod filters;
pub mod predictor;
pub mod subblock;
