//! `parse_frame` (§C2 "Packer and parser entry points"): the inverse of
//! [`crate::process::pack::pack_frame`].

use crate::structs::frame::Frame;
use crate::utils::bitstream_io::BitReader;
use crate::utils::errors::{IabWarning, Result};

/// A successfully parsed frame plus any non-fatal diagnostics collected along the
/// way (§7: unrecognised elements are counted and skipped, never raised as errors).
#[derive(Debug)]
pub struct ParseOutcome {
    pub frame: Frame,
    pub warnings: Vec<IabWarning>,
}

/// Parses one frame out of `bytes`. `fail_on_version_mismatch` (default `true`)
/// rejects a frame whose version differs from [`crate::structs::frame::CURRENT_VERSION`]
/// rather than attempting a best-effort parse.
pub fn parse_frame(bytes: &[u8], fail_on_version_mismatch: bool) -> Result<ParseOutcome> {
    let mut reader = BitReader::new(bytes);
    let frame = Frame::read(&mut reader, fail_on_version_mismatch)?;
    frame.check_invariants()?;

    let mut warnings = Vec::new();
    for element in &frame.elements {
        if let crate::structs::element::Element::Unknown { tag, .. } = element {
            warnings.push(IabWarning::UnknownElementSkipped { tag: *tag });
        }
    }

    Ok(ParseOutcome { frame, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::pack::pack_frame;
    use crate::structs::frame::{FrameRate, SampleRate};

    #[test]
    fn parse_round_trips_an_empty_frame() {
        let frame = Frame::new(FrameRate::Fps24, SampleRate::Hz48000);
        let bytes = pack_frame(&frame).unwrap();
        let outcome = parse_frame(&bytes, true).unwrap();
        assert_eq!(outcome.frame.frame_rate, FrameRate::Fps24);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn parse_counts_unknown_elements_without_failing() {
        use crate::structs::element::Element;
        let mut frame = Frame::new(FrameRate::Fps24, SampleRate::Hz48000);
        frame.elements.push(Element::Unknown {
            tag: 99,
            bytes: vec![1, 2, 3],
        });
        let bytes = pack_frame(&frame).unwrap();
        let outcome = parse_frame(&bytes, true).unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0], IabWarning::UnknownElementSkipped { tag: 99 });
    }
}
