//! `iabd parse`: walks every frame in a concatenated bitstream and prints a
//! structural summary, mirroring the teacher's `cmd_info` "analyze, don't
//! decode" pass.

use std::fs;

use iab::process::parse::parse_frame;
use iab::structs::element::Element;
use iab::utils::errors::IabError;

use super::command::ParseArgs;
use crate::CliError;

pub fn cmd_parse(args: &ParseArgs, strict: bool) -> Result<(), CliError> {
    let bytes = fs::read(&args.input).map_err(|e| CliError::Usage(e.to_string()))?;

    let mut offset = 0usize;
    let mut frame_index = 0usize;
    let mut total_warnings = 0usize;

    while offset < bytes.len() {
        let outcome = parse_frame(&bytes[offset..], true).map_err(CliError::Bitstream)?;
        let frame = &outcome.frame;

        let mut beds = 0;
        let mut objects = 0;
        let mut essence = 0;
        for element in &frame.elements {
            match element {
                Element::Bed(_) => beds += 1,
                Element::Object(_) => objects += 1,
                Element::DlcEssence(_) | Element::PcmEssence(_) => essence += 1,
                _ => {}
            }
        }

        log::info!(
            "frame {frame_index}: {:?}@{}Hz, {beds} bed(s), {objects} object(s), {essence} essence element(s), {} warning(s)",
            frame.frame_rate,
            frame.sample_rate.hz(),
            outcome.warnings.len(),
        );
        for warning in &outcome.warnings {
            log::warn!("  {warning}");
        }
        total_warnings += outcome.warnings.len();
        if strict && !outcome.warnings.is_empty() {
            return Err(CliError::Bitstream(IabError::DataInvalid(format!(
                "frame {frame_index} raised {} warning(s) under --strict",
                outcome.warnings.len()
            ))));
        }

        offset += frame_byte_length(&bytes[offset..])?;
        frame_index += 1;
    }

    log::info!("parsed {frame_index} frame(s), {total_warnings} warning(s) total");
    Ok(())
}

/// Re-derives how many bytes `parse_frame` actually consumed, by repacking the
/// parsed frame: `Frame` carries no outer length prefix of its own (§3), so the
/// only way to find the next frame's start in a concatenated stream is to ask
/// the bit reader directly.
fn frame_byte_length(remaining: &[u8]) -> Result<usize, CliError> {
    let mut reader = iab::utils::bitstream_io::BitReader::new(remaining);
    iab::structs::frame::Frame::read(&mut reader, true).map_err(CliError::Bitstream)?;
    let bits = reader.position();
    Ok(((bits + 7) / 8) as usize)
}
