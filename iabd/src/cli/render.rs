//! `iabd render`: parses every frame in a bitstream, renders each against a
//! loudspeaker configuration and writes the interleaved result to a WAV file.

use iab::render::config::RendererConfig;
use iab::render::Renderer;
use iab::process::parse::parse_frame;
use iab::utils::bitstream_io::BitReader;
use iab::structs::frame::Frame;

use super::command::RenderArgs;
use crate::wav::WavWriter;
use crate::CliError;

const OUTPUT_BITS_PER_SAMPLE: u16 = 16;

pub fn cmd_render(args: &RenderArgs, strict: bool) -> Result<(), CliError> {
    let config = RendererConfig::load(&args.config).map_err(CliError::Config)?;
    let channel_count = config.output_count();
    let mut renderer = Renderer::new(config);

    let bytes = std::fs::read(&args.input).map_err(|e| CliError::Usage(e.to_string()))?;
    let mut offset = 0usize;
    let mut writer: Option<WavWriter> = None;
    let mut frame_index = 0usize;

    while offset < bytes.len() {
        let outcome = parse_frame(&bytes[offset..], true).map_err(CliError::Bitstream)?;
        offset += frame_byte_length(&bytes[offset..])?;

        let output = renderer.render_frame(&outcome.frame).map_err(CliError::Bitstream)?;
        for warning in &output.warnings {
            log::warn!("frame {frame_index}: {warning}");
        }
        if strict && !output.warnings.is_empty() {
            return Err(CliError::Bitstream(iab::utils::errors::IabError::DataInvalid(
                format!("frame {frame_index} raised a renderer warning under --strict"),
            )));
        }

        if writer.is_none() {
            let created = WavWriter::create(
                &args.output,
                outcome.frame.sample_rate.hz(),
                channel_count as u16,
                OUTPUT_BITS_PER_SAMPLE,
            )
            .map_err(|e| CliError::Usage(e.to_string()))?;
            writer = Some(created);
        }

        let block = interleave_i16(&output.channels);
        writer
            .as_mut()
            .unwrap()
            .write_block_i16(&block)
            .map_err(|e| CliError::Usage(e.to_string()))?;
        frame_index += 1;
    }

    match writer {
        Some(w) => w.finish().map_err(|e| CliError::Usage(e.to_string()))?,
        None => return Err(CliError::Usage("input bitstream contained no frames".into())),
    }

    log::info!("rendered {frame_index} frame(s) to {}", args.output.display());
    Ok(())
}

fn interleave_i16(channels: &[Vec<f32>]) -> Vec<i16> {
    let sample_count = channels.first().map(Vec::len).unwrap_or(0);
    let mut out = Vec::with_capacity(sample_count * channels.len());
    for i in 0..sample_count {
        for channel in channels {
            let clamped = channel[i].clamp(-1.0, 1.0);
            out.push((clamped * i16::MAX as f32) as i16);
        }
    }
    out
}

fn frame_byte_length(remaining: &[u8]) -> Result<usize, CliError> {
    let mut reader = BitReader::new(remaining);
    Frame::read(&mut reader, true).map_err(CliError::Bitstream)?;
    let bits = reader.position();
    Ok(((bits + 7) / 8) as usize)
}
