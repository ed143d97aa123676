//! `AuthoringToolInfo` and `UserData` (§3): the two free-form, non-audio element
//! kinds a frame may carry, used for provenance and private payloads.

use crate::utils::bitstream_io::{BitReader, BitWriter};
use crate::utils::errors::{IabError, Result};

#[derive(Debug, Clone)]
pub struct AuthoringToolInfo {
    pub tool_name: String,
    pub tool_version: String,
    pub info_text: Option<String>,
}

impl AuthoringToolInfo {
    pub fn read(reader: &mut BitReader) -> Result<Self> {
        let tool_name = reader.read_packed_string()?;
        let tool_version = reader.read_packed_string()?;
        let info_text = reader.read_optional(|r| r.read_null_terminated_string())?;
        Ok(Self {
            tool_name,
            tool_version,
            info_text,
        })
    }

    pub fn write(&self, writer: &mut BitWriter) -> Result<()> {
        writer.write_packed_string(&self.tool_name)?;
        writer.write_packed_string(&self.tool_version)?;
        writer.write_optional(&self.info_text, |w, s| w.write_null_terminated_string(s))?;
        Ok(())
    }
}

/// A private, application-defined payload keyed by a 16-byte identifier (§3: "an
/// escape hatch for vendor-private data that must survive a round trip untouched").
#[derive(Debug, Clone)]
pub struct UserData {
    pub id: [u8; 16],
    pub payload: Vec<u8>,
}

impl UserData {
    pub fn read(reader: &mut BitReader) -> Result<Self> {
        let id_bytes = reader.read_aligned(16)?;
        let id: [u8; 16] = id_bytes
            .try_into()
            .map_err(|_| IabError::DataInvalid("user data ID was not 16 bytes".into()))?;
        let len = reader.read_packed_length()? as usize;
        let payload = reader.read_aligned(len)?;
        Ok(Self { id, payload })
    }

    pub fn write(&self, writer: &mut BitWriter) -> Result<()> {
        writer.write_aligned(&self.id)?;
        writer.write_packed_length(self.payload.len() as u32)?;
        writer.write_aligned(&self.payload)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authoring_tool_info_round_trips() {
        let info = AuthoringToolInfo {
            tool_name: "encoder".into(),
            tool_version: "1.0".into(),
            info_text: Some("built from a test fixture".into()),
        };
        let mut w = BitWriter::new();
        info.write(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        let back = AuthoringToolInfo::read(&mut r).unwrap();
        assert_eq!(back.tool_name, "encoder");
        assert_eq!(back.info_text.as_deref(), Some("built from a test fixture"));
    }

    #[test]
    fn user_data_round_trips() {
        let data = UserData {
            id: [7u8; 16],
            payload: vec![0xDE, 0xAD, 0xBE, 0xEF],
        };
        let mut w = BitWriter::new();
        data.write(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        let back = UserData::read(&mut r).unwrap();
        assert_eq!(back.id, [7u8; 16]);
        assert_eq!(back.payload, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }
}
