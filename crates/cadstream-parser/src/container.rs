//! Binary container framing.
//!
//! Layout (little-endian):
//!
//! ```text
//! header  magic u32 | version u32 | total length u32
//! chunk   length u32 | type u32 | payload, padded to 4 bytes
//! ```
//!
//! A container holds one JSON chunk followed by an optional binary chunk.

use nom::bytes::complete::take;
use nom::number::complete::le_u32;
use nom::sequence::tuple;
use nom::IResult;

use crate::error::{ParseError, Result};

/// Container magic number ("glTF" in little-endian).
pub const MAGIC: u32 = 0x46546C67;
/// Supported container version.
pub const VERSION: u32 = 2;
/// JSON chunk type ("JSON" in little-endian).
pub const CHUNK_JSON: u32 = 0x4E4F534A;
/// Binary chunk type ("BIN\0" in little-endian).
pub const CHUNK_BIN: u32 = 0x004E4942;

const HEADER_LENGTH: usize = 12;
const CHUNK_HEADER_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: u32,
    pub version: u32,
    pub length: u32,
}

#[derive(Debug, Clone, Copy)]
struct Chunk<'a> {
    kind: u32,
    data: &'a [u8],
}

/// The two payloads of a container, borrowed from the input.
#[derive(Debug, Clone, Copy)]
pub struct Container<'a> {
    pub json: &'a [u8],
    pub bin: &'a [u8],
}

fn padding(length: usize) -> usize {
    (4 - length % 4) % 4
}

fn header(input: &[u8]) -> IResult<&[u8], Header> {
    let (rest, (magic, version, length)) = tuple((le_u32, le_u32, le_u32))(input)?;
    Ok((rest, Header { magic, version, length }))
}

fn chunk(input: &[u8]) -> IResult<&[u8], Chunk<'_>> {
    let (rest, (length, kind)) = tuple((le_u32, le_u32))(input)?;
    let (rest, data) = take(length as usize)(rest)?;
    // The last chunk may omit its padding
    let (rest, _) = take(padding(data.len()).min(rest.len()))(rest)?;
    Ok((rest, Chunk { kind, data }))
}

/// Split a container into its JSON and binary payloads.
pub fn read_container(data: &[u8]) -> Result<Container<'_>> {
    let (_, header) = header(data).map_err(|_| {
        ParseError::invalid_model(format!(
            "{} bytes is too short for a container header",
            data.len()
        ))
    })?;

    if header.magic != MAGIC {
        return Err(ParseError::invalid_model(format!(
            "bad magic {:#010x}",
            header.magic
        )));
    }
    if header.version != VERSION {
        return Err(ParseError::invalid_model(format!(
            "container version {} not supported",
            header.version
        )));
    }

    let length = header.length as usize;
    if length < HEADER_LENGTH || length > data.len() {
        return Err(ParseError::invalid_model(format!(
            "declared length {} does not fit the {} bytes received",
            length,
            data.len()
        )));
    }

    let mut rest = &data[HEADER_LENGTH..length];
    let mut json = None;
    let mut bin = None;

    while !rest.is_empty() {
        let offset = length - rest.len();
        let (next, chunk) = chunk(rest).map_err(|_| {
            ParseError::invalid_model(format!("truncated chunk at byte {offset}"))
        })?;
        match chunk.kind {
            CHUNK_JSON if json.is_none() => json = Some(chunk.data),
            CHUNK_BIN if bin.is_none() => bin = Some(chunk.data),
            other => log::trace!("skipping chunk {other:#010x} at byte {offset}"),
        }
        rest = next;
    }

    let json = json.ok_or_else(|| ParseError::invalid_model("container has no JSON chunk"))?;
    Ok(Container {
        json,
        bin: bin.unwrap_or(&[]),
    })
}

/// Frame a JSON and a binary payload as a container.
pub fn write_container(json: &[u8], bin: &[u8]) -> Vec<u8> {
    let json_padded = json.len() + padding(json.len());
    let bin_padded = bin.len() + padding(bin.len());
    let mut total = HEADER_LENGTH + CHUNK_HEADER_LENGTH + json_padded;
    if !bin.is_empty() {
        total += CHUNK_HEADER_LENGTH + bin_padded;
    }

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&MAGIC.to_le_bytes());
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());

    out.extend_from_slice(&(json_padded as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(json);
    // JSON is padded with spaces
    out.resize(out.len() + padding(json.len()), b' ');

    if !bin.is_empty() {
        out.extend_from_slice(&(bin_padded as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(bin);
        out.resize(out.len() + padding(bin.len()), 0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_written_container() {
        let bytes = write_container(br#"{"a":1}"#, &[1, 2, 3, 4, 5]);
        assert_eq!(bytes.len() % 4, 0);
        let container = read_container(&bytes).unwrap();
        // JSON padding is whitespace, so it still parses
        let value: serde_json::Value = serde_json::from_slice(container.json).unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(&container.bin[..5], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_json_only_container() {
        let bytes = write_container(b"{}", &[]);
        let container = read_container(&bytes).unwrap();
        assert!(container.bin.is_empty());
    }

    #[test]
    fn test_short_input() {
        let err = read_container(&[0x67, 0x6C]).unwrap_err();
        assert!(err.is_invalid_model());
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = write_container(b"{}", &[]);
        bytes[0] = b'X';
        assert!(read_container(&bytes).unwrap_err().is_invalid_model());
    }

    #[test]
    fn test_bad_version() {
        let mut bytes = write_container(b"{}", &[]);
        bytes[4] = 1;
        let err = read_container(&bytes).unwrap_err();
        assert!(matches!(err, ParseError::InvalidModel(ref m) if m.contains("version 1")));
    }

    #[test]
    fn test_truncated_chunk() {
        let bytes = write_container(b"{}", &[9; 16]);
        let mut truncated = bytes[..bytes.len() - 8].to_vec();
        let length = truncated.len() as u32;
        truncated[8..12].copy_from_slice(&length.to_le_bytes());
        assert!(read_container(&truncated).unwrap_err().is_invalid_model());
    }

    #[test]
    fn test_declared_length_past_end() {
        let mut bytes = write_container(b"{}", &[]);
        bytes[8..12].copy_from_slice(&1000u32.to_le_bytes());
        assert!(read_container(&bytes).unwrap_err().is_invalid_model());
    }

    #[test]
    fn test_missing_json_chunk() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC.to_le_bytes());
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&20u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        assert!(read_container(&bytes).unwrap_err().is_invalid_model());
    }
}
