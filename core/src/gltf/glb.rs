//! Binary glTF (`.glb`) container reader.
//!
//! Layout: a 12-byte header (magic, version, total length) followed by
//! length-prefixed chunks of `[u32 length][u32 type][payload]`. Exactly one
//! JSON chunk must occur and at most one BIN chunk may follow. Validation is
//! strict: unknown chunk types and duplicate chunks are fatal rather than
//! skipped.

use super::error::GltfError;

/// GLB magic number, ASCII "glTF" little-endian.
pub const GLB_MAGIC: u32 = 0x4654_6C67;

/// GLB container version this reader supports.
pub const GLB_VERSION: u32 = 2;

/// JSON chunk type, ASCII "JSON".
pub const CHUNK_JSON: u32 = 0x4E4F_534A;

/// Binary chunk type, ASCII "BIN\0".
pub const CHUNK_BIN: u32 = 0x004E_4942;

/// Parsed GLB container: slices into the input, no payload copies.
#[derive(Debug)]
pub struct Glb<'a> {
    /// The JSON chunk payload (may carry trailing space padding).
    pub json: &'a [u8],
    /// The binary chunk payload, if present.
    pub bin: Option<&'a [u8]>,
}

/// Whether the data starts with the GLB magic number.
pub fn is_binary(data: &[u8]) -> bool {
    data.len() >= 4 && read_u32(data, 0) == GLB_MAGIC
}

/// Parses a GLB container, validating header and chunk framing.
pub fn parse(data: &[u8]) -> Result<Glb<'_>, GltfError> {
    if !is_binary(data) {
        return Err(GltfError::NotBinaryFormat);
    }
    if data.len() < 12 {
        return Err(GltfError::ChunkIncomplete);
    }
    let version = read_u32(data, 4);
    if version != GLB_VERSION {
        return Err(GltfError::UnsupportedVersion(version));
    }
    let total_length = read_u32(data, 8) as usize;
    if total_length > data.len() {
        return Err(GltfError::ChunkIncomplete);
    }

    let mut offset = 12;
    let mut json = None;
    let mut bin = None;

    while offset < total_length {
        if offset + 8 > total_length {
            return Err(GltfError::ChunkIncomplete);
        }
        let chunk_length = read_u32(data, offset) as usize;
        let chunk_type = read_u32(data, offset + 4);
        let payload_start = offset + 8;
        let payload_end = payload_start
            .checked_add(chunk_length)
            .ok_or(GltfError::ChunkIncomplete)?;
        if payload_end > total_length {
            return Err(GltfError::ChunkIncomplete);
        }
        let payload = &data[payload_start..payload_end];

        match chunk_type {
            CHUNK_JSON => {
                if json.is_some() {
                    return Err(GltfError::DuplicateJsonChunk);
                }
                json = Some(payload);
            }
            CHUNK_BIN => {
                if bin.is_some() {
                    return Err(GltfError::DuplicateBinaryChunk);
                }
                bin = Some(payload);
            }
            other => return Err(GltfError::UnknownChunkType(other)),
        }

        offset = payload_end;
    }

    match json {
        Some(json) => Ok(Glb { json, bin }),
        None => Err(GltfError::MissingJsonChunk),
    }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_chunk(out: &mut Vec<u8>, chunk_type: u32, payload: &[u8], pad: u8) {
        let mut padded = payload.to_vec();
        while padded.len() % 4 != 0 {
            padded.push(pad);
        }
        out.extend_from_slice(&(padded.len() as u32).to_le_bytes());
        out.extend_from_slice(&chunk_type.to_le_bytes());
        out.extend_from_slice(&padded);
    }

    fn glb_bytes(chunks: &[(u32, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (ty, payload) in chunks {
            let pad = if *ty == CHUNK_JSON { b' ' } else { 0 };
            push_chunk(&mut body, *ty, payload, pad);
        }
        let mut out = Vec::new();
        out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
        out.extend_from_slice(&GLB_VERSION.to_le_bytes());
        out.extend_from_slice(&((12 + body.len()) as u32).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    const MINIMAL_JSON: &[u8] = br#"{"asset":{"version":"2.0"}}"#;

    #[test]
    fn parses_json_only_container() {
        let data = glb_bytes(&[(CHUNK_JSON, MINIMAL_JSON)]);
        let glb = parse(&data).unwrap();
        assert!(glb.bin.is_none());
        assert!(glb.json.starts_with(MINIMAL_JSON));
    }

    #[test]
    fn parses_json_and_bin() {
        let data = glb_bytes(&[(CHUNK_JSON, MINIMAL_JSON), (CHUNK_BIN, &[1, 2, 3, 4])]);
        let glb = parse(&data).unwrap();
        assert_eq!(glb.bin.unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut data = glb_bytes(&[(CHUNK_JSON, MINIMAL_JSON)]);
        data[0] = b'x';
        assert!(matches!(parse(&data), Err(GltfError::NotBinaryFormat)));
        assert!(!is_binary(&data));
    }

    #[test]
    fn rejects_wrong_version() {
        let mut data = glb_bytes(&[(CHUNK_JSON, MINIMAL_JSON)]);
        data[4..8].copy_from_slice(&1u32.to_le_bytes());
        assert!(matches!(parse(&data), Err(GltfError::UnsupportedVersion(1))));
    }

    #[test]
    fn rejects_duplicate_bin_chunk() {
        let data = glb_bytes(&[
            (CHUNK_JSON, MINIMAL_JSON),
            (CHUNK_BIN, &[1, 2, 3, 4]),
            (CHUNK_BIN, &[5, 6, 7, 8]),
        ]);
        assert!(matches!(parse(&data), Err(GltfError::DuplicateBinaryChunk)));
    }

    #[test]
    fn rejects_duplicate_json_chunk() {
        let data = glb_bytes(&[(CHUNK_JSON, MINIMAL_JSON), (CHUNK_JSON, MINIMAL_JSON)]);
        assert!(matches!(parse(&data), Err(GltfError::DuplicateJsonChunk)));
    }

    #[test]
    fn rejects_unknown_chunk_type() {
        let data = glb_bytes(&[(CHUNK_JSON, MINIMAL_JSON), (0x1234_5678, &[0, 0, 0, 0])]);
        assert!(matches!(
            parse(&data),
            Err(GltfError::UnknownChunkType(0x1234_5678))
        ));
    }

    #[test]
    fn rejects_missing_json_chunk() {
        let data = glb_bytes(&[(CHUNK_BIN, &[1, 2, 3, 4])]);
        assert!(matches!(parse(&data), Err(GltfError::MissingJsonChunk)));
    }

    #[test]
    fn rejects_truncated_chunk() {
        let mut data = glb_bytes(&[(CHUNK_JSON, MINIMAL_JSON)]);
        // Declare a chunk length past the end of the container.
        let total = data.len();
        data[12..16].copy_from_slice(&(total as u32 * 2).to_le_bytes());
        assert!(matches!(parse(&data), Err(GltfError::ChunkIncomplete)));
    }

    #[test]
    fn rejects_truncated_header() {
        let mut data = GLB_MAGIC.to_le_bytes().to_vec();
        data.extend_from_slice(&GLB_VERSION.to_le_bytes());
        assert!(matches!(parse(&data), Err(GltfError::ChunkIncomplete)));
    }
}
