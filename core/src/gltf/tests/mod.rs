//! Integration tests assembling GLB bytes in code.

use crate::gltf::glb::{CHUNK_BIN, CHUNK_JSON, GLB_MAGIC, GLB_VERSION};


/// Builds GLB containers for tests: JSON chunk padded with spaces, BIN
/// chunk padded with zeros, both to 4-byte alignment.
pub(crate) struct GlbBuilder {
    json: String,
    chunks: Vec<(u32, Vec<u8>)>,
}

impl GlbBuilder {
    pub fn new(json: &serde_json::Value) -> Self {
        Self {
            json: json.to_string(),
            chunks: Vec::new(),
        }
    }

    /// Appends a BIN chunk.
    pub fn with_bin(self, bin: Vec<u8>) -> Self {
        self.with_chunk(CHUNK_BIN, bin)
    }

    /// Appends an arbitrary chunk, for malformed-container tests.
    pub fn with_chunk(mut self, chunk_type: u32, payload: Vec<u8>) -> Self {
        self.chunks.push((chunk_type, payload));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut body = Vec::new();
        push_chunk(&mut body, CHUNK_JSON, self.json.as_bytes(), b' ');
        for (chunk_type, payload) in &self.chunks {
            push_chunk(&mut body, *chunk_type, payload, 0);
        }

        let mut out = Vec::with_capacity(12 + body.len());
        out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
        out.extend_from_slice(&GLB_VERSION.to_le_bytes());
        out.extend_from_slice(&((12 + body.len()) as u32).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }
}

fn push_chunk(out: &mut Vec<u8>, chunk_type: u32, payload: &[u8], pad: u8) {
    let mut padded = payload.to_vec();
    while padded.len() % 4 != 0 {
        padded.push(pad);
    }
    out.extend_from_slice(&(padded.len() as u32).to_le_bytes());
    out.extend_from_slice(&chunk_type.to_le_bytes());
    out.extend_from_slice(&padded);
}

/// Little-endian bytes of f32 values.
pub(crate) fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Little-endian bytes of u16 values.
pub(crate) fn u16_bytes(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}
