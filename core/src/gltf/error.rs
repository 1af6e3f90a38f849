//! Error types for glTF importing.

use crate::compute::Cancelled;

/// Fatal errors that abort a glTF import.
///
/// Per-primitive decode failures are not represented here; they are logged
/// to the import report and flagged on the result, while the rest of the
/// scene still imports.
#[derive(Debug)]
pub enum GltfError {
    /// The data does not start with the GLB magic number.
    NotBinaryFormat,
    /// The GLB container version is not 2.
    UnsupportedVersion(u32),
    /// The GLB container has no JSON chunk.
    MissingJsonChunk,
    /// The GLB container has more than one JSON chunk.
    DuplicateJsonChunk,
    /// The GLB container has more than one binary chunk.
    DuplicateBinaryChunk,
    /// A chunk declares a type outside the GLB specification.
    UnknownChunkType(u32),
    /// A chunk's declared length reads past the end of the data.
    ChunkIncomplete,
    /// The JSON chunk is not valid UTF-8.
    InvalidJsonText(std::str::Utf8Error),
    /// Failed to parse the glTF JSON document.
    JsonParsingFailed(serde_json::Error),
    /// The document requires an extension this importer does not support.
    ExtensionUnsupported(String),
    /// An embedded data-URI buffer could not be decoded.
    EmbedBufferLoadFailed(String),
    /// Error resolving buffer or buffer-view data.
    BufferError(String),
    /// Error resolving accessor metadata or data.
    AccessorError(String),
    /// A cross-reference in the document points outside its arrays.
    InvalidDocument(String),
    /// A node matrix cannot be decomposed into translation/rotation/scale.
    InvalidNodeTransform {
        /// Node index in the glTF document.
        node: usize,
    },
    /// An external buffer download failed or no provider was supplied.
    DownloadFailed {
        /// The buffer URI that was being fetched.
        uri: String,
        /// Host-readable failure description.
        message: String,
    },
    /// The import was cancelled at a checkpoint.
    Cancelled,
}

impl std::fmt::Display for GltfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotBinaryFormat => f.write_str("not a binary glTF container"),
            Self::UnsupportedVersion(version) => {
                write!(f, "unsupported glTF container version: {version}")
            }
            Self::MissingJsonChunk => f.write_str("GLB container has no JSON chunk"),
            Self::DuplicateJsonChunk => f.write_str("GLB container has a second JSON chunk"),
            Self::DuplicateBinaryChunk => f.write_str("GLB container has a second BIN chunk"),
            Self::UnknownChunkType(ty) => write!(f, "unknown GLB chunk type: {ty:#010x}"),
            Self::ChunkIncomplete => f.write_str("GLB chunk reads past the end of the data"),
            Self::InvalidJsonText(e) => write!(f, "JSON chunk is not valid UTF-8: {e}"),
            Self::JsonParsingFailed(e) => write!(f, "glTF JSON parse error: {e}"),
            Self::ExtensionUnsupported(name) => {
                write!(f, "required extension not supported: {name}")
            }
            Self::EmbedBufferLoadFailed(msg) => write!(f, "embedded buffer decode failed: {msg}"),
            Self::BufferError(msg) => write!(f, "buffer error: {msg}"),
            Self::AccessorError(msg) => write!(f, "accessor error: {msg}"),
            Self::InvalidDocument(msg) => write!(f, "invalid document: {msg}"),
            Self::InvalidNodeTransform { node } => {
                write!(f, "node {node} has a non-decomposable matrix")
            }
            Self::DownloadFailed { uri, message } => {
                write!(f, "download of '{uri}' failed: {message}")
            }
            Self::Cancelled => f.write_str("import cancelled"),
        }
    }
}

impl std::error::Error for GltfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidJsonText(e) => Some(e),
            Self::JsonParsingFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GltfError {
    fn from(e: serde_json::Error) -> Self {
        Self::JsonParsingFailed(e)
    }
}

impl From<Cancelled> for GltfError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let e = GltfError::UnsupportedVersion(1);
        assert!(e.to_string().contains('1'));

        let e = GltfError::ExtensionUnsupported("KHR_unknown".into());
        assert!(e.to_string().contains("KHR_unknown"));

        let e = GltfError::UnknownChunkType(0xDEADBEEF);
        assert!(e.to_string().contains("0xdeadbeef"));
    }

    #[test]
    fn cancelled_converts() {
        let e: GltfError = Cancelled.into();
        assert!(matches!(e, GltfError::Cancelled));
    }
}
