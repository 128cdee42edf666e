//! Decode error types

use crate::format::FormatId;
use thiserror::Error;

/// Result type for decode operations
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors from the decode pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// No format could be determined; the caller may pass the bytes through
    #[error("Unrecognized format for {filename} ({format})")]
    FormatUnrecognized { filename: String, format: FormatId },

    /// Structured container does not start with `CTEN`
    #[error("Container magic mismatch: found {found:02X?}")]
    ContainerMagicMismatch { found: [u8; 4] },

    /// Buffer ends inside a declared container field
    #[error("Container truncated in {field} at offset {offset}: needed {needed} bytes, {available} available")]
    ContainerTruncated {
        field: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },
}

impl DecodeError {
    /// Fatal errors abort the asset; non-fatal ones allow pass-through
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DecodeError::FormatUnrecognized { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality_classification() {
        let unrecognized = DecodeError::FormatUnrecognized {
            filename: "a.xyz".into(),
            format: FormatId::Unknown,
        };
        assert!(!unrecognized.is_fatal());
        assert!(DecodeError::ContainerMagicMismatch { found: *b"RIFF" }.is_fatal());
    }

    #[test]
    fn test_display_includes_found_bytes() {
        let msg = DecodeError::ContainerMagicMismatch { found: [0x43, 0x54, 0x45, 0x00] }.to_string();
        assert!(msg.contains("43, 54, 45, 00"), "{}", msg);
    }
}
