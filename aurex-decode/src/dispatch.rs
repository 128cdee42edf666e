//! Decoder dispatch
//!
//! Pipeline: sniff → container parse (ncm only) → byte transform → re-sniff of
//! the de-obfuscated payload → `DecodedAsset`.

use crate::container::{ContainerMetadata, ContainerParser};
use crate::error::{DecodeError, Result};
use crate::format::{extension_of, FormatId};
use crate::sniffer::FormatSniffer;
use crate::transform::TransformRegistry;
use std::time::Instant;
use tracing::{debug, info};

/// MIME type of a pass-through asset without a declared type
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Caller-supplied input asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAsset {
    pub bytes: Vec<u8>,
    pub filename: String,
    /// Only used as the MIME type of a pass-through asset
    pub declared_mime_type: Option<String>,
}

impl RawAsset {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            declared_mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.declared_mime_type = Some(mime_type.into());
        self
    }
}

/// Standard codec stream ready for a host decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAsset {
    pub bytes: Vec<u8>,
    pub original_format: FormatId,
    pub decoded_format: FormatId,
    pub mime_type: String,
    /// Input filename with the decoded codec's extension
    pub filename: String,
}

/// Decoded asset plus metadata recovered from a structured container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOutput {
    pub asset: DecodedAsset,
    pub container: Option<ContainerMetadata>,
}

/// Orchestrates sniffer, container parser and transform registry
#[derive(Debug, Clone, Copy, Default)]
pub struct DecoderDispatch {
    sniffer: FormatSniffer,
    registry: TransformRegistry,
    parser: ContainerParser,
}

impl DecoderDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sniffer(mut self, sniffer: FormatSniffer) -> Self {
        self.sniffer = sniffer;
        self
    }

    pub fn sniffer(&self) -> &FormatSniffer {
        &self.sniffer
    }

    /// Decode `asset` into a standard codec stream
    ///
    /// # Errors
    /// - `FormatUnrecognized` for `unknown` and `unknown_encrypted` (non-fatal)
    /// - `ContainerMagicMismatch` / `ContainerTruncated` for a broken ncm file
    pub fn decode(&self, asset: &RawAsset) -> Result<DecodeOutput> {
        let start = Instant::now();
        let original_format = self.sniffer.detect_format(&asset.bytes, &asset.filename);

        if matches!(original_format, FormatId::Unknown | FormatId::UnknownEncrypted) {
            return Err(DecodeError::FormatUnrecognized {
                filename: asset.filename.clone(),
                format: original_format,
            });
        }

        let (mut payload, container) = if original_format == FormatId::Ncm {
            let parsed = self.parser.parse(&asset.bytes, &asset.filename)?;
            (parsed.payload.to_vec(), Some(parsed.metadata))
        } else {
            (asset.bytes.clone(), None)
        };

        self.registry.transform_in_place(&mut payload, original_format);

        let decoded_format = self.resolve_inner_format(&payload, original_format, container.as_ref());

        debug!(
            filename = %asset.filename,
            original = %original_format,
            decoded = %decoded_format,
            bytes = payload.len(),
            "Payload transformed"
        );

        let output = DecodeOutput {
            asset: DecodedAsset {
                bytes: payload,
                original_format,
                decoded_format,
                mime_type: decoded_format.mime_type().unwrap_or(OCTET_STREAM).to_string(),
                filename: replace_extension(&asset.filename, decoded_format.as_str()),
            },
            container,
        };

        info!(
            filename = %asset.filename,
            original = %original_format,
            decoded = %decoded_format,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Asset decoded"
        );

        Ok(output)
    }

    /// `decode`, with unrecognised input passed through untouched
    ///
    /// Fatal container errors are still returned.
    pub fn decode_or_passthrough(&self, asset: &RawAsset) -> Result<DecodeOutput> {
        match self.decode(asset) {
            Err(DecodeError::FormatUnrecognized { format, .. }) => {
                debug!(filename = %asset.filename, detected = %format, "Passing asset through undecoded");
                Ok(DecodeOutput {
                    asset: DecodedAsset {
                        bytes: asset.bytes.clone(),
                        original_format: FormatId::Unknown,
                        decoded_format: FormatId::Unknown,
                        mime_type: asset
                            .declared_mime_type
                            .clone()
                            .unwrap_or_else(|| OCTET_STREAM.to_string()),
                        filename: asset.filename.clone(),
                    },
                    container: None,
                })
            }
            other => other,
        }
    }

    /// Re-sniffed codec, then the container's declared codec, then the family default
    fn resolve_inner_format(
        &self,
        payload: &[u8],
        original: FormatId,
        container: Option<&ContainerMetadata>,
    ) -> FormatId {
        self.sniffer
            .detect_standard_by_magic(payload)
            .or_else(|| container.and_then(|m| m.declared_inner_format))
            .unwrap_or_else(|| original.default_inner())
    }
}

/// `song.qmc0` + `mp3` → `song.mp3`; names without an extension get one appended
fn replace_extension(filename: &str, ext: &str) -> String {
    match extension_of(filename) {
        Some(old) => format!("{}.{}", &filename[..filename.len() - old.len() - 1], ext),
        None => format!("{}.{}", filename, ext),
    }
}
