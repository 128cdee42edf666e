//! Structured container (ncm) parser
//!
//! Layout, little-endian lengths:
//!
//! ```text
//! magic "CTEN" | marker (4) | key_len u32 | key | meta_len u32 | meta (XOR 0x63)
//! | crc (4) | gap (5) | image_len u32 | image | audio payload ...
//! ```
//!
//! The metadata block carries a JSON record after an optional `music:` prefix.
//! A malformed record is not fatal; a buffer that ends inside a declared field
//! is.

use crate::error::DecodeError;
use crate::format::{title_from_filename, FormatId};
use serde_json::Value;
use tracing::{debug, warn};

/// Required first four bytes
pub const CONTAINER_MAGIC: [u8; 4] = *b"CTEN";

/// XOR key applied to every byte of the metadata block
pub const META_XOR_KEY: u8 = 0x63;

/// Prefix stripped from the de-obfuscated metadata text
pub const META_PREFIX: &str = "music:";

const MARKER_LEN: usize = 4;
const CRC_LEN: usize = 4;
const GAP_LEN: usize = 5;

/// Metadata embedded in the container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerMetadata {
    pub title: String,
    /// Artist names joined with `", "`
    pub artist: String,
    pub album: String,
    pub duration_ms: u64,
    pub cover_bytes: Option<Vec<u8>>,
    pub declared_inner_format: Option<FormatId>,
}

/// Parsed container: metadata plus the still-obfuscated audio payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContainer<'a> {
    pub metadata: ContainerMetadata,
    pub payload: &'a [u8],
}

/// Fields of the JSON record, each read independently
///
/// A field of the wrong type is treated as absent so that it never hides the
/// rest of the record.
#[derive(Debug, Default)]
struct MetaRecord {
    title: Option<String>,
    artists: Vec<String>,
    album: Option<String>,
    duration_ms: Option<u64>,
    format: Option<String>,
}

impl MetaRecord {
    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);

        Some(Self {
            title: text("musicName").or_else(|| text("title")),
            artists: object
                .get("artist")
                .and_then(Value::as_array)
                .map(|entries| entries.iter().filter_map(artist_name).collect())
                .unwrap_or_default(),
            album: text("album"),
            duration_ms: object.get("duration").and_then(duration_ms),
            format: text("format"),
        })
    }
}

/// `"Name"` or `["Name", id]`
fn artist_name(entry: &Value) -> Option<String> {
    match entry {
        Value::String(name) => Some(name.clone()),
        Value::Array(pair) => pair.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Integer or non-negative float milliseconds
fn duration_ms(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .map(|ms| ms as u64)
    })
}

/// Bounds-checked little-endian reader
struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(DecodeError::ContainerTruncated {
                field,
                offset: self.offset,
                needed: len,
                available: self.bytes.len().saturating_sub(self.offset),
            })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u32_le(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        let raw = self.take(4, field)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn rest(self) -> &'a [u8] {
        &self.bytes[self.offset..]
    }
}

/// Parser for the one fully specified proprietary layout
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerParser;

impl ContainerParser {
    pub fn new() -> Self {
        Self
    }

    /// Split `bytes` into metadata and payload
    ///
    /// `filename` supplies the fallback title when the record is missing or
    /// malformed.
    pub fn parse<'a>(&self, bytes: &'a [u8], filename: &str) -> Result<ParsedContainer<'a>, DecodeError> {
        let mut reader = Reader::new(bytes);

        let magic = reader.take(CONTAINER_MAGIC.len(), "magic").map_err(|_| {
            let mut found = [0u8; 4];
            found[..bytes.len()].copy_from_slice(bytes);
            DecodeError::ContainerMagicMismatch { found }
        })?;
        if magic != CONTAINER_MAGIC {
            return Err(DecodeError::ContainerMagicMismatch {
                found: [magic[0], magic[1], magic[2], magic[3]],
            });
        }

        reader.take(MARKER_LEN, "marker")?;

        let key_len = reader.u32_le("key_length")? as usize;
        reader.take(key_len, "key_blob")?;

        let meta_len = reader.u32_le("meta_length")? as usize;
        let meta_block = reader.take(meta_len, "meta_block")?;

        reader.take(CRC_LEN, "crc")?;
        reader.take(GAP_LEN, "gap")?;

        let image_len = reader.u32_le("image_length")? as usize;
        let image = reader.take(image_len, "image_blob")?;

        let mut metadata = self.parse_metadata(meta_block, filename);
        if !image.is_empty() {
            metadata.cover_bytes = Some(image.to_vec());
        }

        let payload = reader.rest();
        debug!(
            filename,
            key_len,
            meta_len,
            image_len,
            payload_len = payload.len(),
            "Container parsed"
        );

        Ok(ParsedContainer { metadata, payload })
    }

    /// De-obfuscate and parse the metadata block; never fails
    pub fn parse_metadata(&self, block: &[u8], filename: &str) -> ContainerMetadata {
        let fallback = || ContainerMetadata {
            title: title_from_filename(filename),
            ..Default::default()
        };

        if block.is_empty() {
            return fallback();
        }

        let plain: Vec<u8> = block.iter().map(|b| b ^ META_XOR_KEY).collect();
        let text = String::from_utf8_lossy(&plain);
        let json = text.strip_prefix(META_PREFIX).unwrap_or(text.as_ref());

        let record = match serde_json::from_str::<Value>(json) {
            Ok(value) => match MetaRecord::from_value(&value) {
                Some(record) => record,
                None => {
                    warn!(filename, "Container metadata is not a JSON object, using filename title");
                    return fallback();
                }
            },
            Err(e) => {
                warn!(filename, error = %e, "Container metadata parse failed, using filename title");
                return fallback();
            }
        };

        let declared_inner_format = record.format.as_deref().and_then(|name| {
            name.parse::<FormatId>()
                .ok()
                .filter(|id| id.is_standard())
        });

        let artist = record.artists.join(", ");

        ContainerMetadata {
            title: record
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| title_from_filename(filename)),
            artist,
            album: record.album.unwrap_or_default(),
            duration_ms: record.duration_ms.unwrap_or(0),
            cover_bytes: None,
            declared_inner_format,
        }
    }
}
