//! Synthetic structured (ncm) container builder

use aurex_decode::container::{CONTAINER_MAGIC, META_XOR_KEY};
use aurex_decode::transform::NCM_CORE_KEY;

/// Builds a byte-exact container around a plain audio payload
#[derive(Debug, Clone, Default)]
pub struct ContainerBuilder {
    meta_json: Option<String>,
    cover: Vec<u8>,
    payload: Vec<u8>,
    key_blob: Vec<u8>,
    /// Omit the `music:` prefix from the metadata text
    unprefixed: bool,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            key_blob: vec![0x11; 128],
            ..Default::default()
        }
    }

    /// Record serialised from the given fields, `[name, id]` artist pairs
    pub fn metadata(mut self, title: &str, artists: &[&str], album: &str, format: &str) -> Self {
        let artist: Vec<serde_json::Value> = artists
            .iter()
            .enumerate()
            .map(|(i, name)| serde_json::json!([name, i + 1]))
            .collect();
        let record = serde_json::json!({
            "musicName": title,
            "artist": artist,
            "album": album,
            "duration": 180_000,
            "format": format,
        });
        self.meta_json = Some(record.to_string());
        self
    }

    pub fn key_blob(mut self, bytes: &[u8]) -> Self {
        self.key_blob = bytes.to_vec();
        self
    }

    pub fn unprefixed(mut self) -> Self {
        self.unprefixed = true;
        self
    }

    /// Raw metadata text (before the `music:` prefix)
    pub fn raw_metadata(mut self, text: &str) -> Self {
        self.meta_json = Some(text.to_string());
        self
    }

    pub fn cover(mut self, bytes: &[u8]) -> Self {
        self.cover = bytes.to_vec();
        self
    }

    /// Plain payload; obfuscated with the core key on `build`
    pub fn payload(mut self, bytes: &[u8]) -> Self {
        self.payload = bytes.to_vec();
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let meta: Vec<u8> = match &self.meta_json {
            Some(json) if self.unprefixed => json.bytes().map(|b| b ^ META_XOR_KEY).collect(),
            Some(json) => format!("music:{}", json)
                .bytes()
                .map(|b| b ^ META_XOR_KEY)
                .collect(),
            None => Vec::new(),
        };

        let mut buf = Vec::new();
        buf.extend_from_slice(&CONTAINER_MAGIC);
        buf.extend_from_slice(b"FDAM");
        buf.extend_from_slice(&(self.key_blob.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.key_blob);
        buf.extend_from_slice(&(meta.len() as u32).to_le_bytes());
        buf.extend_from_slice(&meta);
        buf.extend_from_slice(&[0u8; 4]);
        buf.extend_from_slice(&[0u8; 5]);
        buf.extend_from_slice(&(self.cover.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.cover);
        buf.extend(
            self.payload
                .iter()
                .enumerate()
                .map(|(i, b)| b ^ NCM_CORE_KEY[i % NCM_CORE_KEY.len()]),
        );
        buf
    }
}
