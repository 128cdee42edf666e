//! Format sniffing
//!
//! **Algorithm** (strict priority, first success wins):
//! 1. Magic bytes in a 16-byte header window, table order
//! 2. Lower-cased filename extension
//! 3. Deep analysis of a 1024-byte sample: entropy, then inline signatures
//! 4. `FormatId::Unknown`

use crate::entropy::{looks_obfuscated, shannon_entropy};
use crate::format::{extension_of, FormatId, FORMAT_TABLE};
use tracing::debug;

/// Header window compared against magic signatures
pub const HEADER_WINDOW: usize = 16;

/// Sample window used by deep analysis
pub const SAMPLE_WINDOW: usize = 1024;

const FLAC_MARKER: &[u8] = b"fLaC";

/// Which heuristic produced a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMethod {
    MagicBytes,
    Extension,
    /// Entropy above threshold
    Entropy,
    /// Signature found away from offset 0
    InlineSignature,
    None,
}

/// Result of `FormatSniffer::classify`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub format: FormatId,
    pub method: DetectionMethod,
}

/// Stateless format classifier over the static descriptor table
#[derive(Debug, Clone, Copy)]
pub struct FormatSniffer {
    header_window: usize,
    sample_window: usize,
}

impl Default for FormatSniffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatSniffer {
    pub fn new() -> Self {
        Self {
            header_window: HEADER_WINDOW,
            sample_window: SAMPLE_WINDOW,
        }
    }

    /// Override the deep-analysis window (never below the header window)
    pub fn with_sample_window(mut self, bytes: usize) -> Self {
        self.sample_window = bytes.max(self.header_window);
        self
    }

    /// Classify `bytes` + `filename` into a `FormatId`
    pub fn detect_format(&self, bytes: &[u8], filename: &str) -> FormatId {
        self.classify(bytes, filename).format
    }

    /// Classify and report which step matched
    pub fn classify(&self, bytes: &[u8], filename: &str) -> Detection {
        if let Some(format) = self.detect_by_magic(bytes) {
            debug!(filename, format = %format, "Format detected by magic bytes");
            return Detection {
                format,
                method: DetectionMethod::MagicBytes,
            };
        }

        if let Some(format) = self.detect_by_extension(filename) {
            debug!(filename, format = %format, "Format detected by extension");
            return Detection {
                format,
                method: DetectionMethod::Extension,
            };
        }

        if let Some(detection) = self.deep_analysis(bytes, filename) {
            debug!(
                filename,
                format = %detection.format,
                method = ?detection.method,
                "Format detected by deep analysis"
            );
            return detection;
        }

        debug!(filename, "Format not recognised");
        Detection {
            format: FormatId::Unknown,
            method: DetectionMethod::None,
        }
    }

    /// Step 1: first descriptor whose signature matches the header window
    pub fn detect_by_magic(&self, bytes: &[u8]) -> Option<FormatId> {
        self.match_magic(bytes, |_| true)
    }

    /// Magic-byte step restricted to standard codecs
    ///
    /// Used to discover the inner codec of a transformed payload.
    pub fn detect_standard_by_magic(&self, bytes: &[u8]) -> Option<FormatId> {
        self.match_magic(bytes, FormatId::is_standard)
    }

    fn match_magic(&self, bytes: &[u8], accept: impl Fn(FormatId) -> bool) -> Option<FormatId> {
        let header = &bytes[..bytes.len().min(self.header_window)];

        FORMAT_TABLE
            .iter()
            .filter(|d| accept(d.id))
            .find(|d| d.signatures.iter().any(|sig| sig.matches(header)))
            .map(|d| d.id)
    }

    /// Step 2: lower-cased extension lookup
    pub fn detect_by_extension(&self, filename: &str) -> Option<FormatId> {
        let ext = extension_of(filename)?;
        FORMAT_TABLE
            .iter()
            .find(|d| d.extensions.contains(&ext.as_str()))
            .map(|d| d.id)
    }

    /// Step 3: entropy classification, then inline signature scan
    pub fn deep_analysis(&self, bytes: &[u8], filename: &str) -> Option<Detection> {
        let sample = &bytes[..bytes.len().min(self.sample_window)];

        if looks_obfuscated(sample) {
            let format = self
                .proprietary_from_extension(filename)
                .unwrap_or(FormatId::UnknownEncrypted);
            debug!(
                filename,
                entropy = shannon_entropy(sample),
                format = %format,
                "High-entropy sample"
            );
            return Some(Detection {
                format,
                method: DetectionMethod::Entropy,
            });
        }

        scan_inline_signatures(sample).map(|format| Detection {
            format,
            method: DetectionMethod::InlineSignature,
        })
    }

    fn proprietary_from_extension(&self, filename: &str) -> Option<FormatId> {
        self.detect_by_extension(filename)
            .filter(|id| id.is_proprietary())
    }
}

/// MPEG frame sync (`11111111 111xxxxx`) anywhere, then the FLAC marker anywhere
fn scan_inline_signatures(sample: &[u8]) -> Option<FormatId> {
    if sample
        .windows(2)
        .any(|w| w[0] == 0xFF && (w[1] & 0xE0) == 0xE0)
    {
        return Some(FormatId::Mp3);
    }

    if sample.windows(FLAC_MARKER.len()).any(|w| w == FLAC_MARKER) {
        return Some(FormatId::Flac);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic high-entropy filler (LCG)
    fn noise(len: usize, seed: u32) -> Vec<u8> {
        let mut x = seed;
        (0..len)
            .map(|_| {
                x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (x >> 16) as u8
            })
            .collect()
    }

    #[test]
    fn test_every_signature_detected_regardless_of_filename() {
        let sniffer = FormatSniffer::new();

        for descriptor in FORMAT_TABLE {
            for sig in descriptor.signatures {
                let mut buf = vec![0u8; 64];
                buf[sig.offset..sig.end()].copy_from_slice(sig.bytes);

                for filename in ["clip.xyz", "clip.flac", "clip.ncm", "noext"] {
                    assert_eq!(
                        sniffer.detect_format(&buf, filename),
                        descriptor.id,
                        "signature {:02X?} with filename {}",
                        sig.bytes,
                        filename
                    );
                }
            }
        }
    }

    #[test]
    fn test_magic_wins_over_extension() {
        let sniffer = FormatSniffer::new();
        let detection = sniffer.classify(b"OggS\x00\x02\x00\x00", "disguised.mp3");
        assert_eq!(detection.format, FormatId::Ogg);
        assert_eq!(detection.method, DetectionMethod::MagicBytes);
    }

    #[test]
    fn test_extension_match_is_case_insensitive() {
        let sniffer = FormatSniffer::new();
        let detection = sniffer.classify(&[0u8; 32], "Track.QmcFlac");
        assert_eq!(detection.format, FormatId::QmcFlac);
        assert_eq!(detection.method, DetectionMethod::Extension);
    }

    #[test]
    fn test_signature_beyond_header_window_ignored_by_magic_step() {
        let sniffer = FormatSniffer::new();
        let mut buf = vec![0u8; 64];
        buf[20..24].copy_from_slice(b"OggS");
        assert_eq!(sniffer.detect_by_magic(&buf), None);
    }

    #[test]
    fn test_high_entropy_without_known_extension_is_unknown_encrypted() {
        let sniffer = FormatSniffer::new();
        let detection = sniffer.classify(&noise(4096, 7), "blob.bin");
        assert_eq!(detection.format, FormatId::UnknownEncrypted);
        assert_eq!(detection.method, DetectionMethod::Entropy);
    }

    #[test]
    fn test_inline_mp3_sync_detected() {
        let sniffer = FormatSniffer::new();
        let mut buf = vec![0u8; 256];
        buf[100] = 0xFF;
        buf[101] = 0xE3;
        let detection = sniffer.classify(&buf, "stream.dat");
        assert_eq!(detection.format, FormatId::Mp3);
        assert_eq!(detection.method, DetectionMethod::InlineSignature);
    }

    #[test]
    fn test_inline_flac_marker_detected() {
        let sniffer = FormatSniffer::new();
        let mut buf = vec![0x11u8; 256];
        buf[40..44].copy_from_slice(b"fLaC");
        assert_eq!(sniffer.detect_format(&buf, "stream.dat"), FormatId::Flac);
    }

    #[test]
    fn test_unknown_header_low_entropy_no_signature_is_unknown() {
        let sniffer = FormatSniffer::new();
        let mut buf = vec![0u8; 2048];
        buf[..4].copy_from_slice(&[0x12, 0x34, 0x56, 0x78]);
        let detection = sniffer.classify(&buf, "mystery.xyz");
        assert_eq!(detection.format, FormatId::Unknown);
        assert_eq!(detection.method, DetectionMethod::None);
    }

    #[test]
    fn test_empty_input_is_unknown() {
        assert_eq!(FormatSniffer::new().detect_format(&[], ""), FormatId::Unknown);
    }

    #[test]
    fn test_standard_magic_skips_proprietary_signatures() {
        let sniffer = FormatSniffer::new();
        assert_eq!(sniffer.detect_standard_by_magic(b"QMC0...."), None);
        assert_eq!(sniffer.detect_standard_by_magic(b"fLaC\x00\x00"), Some(FormatId::Flac));
    }
}
