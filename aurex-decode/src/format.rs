//! Format identifiers and the static descriptor table
//!
//! `FORMAT_TABLE` is ordered by magic-byte priority: the sniffer walks it top
//! to bottom and the first matching signature wins. Longer, more specific
//! signatures come before shorter ones that share a leading byte, and the
//! table tests assert that no signature is shadowed by an earlier prefix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of recognised container/codec identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatId {
    // Standard codecs
    Mp3,
    Flac,
    Wav,
    Ogg,
    M4a,
    Aac,
    // Proprietary obfuscated families
    Qmc0,
    Qmc3,
    QmcFlac,
    QmcOgg,
    Ncm,
    Kcm,
    Xm,
    Tm0,
    Tm2,
    Tm3,
    Tm6,
    Kgm,
    Vpr,
    /// Nothing matched
    Unknown,
    /// High-entropy bytes that no known family claims
    #[serde(rename = "unknown_encrypted")]
    UnknownEncrypted,
}

impl FormatId {
    pub const STANDARD: [FormatId; 6] = [
        FormatId::Mp3,
        FormatId::Flac,
        FormatId::Wav,
        FormatId::Ogg,
        FormatId::M4a,
        FormatId::Aac,
    ];

    pub const PROPRIETARY: [FormatId; 13] = [
        FormatId::Qmc0,
        FormatId::Qmc3,
        FormatId::QmcFlac,
        FormatId::QmcOgg,
        FormatId::Ncm,
        FormatId::Kcm,
        FormatId::Xm,
        FormatId::Tm0,
        FormatId::Tm2,
        FormatId::Tm3,
        FormatId::Tm6,
        FormatId::Kgm,
        FormatId::Vpr,
    ];

    /// Canonical lowercase name, also the file extension for standard codecs
    pub fn as_str(self) -> &'static str {
        match self {
            FormatId::Mp3 => "mp3",
            FormatId::Flac => "flac",
            FormatId::Wav => "wav",
            FormatId::Ogg => "ogg",
            FormatId::M4a => "m4a",
            FormatId::Aac => "aac",
            FormatId::Qmc0 => "qmc0",
            FormatId::Qmc3 => "qmc3",
            FormatId::QmcFlac => "qmcflac",
            FormatId::QmcOgg => "qmcogg",
            FormatId::Ncm => "ncm",
            FormatId::Kcm => "kcm",
            FormatId::Xm => "xm",
            FormatId::Tm0 => "tm0",
            FormatId::Tm2 => "tm2",
            FormatId::Tm3 => "tm3",
            FormatId::Tm6 => "tm6",
            FormatId::Kgm => "kgm",
            FormatId::Vpr => "vpr",
            FormatId::Unknown => "unknown",
            FormatId::UnknownEncrypted => "unknown_encrypted",
        }
    }

    pub fn is_standard(self) -> bool {
        Self::STANDARD.contains(&self)
    }

    pub fn is_proprietary(self) -> bool {
        Self::PROPRIETARY.contains(&self)
    }

    /// MIME type handed to the host decoder (standard codecs only)
    pub fn mime_type(self) -> Option<&'static str> {
        match self {
            FormatId::Mp3 => Some("audio/mpeg"),
            FormatId::Flac => Some("audio/flac"),
            FormatId::Wav => Some("audio/wav"),
            FormatId::Ogg => Some("audio/ogg"),
            FormatId::M4a => Some("audio/mp4"),
            FormatId::Aac => Some("audio/aac"),
            _ => None,
        }
    }

    /// Inner codec assumed when re-sniffing a transformed payload finds nothing
    pub fn default_inner(self) -> FormatId {
        match self {
            standard if standard.is_standard() => standard,
            FormatId::QmcFlac => FormatId::Flac,
            FormatId::QmcOgg => FormatId::Ogg,
            _ => FormatId::Mp3,
        }
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for names that are not a `FormatId`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown format name: {0}")]
pub struct ParseFormatIdError(pub String);

impl FromStr for FormatId {
    type Err = ParseFormatIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        FormatId::STANDARD
            .iter()
            .chain(FormatId::PROPRIETARY.iter())
            .chain([FormatId::Unknown, FormatId::UnknownEncrypted].iter())
            .copied()
            .find(|id| id.as_str() == lower)
            .ok_or_else(|| ParseFormatIdError(s.to_string()))
    }
}

/// Fixed byte sequence expected at `offset`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub offset: usize,
    pub bytes: &'static [u8],
}

impl Signature {
    const fn at(offset: usize, bytes: &'static [u8]) -> Self {
        Self { offset, bytes }
    }

    /// True when `header` holds this signature
    pub fn matches(&self, header: &[u8]) -> bool {
        header
            .get(self.offset..self.offset + self.bytes.len())
            .is_some_and(|window| window == self.bytes)
    }

    /// Bytes needed in the header window to test this signature
    pub fn end(&self) -> usize {
        self.offset + self.bytes.len()
    }
}

/// Static description of one format
#[derive(Debug, Clone, Copy)]
pub struct FormatDescriptor {
    pub id: FormatId,
    /// Tried in order; may be empty
    pub signatures: &'static [Signature],
    pub extensions: &'static [&'static str],
}

/// Descriptor table in magic-byte priority order
pub static FORMAT_TABLE: &[FormatDescriptor] = &[
    FormatDescriptor {
        id: FormatId::Ncm,
        signatures: &[Signature::at(0, b"CTEN")],
        extensions: &["ncm"],
    },
    FormatDescriptor {
        id: FormatId::Qmc0,
        signatures: &[Signature::at(0, b"QMC0")],
        extensions: &["qmc0"],
    },
    FormatDescriptor {
        id: FormatId::Qmc3,
        signatures: &[Signature::at(0, b"QMC3")],
        extensions: &["qmc3"],
    },
    FormatDescriptor {
        id: FormatId::Vpr,
        signatures: &[Signature::at(0, &[0x05, 0x28, 0xBC, 0x96])],
        extensions: &["vpr"],
    },
    FormatDescriptor {
        id: FormatId::Kgm,
        signatures: &[Signature::at(0, b"kgm")],
        extensions: &["kgm", "kgma"],
    },
    FormatDescriptor {
        id: FormatId::Flac,
        signatures: &[Signature::at(0, b"fLaC")],
        extensions: &["flac"],
    },
    FormatDescriptor {
        id: FormatId::Ogg,
        signatures: &[Signature::at(0, b"OggS")],
        extensions: &["ogg", "oga"],
    },
    FormatDescriptor {
        id: FormatId::Wav,
        signatures: &[Signature::at(0, b"RIFF")],
        extensions: &["wav"],
    },
    FormatDescriptor {
        id: FormatId::M4a,
        signatures: &[Signature::at(0, b"ftyp"), Signature::at(4, b"ftyp")],
        extensions: &["m4a"],
    },
    // MPEG frame syncs share 0xFF with ADTS; neither is a prefix of the other
    FormatDescriptor {
        id: FormatId::Mp3,
        signatures: &[
            Signature::at(0, b"ID3"),
            Signature::at(0, &[0xFF, 0xFB]),
            Signature::at(0, &[0xFF, 0xF3]),
            Signature::at(0, &[0xFF, 0xF2]),
        ],
        extensions: &["mp3"],
    },
    FormatDescriptor {
        id: FormatId::Aac,
        signatures: &[Signature::at(0, &[0xFF, 0xF1]), Signature::at(0, &[0xFF, 0xF9])],
        extensions: &["aac"],
    },
    // Extension-only families
    FormatDescriptor {
        id: FormatId::QmcFlac,
        signatures: &[],
        extensions: &["qmcflac"],
    },
    FormatDescriptor {
        id: FormatId::QmcOgg,
        signatures: &[],
        extensions: &["qmcogg"],
    },
    FormatDescriptor {
        id: FormatId::Kcm,
        signatures: &[],
        extensions: &["kcm"],
    },
    FormatDescriptor {
        id: FormatId::Xm,
        signatures: &[],
        extensions: &["xm"],
    },
    FormatDescriptor {
        id: FormatId::Tm0,
        signatures: &[],
        extensions: &["tm0"],
    },
    FormatDescriptor {
        id: FormatId::Tm2,
        signatures: &[],
        extensions: &["tm2"],
    },
    FormatDescriptor {
        id: FormatId::Tm3,
        signatures: &[],
        extensions: &["tm3"],
    },
    FormatDescriptor {
        id: FormatId::Tm6,
        signatures: &[],
        extensions: &["tm6"],
    },
];

/// Look up the descriptor for `id`
pub fn descriptor(id: FormatId) -> Option<&'static FormatDescriptor> {
    FORMAT_TABLE.iter().find(|d| d.id == id)
}

/// Lower-cased suffix after the last `.` of the final path component
pub fn extension_of(filename: &str) -> Option<String> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Title derived from a filename: known extension and leading track number removed
///
/// `"03 - Song Name.qmc0"` → `"Song Name"`
pub fn title_from_filename(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let stem = match name.rsplit_once('.') {
        Some((stem, ext)) if is_known_extension(ext) => stem,
        _ => name,
    };

    let without_number = match stem.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) if idx > 0 => stem[idx..].trim_start_matches(|c: char| c == '.' || c == '-' || c.is_whitespace()),
        _ => stem,
    };

    let title = without_number.trim();
    if title.is_empty() {
        stem.trim().to_string()
    } else {
        title.to_string()
    }
}

fn is_known_extension(ext: &str) -> bool {
    let ext = ext.to_ascii_lowercase();
    FORMAT_TABLE
        .iter()
        .any(|d| d.extensions.contains(&ext.as_str()))
}
