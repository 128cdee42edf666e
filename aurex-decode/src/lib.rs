//! # aurex-decode
//!
//! Identifies the true format of an audio asset and reverses proprietary
//! byte-level obfuscation so the payload becomes a standard codec stream.
//!
//! **Components:**
//! - `FormatSniffer`: magic bytes, extension, then entropy and inline signatures
//! - `TransformRegistry`: one reversible XOR transform per `FormatId`
//! - `ContainerParser`: structured (ncm) container layout and embedded metadata
//! - `DecoderDispatch`: the end-to-end pipeline
//!
//! Everything here is synchronous and free of shared mutable state.

pub mod container;
pub mod dispatch;
pub mod entropy;
pub mod error;
pub mod format;
pub mod sniffer;
pub mod transform;

pub use container::{ContainerMetadata, ContainerParser, ParsedContainer};
pub use dispatch::{DecodeOutput, DecodedAsset, DecoderDispatch, RawAsset};
pub use entropy::shannon_entropy as entropy;
pub use error::{DecodeError, Result};
pub use format::{FormatDescriptor, FormatId, Signature, FORMAT_TABLE};
pub use sniffer::{Detection, DetectionMethod, FormatSniffer};
pub use transform::{ByteTransform, TransformRegistry};
