//! PCM extraction for fingerprinting
//!
//! Decodes a de-obfuscated asset into mono f32 samples with symphonia. Only a
//! bounded prefix is decoded: the fingerprint never looks past 30 seconds.

use crate::types::AudioSamples;
use anyhow::{Context, Result};
use aurex_decode::{DecodedAsset, FormatId};
use std::io::Cursor;
use symphonia::core::audio::{AudioBufferRef, SampleBuffer};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decode up to `max_seconds` of `asset` into mono samples
///
/// The decoded format supplies the probe hint.
pub fn extract_samples(asset: &DecodedAsset, max_seconds: f64) -> Result<AudioSamples> {
    let hint = match asset.decoded_format {
        FormatId::Unknown => None,
        format => Some(format.as_str()),
    };
    extract_samples_from_bytes(asset.bytes.clone(), hint, max_seconds)
        .with_context(|| format!("Failed to extract samples from {}", asset.filename))
}

/// Decode up to `max_seconds` of an in-memory codec stream into mono samples
///
/// A non-positive or non-finite `max_seconds` decodes the whole stream.
pub fn extract_samples_from_bytes(
    bytes: Vec<u8>,
    extension_hint: Option<&str>,
    max_seconds: f64,
) -> Result<AudioSamples> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension_hint {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe audio stream")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found in stream")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Sample rate unknown")?;

    let max_frames = if max_seconds.is_finite() && max_seconds > 0.0 {
        Some((max_seconds * sample_rate as f64) as usize)
    } else {
        None
    };

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create decoder")?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        if max_frames.is_some_and(|max| samples.len() >= max) {
            break;
        }

        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(anyhow::anyhow!("Error reading packet: {}", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => append_mono(decoded, &mut samples),
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::debug!(error = e, "Skipping undecodable packet");
            }
            Err(e) => return Err(anyhow::anyhow!("Error decoding packet: {}", e)),
        }
    }

    if let Some(max) = max_frames {
        samples.truncate(max);
    }

    tracing::debug!(
        sample_rate,
        total_samples = samples.len(),
        "PCM extraction complete"
    );

    Ok(AudioSamples::new(samples, sample_rate))
}

/// Average all channels of `decoded` into `out`
fn append_mono(decoded: AudioBufferRef<'_>, out: &mut Vec<f32>) {
    let spec = *decoded.spec();
    let channels = spec.channels.count().max(1);

    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
    buffer.copy_interleaved_ref(decoded);

    out.extend(
        buffer
            .samples()
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_is_an_error() {
        let result = extract_samples_from_bytes(vec![0x5A; 4096], Some("mp3"), 1.0);
        assert!(result.is_err());
    }
}
