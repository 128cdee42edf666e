//! Content fingerprint over mono PCM samples
//!
//! **Algorithm:**
//! 1. Window = first `min(len, sample_rate * 30)` samples
//! 2. Every 1024th sample is quantised as `floor(sample * 1_000_000)`
//! 3. `hash = hash * 31 + q` in wrapping 32-bit arithmetic
//! 4. `|hash|` rendered in base 36
//!
//! Identical input always yields the identical fingerprint. This is a cache
//! key, not an acoustic fingerprint: AcoustID will not match it to a
//! recording's Chromaprint.

use crate::error::FingerprintError;
use crate::types::{AudioSamples, Fingerprint};

/// Seconds of audio covered by the fingerprint
pub const WINDOW_SECONDS: u32 = 30;

/// Distance between sampled positions
pub const SAMPLE_STRIDE: usize = 1024;

const QUANTISE_SCALE: f64 = 1_000_000.0;
const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Deterministic fingerprint generator
#[derive(Debug, Clone, Copy)]
pub struct FingerprintGenerator {
    window_seconds: u32,
    stride: usize,
}

impl Default for FingerprintGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprintGenerator {
    pub fn new() -> Self {
        Self {
            window_seconds: WINDOW_SECONDS,
            stride: SAMPLE_STRIDE,
        }
    }

    /// Compute the fingerprint of `audio`
    ///
    /// # Errors
    /// Empty input, a zero sample rate, or a NaN/infinite sample inside the
    /// sampled positions.
    pub fn fingerprint(&self, audio: &AudioSamples) -> Result<Fingerprint, FingerprintError> {
        if audio.sample_rate == 0 {
            return Err(FingerprintError::InvalidSampleRate(audio.sample_rate));
        }
        if audio.samples.is_empty() {
            return Err(FingerprintError::EmptySamples);
        }

        let window_len = (audio.sample_rate as usize)
            .saturating_mul(self.window_seconds as usize)
            .min(audio.samples.len());

        let mut hash: i32 = 0;
        for index in (0..window_len).step_by(self.stride) {
            let sample = audio.samples[index];
            if !sample.is_finite() {
                return Err(FingerprintError::NonFiniteSample(index));
            }
            let quantised = (f64::from(sample) * QUANTISE_SCALE).floor() as i64;
            // Truncating back to i32 keeps the low 32 bits
            hash = i64::from(hash).wrapping_mul(31).wrapping_add(quantised) as i32;
        }

        Ok(Fingerprint::new(to_base36(hash.unsigned_abs())))
    }
}

fn to_base36(mut value: u32) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}
