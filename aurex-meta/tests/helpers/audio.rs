//! Audio fixture generation

use aurex_meta::AudioSamples;
use std::io::Cursor;

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub frequency: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 2.0,
            sample_rate: 44100,
            channels: 2,
            frequency: 440.0,
        }
    }
}

/// Tone sample `i` as written to the 16-bit WAV
pub fn tone_sample(config: &AudioConfig, i: usize) -> i16 {
    let t = i as f32 / config.sample_rate as f32;
    let amplitude = 0.3;
    (amplitude * (2.0 * std::f32::consts::PI * config.frequency * t).sin() * i16::MAX as f32) as i16
}

/// 16-bit PCM WAV file contents
pub fn wav_bytes(config: &AudioConfig) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let total_samples = (config.duration_seconds * config.sample_rate as f64) as usize;
        for i in 0..total_samples {
            let sample = tone_sample(config, i);
            for _ in 0..config.channels {
                writer.write_sample(sample).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// In-memory mono tone
pub fn sine_samples(seconds: f64, sample_rate: u32, frequency: f32) -> AudioSamples {
    let total = (seconds * sample_rate as f64) as usize;
    let samples = (0..total)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            0.5 * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect();
    AudioSamples::new(samples, sample_rate)
}
