//! Test helper utilities
//!
//! Shared fixtures for aurex-decode integration tests

pub mod container_builder;

pub use container_builder::ContainerBuilder;

use aurex_decode::transform::QMC0_KEY;

/// Minimal MPEG stream: ID3v2 header followed by a frame sync and filler
pub fn mp3_like_payload(len: usize) -> Vec<u8> {
    let mut bytes = b"ID3\x04\x00\x00\x00\x00\x00\x00".to_vec();
    bytes.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
    while bytes.len() < len {
        bytes.push((bytes.len() % 17) as u8);
    }
    bytes.truncate(len);
    bytes
}

/// `payload[i] ^ 0xA7`
pub fn qmc0_obfuscate(payload: &[u8]) -> Vec<u8> {
    payload.iter().map(|b| b ^ QMC0_KEY).collect()
}
