//! Shannon entropy over byte-value frequencies
//!
//! Used as an "is this obfuscated" heuristic: compressed audio sits well below
//! 8 bits/byte in its headers, XOR-scrambled payloads approach it.

/// Entropy above which a sample is treated as likely obfuscated
pub const OBFUSCATION_THRESHOLD: f64 = 7.5;

/// `H = -Σ p(b)·log2 p(b)` in bits per byte; 0.0 for an empty buffer
pub fn shannon_entropy(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }

    let mut frequency = [0usize; 256];
    for &b in bytes {
        frequency[b as usize] += 1;
    }

    let len = bytes.len() as f64;
    frequency
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// True when the sample's entropy exceeds `OBFUSCATION_THRESHOLD`
pub fn looks_obfuscated(bytes: &[u8]) -> bool {
    shannon_entropy(bytes) > OBFUSCATION_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_distribution_is_eight_bits() {
        let bytes: Vec<u8> = (0..1024).map(|i| (i % 256) as u8).collect();
        assert!((shannon_entropy(&bytes) - 8.0).abs() < 1e-9);
        assert!(looks_obfuscated(&bytes));
    }

    #[test]
    fn test_constant_buffer_is_zero() {
        assert_eq!(shannon_entropy(&[0x42; 4096]), 0.0);
        assert_eq!(shannon_entropy(&[]), 0.0);
    }

    #[test]
    fn test_two_symbols_is_one_bit() {
        let bytes: Vec<u8> = (0..512).map(|i| if i % 2 == 0 { 0x00 } else { 0xFF }).collect();
        assert!((shannon_entropy(&bytes) - 1.0).abs() < 1e-9);
        assert!(!looks_obfuscated(&bytes));
    }
}
