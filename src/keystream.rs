//! XOR keystream that scrambles the RESPACK index.
//!
//! This is obfuscation only: the keystream is fixed, position-derived and carries no key.

use crate::respack::RECORD_SIZE;

const KEY_SEED: u8 = 0x5C;
const KEY_STEP: u8 = 0x3F;

/// The repeating byte sequence `0x5C, 0x1D, 0xDE, ...`, each byte `0x3F` below the last.
#[derive(Debug, Clone)]
pub struct Keystream {
    key: u8,
}

impl Keystream {
    pub fn new() -> Keystream {
        Keystream { key: KEY_SEED }
    }
}

impl Default for Keystream {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Keystream {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        let key = self.key;
        self.key = key.wrapping_sub(KEY_STEP);
        Some(key)
    }
}

/// XORs the keystream over the first `entry_count` index records of `buffer`.
///
/// Applying it twice restores the input, so the same call obfuscates and de-obfuscates.
/// The region is clamped to the buffer length.
pub fn apply(buffer: &mut [u8], entry_count: usize) {
    let len = entry_count.saturating_mul(RECORD_SIZE).min(buffer.len());
    for (byte, key) in buffer[..len].iter_mut().zip(Keystream::new()) {
        *byte ^= key;
    }
}
