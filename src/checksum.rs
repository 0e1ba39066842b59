//! Checksums of written IDX files.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::Result;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Incremental FNV-1a 64-bit hash.
#[derive(Debug, Clone, Copy)]
struct Fnv1a(u64);

impl Fnv1a {
    fn new() -> Self {
        Self(FNV_OFFSET)
    }

    fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.0 ^= u64::from(byte);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    fn hex(self) -> String {
        format!("{:016x}", self.0)
    }
}

/// Checksum the contents of a file.
///
/// Two runs with the same seed over the same label tree produce the same
/// checksums, which makes regenerated datasets easy to compare.
pub fn checksum_file(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut buffer = [0u8; 8192];
    let mut hash = Fnv1a::new();

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hash.update(&buffer[..bytes_read]);
    }

    Ok(hash.hex())
}

/// Checksum in-memory data.
#[must_use]
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hash = Fnv1a::new();
    hash.update(data);
    hash.hex()
}
