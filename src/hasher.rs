//! Content hashing for duplicate detection.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// BLAKE3 digest of a file's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest(pub [u8; 32]);

impl ContentDigest {
    /// Get the digest as a 64-character lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Streams a file through BLAKE3 in `chunk_size` reads.
///
/// The file handle is released on every path, including read errors.
pub fn hash_file(path: &Path, chunk_size: usize) -> io::Result<ContentDigest> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];

    loop {
        let read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..read]);
    }

    Ok(ContentDigest(*hasher.finalize().as_bytes()))
}
