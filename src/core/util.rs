//! Common utilities

use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::SystemTime;
use thiserror::Error;
use xxhash_rust::xxh3::{xxh3_64, Xxh3};

/// Digest algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    #[default]
    Xxh3,
    Sha1,
}

impl HashAlgorithm {
    /// Cache section name entries of this algorithm live under
    pub fn section(&self) -> &'static str {
        match self {
            HashAlgorithm::Xxh3 => "xxh3",
            HashAlgorithm::Sha1 => "sha1",
        }
    }
}

/// Unrecognized algorithm name passed to `--algo`
#[derive(Debug, Error)]
#[error("unknown hash algorithm: {0} (expected xxh3 or sha1)")]
pub struct ParseHashAlgorithmError(String);

impl std::str::FromStr for HashAlgorithm {
    type Err = ParseHashAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xxh3" => Ok(HashAlgorithm::Xxh3),
            "sha1" => Ok(HashAlgorithm::Sha1),
            other => Err(ParseHashAlgorithmError(other.to_string())),
        }
    }
}

/// Compute the content digest of a file with streaming reads
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> std::io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut buffer = [0u8; 64 * 1024];

    match algorithm {
        HashAlgorithm::Xxh3 => {
            let mut hasher = Xxh3::new();
            loop {
                let n = reader.read(&mut buffer)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buffer[..n]);
            }
            Ok(format!("{:016x}", hasher.digest()))
        }
        HashAlgorithm::Sha1 => {
            let mut hasher = Sha1::new();
            loop {
                let n = reader.read(&mut buffer)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buffer[..n]);
            }
            Ok(format!("{:x}", hasher.finalize()))
        }
    }
}

/// Compute the digest of an in-memory buffer
#[allow(dead_code)]
pub fn hash_bytes(data: &[u8], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Xxh3 => format!("{:016x}", xxh3_64(data)),
        HashAlgorithm::Sha1 => {
            let mut hasher = Sha1::new();
            hasher.update(data);
            format!("{:x}", hasher.finalize())
        }
    }
}

/// File modification time as fractional seconds since epoch
pub fn file_mtime(path: &Path) -> std::io::Result<f64> {
    let metadata = std::fs::metadata(path)?;
    let mtime = metadata.modified()?;
    let duration = mtime
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    Ok(duration.as_secs_f64())
}

/// Get file size in bytes
pub fn get_file_size(path: &Path) -> std::io::Result<u64> {
    let metadata = std::fs::metadata(path)?;
    Ok(metadata.len())
}
