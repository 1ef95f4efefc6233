//! File digests for the supported hash algorithms.
//!
//! The algorithm is resolved once from its name at startup; hashing is then
//! generic over the RustCrypto `Digest` trait so every algorithm shares the
//! same streaming read loop.

use sha2::Digest;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("Unknown digest algorithm: {0} (expected one of md5, sha1, ripemd160, sha256)")]
    UnknownAlgorithm(String),
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    #[default]
    Md5,
    Sha1,
    Ripemd160,
    Sha256,
}

impl DigestAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "md5",
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Ripemd160 => "ripemd160",
            DigestAlgorithm::Sha256 => "sha256",
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = DigestError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "md5" => Ok(DigestAlgorithm::Md5),
            "sha1" => Ok(DigestAlgorithm::Sha1),
            "ripemd160" => Ok(DigestAlgorithm::Ripemd160),
            "sha256" => Ok(DigestAlgorithm::Sha256),
            other => Err(DigestError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Computes the hex encoded digest of the file at `path`.
///
/// The file is opened without following any further indirection than the
/// open call itself does; callers are expected to have classified the path
/// as a regular file already. The handle is closed on every return path.
///
/// # Errors
/// - `DigestError::PermissionDenied`: the file could not be opened for reading
/// - `DigestError::Io`: the file disappeared or reading failed part way
pub fn digest_file(algorithm: DigestAlgorithm, path: &Path) -> Result<String, DigestError> {
    info!("Hashing {}", path.display());

    let mut file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            DigestError::PermissionDenied(path.to_path_buf())
        } else {
            DigestError::Io(e)
        }
    })?;

    let digest = match algorithm {
        DigestAlgorithm::Md5 => digest_reader::<md5::Md5>(&mut file),
        DigestAlgorithm::Sha1 => digest_reader::<sha1::Sha1>(&mut file),
        DigestAlgorithm::Ripemd160 => digest_reader::<ripemd::Ripemd160>(&mut file),
        DigestAlgorithm::Sha256 => digest_reader::<sha2::Sha256>(&mut file),
    }
    .map_err(DigestError::Io)?;

    debug!("{} of {} is {}", algorithm, path.display(), digest);

    Ok(digest)
}

fn digest_reader<D: Digest>(reader: &mut impl Read) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(to_hex(&hasher.finalize()))
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // Writing into a String cannot fail.
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}
