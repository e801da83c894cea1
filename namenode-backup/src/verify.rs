//! Integrity digests for downloaded checkpoint files.
//!
//! SHA-1 is used to detect corruption of a backup copy, matching the `.sha1`
//! sidecars operators already check against. It is not an authentication
//! mechanism and makes no claim against deliberate tampering.

use sha1::{Digest, Sha1};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Extension appended to an artifact path to name its digest sidecar
pub const SIDECAR_SUFFIX: &str = ".sha1";

const READ_BUFFER: usize = 64 * 1024;

/// `<artifact>.sha1`
pub fn sidecar_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_owned();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Hex SHA-1 of everything readable from `reader`.
pub fn digest_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; READ_BUFFER];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn digest_file(path: &Path) -> io::Result<String> {
    digest_reader(File::open(path)?)
}

/// Hash a completed download and append the digest to its sidecar.
///
/// An existing sidecar is appended to, not replaced. Backup file names carry
/// a timestamp so each run writes a fresh sidecar; two concurrent runs into
/// the same directory could still concatenate digests.
pub fn hash_and_persist(artifact: &Path) -> io::Result<String> {
    let digest = digest_file(artifact)?;

    let mut sidecar = OpenOptions::new()
        .create(true)
        .append(true)
        .open(sidecar_path(artifact))?;
    sidecar.write_all(digest.as_bytes())?;
    sidecar.sync_all()?;

    Ok(digest)
}
