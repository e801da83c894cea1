//! `.tar.gz` bundling of an artifact with its digest sidecar.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// `<artifact>.tar.gz`
pub fn archive_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_owned();
    name.push(".tar.gz");
    PathBuf::from(name)
}

/// Write `<artifact>.tar.gz` holding `artifact` and `sidecar` under their
/// base names. The inputs are left in place.
pub fn archive(artifact: &Path, sidecar: &Path) -> io::Result<PathBuf> {
    let out_path = archive_path(artifact);
    let encoder = GzEncoder::new(File::create(&out_path)?, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for path in [artifact, sidecar] {
        let name = path.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no file name", path.display()),
            )
        })?;
        builder.append_path_with_name(path, name)?;
    }

    let encoder = builder.into_inner()?;
    encoder.finish()?.sync_all()?;

    info!("Archive created: {}", out_path.display());
    Ok(out_path)
}

/// Delete an archived artifact and its sidecar.
pub fn remove_originals(artifact: &Path, sidecar: &Path) -> io::Result<()> {
    std::fs::remove_file(artifact)?;
    std::fs::remove_file(sidecar)?;
    info!("Removed originals of {}", artifact.display());
    Ok(())
}
