//! Common utility functions shared across CLI commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use proofart_core::{ArtifactKind, Sha256Hash};
use tracing::debug;

/// Build the certificate path from the artifact path.
///
/// Transforms `file.ext` into `file.ext.proof.json`.
pub fn proof_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_os_string();
    name.push(".proof.json");
    PathBuf::from(name)
}

/// Default artifact path: `proofart-<first 16 hex chars>.<ext>` in the working directory.
pub fn default_output_path(combined_hash: &Sha256Hash, kind: ArtifactKind) -> PathBuf {
    PathBuf::from(format!(
        "proofart-{}.{}",
        short_hash(combined_hash),
        kind.extension()
    ))
}

/// First 16 hex characters of a hash, for display and file names.
pub fn short_hash(hash: &Sha256Hash) -> String {
    hash.to_hex().chars().take(16).collect()
}

/// Read an input file. Errors carry the "Failed to read" context used for exit code 66.
pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Read file");
    Ok(bytes)
}

/// Write an output file. Errors carry the "Failed to write" context used for exit code 74.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to write file: {}", path.display()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Wrote file");
    Ok(())
}

/// Format a Unix timestamp (milliseconds) as a human-readable UTC string.
pub fn format_timestamp(timestamp_ms: u64) -> String {
    let secs = (timestamp_ms / 1000) as i64;
    let nsecs = ((timestamp_ms % 1000) * 1_000_000) as u32;
    match Utc.timestamp_opt(secs, nsecs) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        _ => format!("{}ms", timestamp_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proof_path() {
        assert_eq!(
            proof_path(Path::new("image.png")),
            PathBuf::from("image.png.proof.json")
        );
        assert_eq!(
            proof_path(Path::new("out/noext")),
            PathBuf::from("out/noext.proof.json")
        );
    }

    #[test]
    fn test_default_output_path() {
        let hash = Sha256Hash::digest(b"x");
        let path = default_output_path(&hash, ArtifactKind::Image);
        let name = path.to_string_lossy();
        assert!(name.starts_with("proofart-"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "proofart-".len() + 16 + ".png".len());
    }

    #[test]
    fn test_format_timestamp() {
        // 2024-01-15 12:30:45.123 UTC
        let ts = 1705321845123;
        let formatted = format_timestamp(ts);
        assert!(formatted.contains("2024-01-15"));
        assert!(formatted.contains("UTC"));
    }

    #[test]
    fn test_read_input_missing_file() {
        let err = read_input(Path::new("/nonexistent/artifact.png")).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read file"));
    }
}
