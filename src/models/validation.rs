//! Integrity checks for model files already on disk.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use super::errors::ModelError;

/// First four bytes of every GGUF file.
pub const GGUF_MAGIC: &[u8; 4] = b"GGUF";

/// Check that `path` looks like a usable model file.
///
/// Empty files fail. Files ending in `.gguf` must start with the GGUF magic.
/// When `expected_sha256` is given the file hash must match it
/// (case-insensitive).
pub async fn validate_model_file(
    path: &Path,
    expected_sha256: Option<&str>,
) -> Result<(), ModelError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let invalid = |reason: String| ModelError::ValidationFailed {
        file_name: file_name.clone(),
        reason,
    };

    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| ModelError::io(path, e))?;
    if meta.len() == 0 {
        return Err(invalid("file is empty".into()));
    }

    let is_gguf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gguf"));
    if is_gguf {
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| ModelError::io(path, e))?;
        let mut magic = [0u8; 4];
        if file.read_exact(&mut magic).await.is_err() || &magic != GGUF_MAGIC {
            return Err(invalid("missing GGUF header".into()));
        }
    }

    if let Some(expected) = expected_sha256.filter(|s| !s.trim().is_empty()) {
        let actual = compute_sha256(path).await?;
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            return Err(invalid(format!(
                "sha256 mismatch: expected {expected}, got {actual}"
            )));
        }
    }

    Ok(())
}

/// SHA-256 of a file as lowercase hex, read in 8 KB chunks.
pub async fn compute_sha256(path: &Path) -> Result<String, ModelError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| ModelError::io(path, e))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .await
            .map_err(|e| ModelError::io(path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
