//! Fetch-to-disk primitive for model files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use super::errors::ModelError;
use super::manifest::ModelDownloadInfo;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Snapshot passed to the progress callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadProgress {
    /// 0.0 to 1.0; stays 0.0 when the total size is unknown.
    pub fraction: f64,
    pub bytes_so_far: u64,
    pub total_bytes: Option<u64>,
}

impl DownloadProgress {
    fn new(bytes_so_far: u64, total_bytes: Option<u64>) -> Self {
        let fraction = match total_bytes {
            Some(total) if total > 0 => (bytes_so_far as f64 / total as f64).min(1.0),
            _ => 0.0,
        };
        Self {
            fraction,
            bytes_so_far,
            total_bytes,
        }
    }
}

pub type ProgressCallback = Arc<dyn Fn(DownloadProgress) + Send + Sync>;

/// Result of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub sha256: String,
}

#[async_trait]
pub trait ModelDownloader: Send + Sync {
    /// Download `info.url` to `target_dir/info.file_name`.
    ///
    /// On error or cancellation nothing is left at the target path.
    async fn download(
        &self,
        info: &ModelDownloadInfo,
        target_dir: &Path,
        progress: Option<ProgressCallback>,
        cancel: CancellationToken,
    ) -> Result<DownloadedFile, ModelError>;
}

// ─── HTTP ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct HttpDownloader {
    http: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn fetch_to(
        &self,
        info: &ModelDownloadInfo,
        part_path: &Path,
        progress: Option<&ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<(u64, String), ModelError> {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(info)),
            r = self.http.get(&info.url).send() => r.map_err(|e| ModelError::DownloadFailed {
                url: info.url.clone(),
                reason: e.to_string(),
            })?,
        };

        if !response.status().is_success() {
            return Err(ModelError::HttpStatus {
                url: info.url.clone(),
                status: response.status().as_u16(),
            });
        }

        let total_bytes = response.content_length();
        let mut file = tokio::fs::File::create(part_path)
            .await
            .map_err(|e| ModelError::io(part_path, e))?;

        let mut stream = response.bytes_stream();
        let mut hasher = Sha256::new();
        let mut bytes_so_far: u64 = 0;
        let mut last_emit = Instant::now();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(info)),
                next = stream.next() => next,
            };
            let Some(chunk) = next else { break };
            let chunk = chunk.map_err(|e| ModelError::DownloadFailed {
                url: info.url.clone(),
                reason: format!("stream error: {e}"),
            })?;

            file.write_all(&chunk)
                .await
                .map_err(|e| ModelError::io(part_path, e))?;
            hasher.update(&chunk);
            bytes_so_far += chunk.len() as u64;

            if let Some(cb) = progress {
                if last_emit.elapsed() >= PROGRESS_INTERVAL {
                    cb(DownloadProgress::new(bytes_so_far, total_bytes));
                    last_emit = Instant::now();
                }
            }
        }

        file.flush()
            .await
            .map_err(|e| ModelError::io(part_path, e))?;
        drop(file);

        if let Some(cb) = progress {
            cb(DownloadProgress::new(bytes_so_far, total_bytes.or(Some(bytes_so_far))));
        }

        Ok((bytes_so_far, format!("{:x}", hasher.finalize())))
    }
}

#[async_trait]
impl ModelDownloader for HttpDownloader {
    async fn download(
        &self,
        info: &ModelDownloadInfo,
        target_dir: &Path,
        progress: Option<ProgressCallback>,
        cancel: CancellationToken,
    ) -> Result<DownloadedFile, ModelError> {
        tokio::fs::create_dir_all(target_dir)
            .await
            .map_err(|e| ModelError::io(target_dir, e))?;

        let target = target_dir.join(&info.file_name);
        let part = partial_path(&target);

        tracing::info!(model = %info.name, url = %info.url, "starting model download");

        let (size_bytes, sha256) =
            match self.fetch_to(info, &part, progress.as_ref(), &cancel).await {
                Ok(done) => done,
                Err(e) => {
                    discard_download(&part).await;
                    return Err(e);
                }
            };

        if let Err(e) = tokio::fs::rename(&part, &target).await {
            discard_download(&part).await;
            return Err(ModelError::io(&target, e));
        }

        tracing::info!(model = %info.name, size_bytes, sha256 = %sha256, "model download complete");

        Ok(DownloadedFile {
            path: target,
            size_bytes,
            sha256,
        })
    }
}

fn cancelled(info: &ModelDownloadInfo) -> ModelError {
    ModelError::Cancelled {
        file_name: info.file_name.clone(),
    }
}

pub(crate) fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// Delete a download that will not be kept. Returns `false` and logs a
/// warning when the file could not be removed; an already missing file
/// counts as removed.
pub(crate) async fn discard_download(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove discarded download");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn info(url: &str) -> ModelDownloadInfo {
        ModelDownloadInfo {
            name: "Chat".into(),
            file_name: "chat.gguf".into(),
            url: url.into(),
            is_default: true,
            is_multi_modal: false,
            sha256: None,
        }
    }

    #[test]
    fn test_progress_fraction() {
        let p = DownloadProgress::new(50, Some(200));
        assert!((p.fraction - 0.25).abs() < f64::EPSILON);
        assert_eq!(DownloadProgress::new(50, None).fraction, 0.0);
        assert_eq!(DownloadProgress::new(50, Some(0)).fraction, 0.0);
        assert_eq!(DownloadProgress::new(300, Some(200)).fraction, 1.0);
    }

    #[tokio::test]
    async fn test_discard_download_reports_failure() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("chat.gguf.part");
        std::fs::write(&file, b"partial").unwrap();
        assert!(discard_download(&file).await);
        assert!(!file.exists());

        // Already gone.
        assert!(discard_download(&file).await);

        // A directory cannot be removed as a file.
        let dir = tmp.path().join("stuck.gguf");
        std::fs::create_dir(&dir).unwrap();
        assert!(!discard_download(&dir).await);
        assert!(dir.exists());
    }

    #[test]
    fn test_partial_path() {
        let p = partial_path(Path::new("/m/chat.gguf"));
        assert_eq!(p, PathBuf::from("/m/chat.gguf.part"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_leaves_nothing() {
        let tmp = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = HttpDownloader::new()
            .download(&info("http://127.0.0.1:9/chat.gguf"), tmp.path(), None, cancel)
            .await;

        assert!(matches!(result, Err(ModelError::Cancelled { .. })));
        assert!(!tmp.path().join("chat.gguf").exists());
        assert!(!tmp.path().join("chat.gguf.part").exists());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_download_error() {
        let tmp = TempDir::new().unwrap();
        let result = HttpDownloader::new()
            .download(
                &info("http://127.0.0.1:9/chat.gguf"),
                tmp.path(),
                None,
                CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(ModelError::DownloadFailed { .. })));
        assert!(!tmp.path().join("chat.gguf.part").exists());
    }
}
