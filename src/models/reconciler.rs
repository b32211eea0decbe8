//! Works out which required model files are missing, fetches them and
//! records them in the backend settings.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::download::{discard_download, DownloadedFile, ModelDownloader, ProgressCallback};
use super::errors::ModelError;
use super::manifest::{ModelDownloadInfo, ModelManifestSource};
use super::validation::validate_model_file;
use crate::settings::{RegisteredModel, SettingsService};

pub struct ModelDownloadReconciler {
    settings: Arc<SettingsService>,
    manifest: Arc<dyn ModelManifestSource>,
    downloader: Arc<dyn ModelDownloader>,
}

impl ModelDownloadReconciler {
    pub fn new(
        settings: Arc<SettingsService>,
        manifest: Arc<dyn ModelManifestSource>,
        downloader: Arc<dyn ModelDownloader>,
    ) -> Self {
        Self {
            settings,
            manifest,
            downloader,
        }
    }

    /// Manifest entries whose file is not in the model folder.
    ///
    /// Files that are present but fail validation are logged and left alone;
    /// they are not reported here. Any internal failure yields an empty list.
    pub async fn required_downloads(&self) -> Vec<ModelDownloadInfo> {
        match self.find_missing().await {
            Ok(missing) => missing,
            Err(e) => {
                tracing::error!(error = %e, "failed to determine required model downloads");
                Vec::new()
            }
        }
    }

    async fn find_missing(&self) -> Result<Vec<ModelDownloadInfo>, ModelError> {
        let folder = self.settings.model_folder().await;
        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|e| ModelError::io(&folder, e))?;

        let present = list_model_files(&folder).await?;
        let required = self.manifest.required_models().await?;

        let mut missing = Vec::new();
        for entry in &required {
            let Some(path) = on_disk_path(&folder, &present, &entry.file_name) else {
                missing.push(ModelDownloadInfo::from(entry));
                continue;
            };

            if let Err(e) = validate_model_file(&path, entry.sha256.as_deref()).await {
                tracing::warn!(
                    file = %entry.file_name,
                    error = %e,
                    "model file present but failed validation, keeping it"
                );
            }
        }

        tracing::info!(
            required = required.len(),
            missing = missing.len(),
            folder = %folder.display(),
            "model folder reconciled"
        );
        Ok(missing)
    }

    /// Download one model and register it if the backend does not know it
    /// yet.
    pub async fn download_model(
        &self,
        info: &ModelDownloadInfo,
        progress: Option<ProgressCallback>,
        cancel: CancellationToken,
    ) -> Result<DownloadedFile, ModelError> {
        let folder = self.settings.model_folder().await;
        let downloaded = self
            .downloader
            .download(info, &folder, progress, cancel)
            .await?;

        if let Some(expected) = info.sha256.as_deref().filter(|s| !s.trim().is_empty()) {
            if !downloaded.sha256.eq_ignore_ascii_case(expected.trim()) {
                discard_download(&downloaded.path).await;
                return Err(ModelError::ValidationFailed {
                    file_name: info.file_name.clone(),
                    reason: format!(
                        "sha256 mismatch: expected {expected}, got {}",
                        downloaded.sha256
                    ),
                });
            }
        }

        if self.settings.snapshot().await.is_registered(&info.file_name) {
            return Ok(downloaded);
        }

        let added = self
            .settings
            .update_and_save(|s| {
                if s.is_registered(&info.file_name) {
                    false
                } else {
                    s.register_model(registered_from(info));
                    true
                }
            })
            .await
            .map_err(|e| ModelError::RegistrationFailed {
                file_name: info.file_name.clone(),
                reason: e.to_string(),
            })?;

        if added {
            tracing::info!(model = %info.name, default = info.is_default, "model registered");
        }

        Ok(downloaded)
    }

    /// Register manifest models whose file is on disk and valid but which are
    /// missing from the registered list. This repairs the state left behind
    /// when a process stops between a download and its registration.
    ///
    /// Returns the file names that were registered.
    pub async fn reconcile_registrations(&self) -> Result<Vec<String>, ModelError> {
        let folder = self.settings.model_folder().await;
        let present = match list_model_files(&folder).await {
            Ok(present) => present,
            Err(ModelError::Io { .. }) if !folder.exists() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let required = self.manifest.required_models().await?;
        let snapshot = self.settings.snapshot().await;

        let mut to_register = Vec::new();
        for entry in &required {
            if snapshot.is_registered(&entry.file_name) {
                continue;
            }
            let Some(path) = on_disk_path(&folder, &present, &entry.file_name) else {
                continue;
            };
            match validate_model_file(&path, entry.sha256.as_deref()).await {
                Ok(()) => to_register.push(ModelDownloadInfo::from(entry)),
                Err(e) => tracing::warn!(
                    file = %entry.file_name,
                    error = %e,
                    "not registering invalid model file"
                ),
            }
        }

        if to_register.is_empty() {
            return Ok(Vec::new());
        }

        let registered = self
            .settings
            .update_and_save(|s| {
                let mut names = Vec::new();
                for info in &to_register {
                    if !s.is_registered(&info.file_name) {
                        s.register_model(registered_from(info));
                        names.push(info.file_name.clone());
                    }
                }
                names
            })
            .await
            .map_err(|e| ModelError::RegistrationFailed {
                file_name: to_register
                    .iter()
                    .map(|i| i.file_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                reason: e.to_string(),
            })?;

        tracing::info!(count = registered.len(), "registered models found on disk");
        Ok(registered)
    }
}

fn registered_from(info: &ModelDownloadInfo) -> RegisteredModel {
    RegisteredModel {
        name: info.name.clone(),
        file_name: info.file_name.clone(),
        is_default: info.is_default,
        is_multi_modal: info.is_multi_modal,
    }
}

/// Regular files directly inside `folder`, keyed by lowercased name and
/// mapped to the name as it appears on disk.
async fn list_model_files(folder: &Path) -> Result<HashMap<String, String>, ModelError> {
    let mut names = HashMap::new();
    let mut entries = tokio::fs::read_dir(folder)
        .await
        .map_err(|e| ModelError::io(folder, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ModelError::io(folder, e))?
    {
        let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
        if is_file {
            let actual = entry.file_name().to_string_lossy().into_owned();
            names.insert(actual.to_lowercase(), actual);
        }
    }

    Ok(names)
}

/// Path of the file matching `file_name` case-insensitively, if present.
fn on_disk_path(
    folder: &Path,
    present: &HashMap<String, String>,
    file_name: &str,
) -> Option<PathBuf> {
    present
        .get(&file_name.to_lowercase())
        .map(|actual| folder.join(actual))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
