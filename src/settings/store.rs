//! Settings persistence and the shared in-memory copy.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::errors::SettingsError;
use super::BackendSettings;

/// File name used by [`JsonFileRepository::in_root`].
pub const SETTINGS_FILE_NAME: &str = "backend_settings.json";

/// Durable storage behind [`SettingsService`].
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn load(&self) -> Result<BackendSettings, SettingsError>;
    async fn save(&self, settings: &BackendSettings) -> Result<(), SettingsError>;
}

// ─── JSON File Repository ───────────────────────────────────────────────────

/// Settings stored as pretty-printed JSON on disk.
///
/// A missing file loads defaults. Writes go to a temp file that is renamed
/// over the target so a crash never leaves a half-written file behind.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_root(root: &Path) -> Self {
        Self::new(root.join(SETTINGS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, e: std::io::Error) -> SettingsError {
        SettingsError::Io {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl SettingsRepository for JsonFileRepository {
    async fn load(&self) -> Result<BackendSettings, SettingsError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no settings file, using defaults");
                return Ok(BackendSettings::default());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let settings = serde_json::from_str::<BackendSettings>(&content)?;
        tracing::debug!(path = %self.path.display(), "loaded backend settings");
        Ok(settings)
    }

    async fn save(&self, settings: &BackendSettings) -> Result<(), SettingsError> {
        let content = serde_json::to_string_pretty(settings)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &content)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        tracing::debug!(path = %self.path.display(), "saved backend settings");
        Ok(())
    }
}

// ─── SettingsService ─────────────────────────────────────────────────────────

/// Shared handle over the current settings.
///
/// Components read a snapshot or update fields in place, then call
/// [`SettingsService::save`] to persist.
pub struct SettingsService {
    repository: Box<dyn SettingsRepository>,
    current: RwLock<BackendSettings>,
    root: PathBuf,
}

impl SettingsService {
    pub fn new(repository: impl SettingsRepository + 'static, root: impl Into<PathBuf>) -> Self {
        Self {
            repository: Box::new(repository),
            current: RwLock::new(BackendSettings::default()),
            root: root.into(),
        }
    }

    /// Service backed by `backend_settings.json` inside `root`.
    pub fn with_json_file(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self::new(JsonFileRepository::in_root(&root), root)
    }

    /// Replace the in-memory copy with what the repository holds.
    pub async fn load(&self) -> Result<(), SettingsError> {
        let loaded = self.repository.load().await?;
        *self.current.write().await = loaded;
        Ok(())
    }

    /// Persist the in-memory copy.
    pub async fn save(&self) -> Result<(), SettingsError> {
        let snapshot = self.current.read().await.clone();
        self.repository.save(&snapshot).await
    }

    pub async fn snapshot(&self) -> BackendSettings {
        self.current.read().await.clone()
    }

    /// Mutate the in-memory copy. Not persisted until [`Self::save`].
    pub async fn update<R>(&self, apply: impl FnOnce(&mut BackendSettings) -> R) -> R {
        let mut guard = self.current.write().await;
        apply(&mut *guard)
    }

    /// Apply `change` to a copy, persist the copy, and only then make it the
    /// current settings. On a failed save the in-memory settings are
    /// unchanged.
    pub async fn update_and_save<R>(
        &self,
        change: impl FnOnce(&mut BackendSettings) -> R,
    ) -> Result<R, SettingsError> {
        let mut guard = self.current.write().await;
        let mut next = guard.clone();
        let result = change(&mut next);
        self.repository.save(&next).await?;
        *guard = next;
        Ok(result)
    }

    /// Folder that relative paths in the settings are resolved against.
    pub fn root_folder(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` against the root folder unless it is already absolute.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        }
    }

    /// Absolute path of the configured model folder.
    pub async fn model_folder(&self) -> PathBuf {
        let folder = self.current.read().await.model_folder.clone();
        self.resolve_path(&folder)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
