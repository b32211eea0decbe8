//! In-memory collaborators for unit tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use crate::host::{HostDescriptor, HostRegistrar, HostRegistrationRecord, RegistrationError};
use crate::inference::{
    BackendChunk, BackendSessionRequest, ChunkStream, CloseReason, InferenceBackend,
    InferenceError, ModelCatalog, ModelEntry, SendRequest, SessionHandle, ToolPack,
};
use crate::models::{
    DownloadProgress, DownloadedFile, ModelDownloadInfo, ModelDownloader, ModelError,
    ModelManifestSource, ProgressCallback, RequiredModelManifestEntry,
};
use crate::settings::{
    BackendSettings, SettingsError, SettingsRepository, SettingsService, UserSettings,
    UserSettingsProvider,
};

// ─── Settings ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryRepository {
    stored: Mutex<Option<BackendSettings>>,
    fail_saves: bool,
}

#[async_trait]
impl SettingsRepository for MemoryRepository {
    async fn load(&self) -> Result<BackendSettings, SettingsError> {
        Ok(self.stored.lock().unwrap().clone().unwrap_or_default())
    }

    async fn save(&self, settings: &BackendSettings) -> Result<(), SettingsError> {
        if self.fail_saves {
            return Err(SettingsError::Io {
                path: "memory".into(),
                reason: "disk full".into(),
            });
        }
        *self.stored.lock().unwrap() = Some(settings.clone());
        Ok(())
    }
}

/// Settings held in memory, rooted at a path that is never touched.
pub fn memory_settings() -> Arc<SettingsService> {
    memory_settings_in(Path::new("/nonexistent-settings-root"))
}

/// Settings held in memory with relative paths resolved against `root`.
pub fn memory_settings_in(root: &Path) -> Arc<SettingsService> {
    Arc::new(SettingsService::new(MemoryRepository::default(), root))
}

/// Settings whose every save fails.
pub fn unsaveable_settings_in(root: &Path) -> Arc<SettingsService> {
    let repository = MemoryRepository {
        fail_saves: true,
        ..Default::default()
    };
    Arc::new(SettingsService::new(repository, root))
}

#[derive(Default)]
pub struct FakeUserSettings {
    settings: UserSettings,
    fail: bool,
}

impl FakeUserSettings {
    pub fn new(settings: UserSettings) -> Self {
        Self {
            settings,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            settings: UserSettings::default(),
            fail: true,
        }
    }
}

#[async_trait]
impl UserSettingsProvider for FakeUserSettings {
    async fn user_settings(&self) -> Result<UserSettings, SettingsError> {
        if self.fail {
            return Err(SettingsError::UserSettingsUnavailable {
                reason: "store offline".into(),
            });
        }
        Ok(self.settings.clone())
    }
}

// ─── Host registration ───────────────────────────────────────────────────────

pub struct FakeRegistrar {
    succeed: bool,
    calls: AtomicUsize,
    last_client_key: Mutex<Option<String>>,
}

impl FakeRegistrar {
    pub fn succeeding() -> Self {
        Self {
            succeed: true,
            calls: AtomicUsize::new(0),
            last_client_key: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            succeed: false,
            ..Self::succeeding()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_client_key(&self) -> Option<String> {
        self.last_client_key.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostRegistrar for FakeRegistrar {
    async fn register(
        &self,
        client_key: &str,
        _host: &HostDescriptor,
    ) -> Result<HostRegistrationRecord, RegistrationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_client_key.lock().unwrap() = Some(client_key.to_string());
        if !self.succeed {
            return Err(RegistrationError::Transport {
                endpoint: "fake".into(),
                reason: "connection refused".into(),
            });
        }
        Ok(HostRegistrationRecord {
            host_id: "host-1".into(),
            secret_key: "secret-1".into(),
        })
    }
}

// ─── Inference backend ───────────────────────────────────────────────────────

pub fn default_catalog() -> ModelCatalog {
    let chat = ModelEntry {
        name: "Chat".into(),
        file_name: "chat.gguf".into(),
        path: PathBuf::from("/models/chat.gguf"),
        is_multi_modal: false,
    };
    ModelCatalog {
        default: Some(chat.clone()),
        local_models: vec![chat],
    }
}

pub struct FakeBackend {
    catalog: ModelCatalog,
    chunks: Vec<BackendChunk>,
    delay: Duration,
    fail_models: AtomicBool,
    fail_create: bool,
    failing_packs: Vec<String>,
    load_tools_calls: AtomicUsize,
    load_models_calls: AtomicUsize,
    loaded_packs: Mutex<Vec<String>>,
    session_requests: Mutex<Vec<BackendSessionRequest>>,
    closed: Mutex<Vec<(SessionHandle, CloseReason)>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            catalog: default_catalog(),
            chunks: Vec::new(),
            delay: Duration::ZERO,
            fail_models: AtomicBool::new(false),
            fail_create: false,
            failing_packs: Vec::new(),
            load_tools_calls: AtomicUsize::new(0),
            load_models_calls: AtomicUsize::new(0),
            loaded_packs: Mutex::new(Vec::new()),
            session_requests: Mutex::new(Vec::new()),
            closed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_chunks(mut self, chunks: Vec<BackendChunk>) -> Self {
        self.chunks = chunks;
        self
    }

    /// Delay applied inside `load_models`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_models(self) -> Self {
        self.set_fail_models(true);
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_pack(mut self, name: &str) -> Self {
        self.failing_packs.push(name.to_string());
        self
    }

    pub fn set_fail_models(&self, fail: bool) {
        self.fail_models.store(fail, Ordering::SeqCst);
    }

    pub fn load_tools_calls(&self) -> usize {
        self.load_tools_calls.load(Ordering::SeqCst)
    }

    pub fn load_models_calls(&self) -> usize {
        self.load_models_calls.load(Ordering::SeqCst)
    }

    pub fn loaded_packs(&self) -> Vec<String> {
        self.loaded_packs.lock().unwrap().clone()
    }

    pub fn session_requests(&self) -> Vec<BackendSessionRequest> {
        self.session_requests.lock().unwrap().clone()
    }

    pub fn closed(&self) -> Vec<(SessionHandle, CloseReason)> {
        self.closed.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceBackend for FakeBackend {
    async fn load_tools(&self) -> Result<(), InferenceError> {
        self.load_tools_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_tool_pack(&self, pack: &ToolPack) -> Result<(), InferenceError> {
        if self.failing_packs.contains(&pack.name) {
            return Err(InferenceError::ToolLoadFailed {
                source_name: pack.name.clone(),
                reason: "bad entry point".into(),
            });
        }
        self.loaded_packs.lock().unwrap().push(pack.name.clone());
        Ok(())
    }

    async fn load_models(&self) -> Result<ModelCatalog, InferenceError> {
        self.load_models_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_models.load(Ordering::SeqCst) {
            return Err(InferenceError::ModelLoadFailed {
                reason: "model folder unreadable".into(),
            });
        }
        Ok(self.catalog.clone())
    }

    async fn create_session(
        &self,
        request: BackendSessionRequest,
    ) -> Result<SessionHandle, InferenceError> {
        if self.fail_create {
            return Err(InferenceError::SessionCreateFailed {
                reason: "out of memory".into(),
            });
        }
        let mut requests = self.session_requests.lock().unwrap();
        requests.push(request);
        Ok(SessionHandle::new(format!("session-{}", requests.len())))
    }

    async fn send(&self, _request: SendRequest) -> Result<ChunkStream, InferenceError> {
        Ok(stream::iter(self.chunks.clone().into_iter().map(Ok)).boxed())
    }

    async fn close_session(
        &self,
        session: &SessionHandle,
        reason: CloseReason,
    ) -> Result<(), InferenceError> {
        self.closed.lock().unwrap().push((session.clone(), reason));
        Ok(())
    }
}

// ─── Models ──────────────────────────────────────────────────────────────────

pub struct FakeManifest {
    entries: Option<Vec<RequiredModelManifestEntry>>,
}

impl FakeManifest {
    pub fn new(entries: Vec<RequiredModelManifestEntry>) -> Self {
        Self {
            entries: Some(entries),
        }
    }

    pub fn failing() -> Self {
        Self { entries: None }
    }
}

#[async_trait]
impl ModelManifestSource for FakeManifest {
    async fn required_models(&self) -> Result<Vec<RequiredModelManifestEntry>, ModelError> {
        self.entries.clone().ok_or_else(|| ModelError::Manifest {
            reason: "manifest service unreachable".into(),
        })
    }
}

/// Downloader that writes fixed bytes instead of fetching.
pub struct FakeDownloader {
    bytes: Vec<u8>,
    calls: AtomicUsize,
}

impl FakeDownloader {
    pub fn writing(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelDownloader for FakeDownloader {
    async fn download(
        &self,
        info: &ModelDownloadInfo,
        target_dir: &Path,
        progress: Option<ProgressCallback>,
        cancel: CancellationToken,
    ) -> Result<DownloadedFile, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(ModelError::Cancelled {
                file_name: info.file_name.clone(),
            });
        }

        std::fs::create_dir_all(target_dir).map_err(|e| ModelError::io(target_dir, e))?;
        let path = target_dir.join(&info.file_name);
        std::fs::write(&path, &self.bytes).map_err(|e| ModelError::io(&path, e))?;

        let size = self.bytes.len() as u64;
        if let Some(cb) = progress {
            cb(DownloadProgress {
                fraction: 1.0,
                bytes_so_far: size,
                total_bytes: Some(size),
            });
        }

        Ok(DownloadedFile {
            path,
            size_bytes: size,
            sha256: format!("{:x}", Sha256::digest(&self.bytes)),
        })
    }
}
