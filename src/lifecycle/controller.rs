//! Session lifecycle controller.
//!
//! Owns the one-time bootstrap of the inference backend and fronts every
//! session call. One instance is meant to be shared across the process.
//!
//! Bootstrap order:
//! 1. Load backend settings
//! 2. Apply user-level preferences (model folder, context size, threads)
//! 3. Ensure this host is registered
//! 4. Load built-in tools, then any discovered tool packs
//! 5. Load the model catalog
//! 6. Mark ready
//!
//! Concurrent first callers share a single bootstrap attempt. A failed
//! attempt leaves the controller unready; the next call to
//! [`SessionLifecycleController::initialize`] after it finished starts over.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Context;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::diagnostics::TraceLog;
use super::tool_discovery::discover_tool_packs;
use crate::host::HostRegistrationGuard;
use crate::inference::{
    response_stream, think_level_to_wire, tool_group_to_wire, BackendSessionRequest, CloseReason,
    InferenceBackend, InferenceError, ModelCatalog, ResponseStream, SendRequest, SessionHandle,
    SessionRequest,
};
use crate::settings::{SettingsService, UserSettingsProvider};

/// Tool pack directory, relative to the settings root.
pub const TOOLS_DIR_NAME: &str = "tools";

pub struct SessionLifecycleController {
    settings: Arc<SettingsService>,
    user_settings: Arc<dyn UserSettingsProvider>,
    registration: HostRegistrationGuard,
    backend: Arc<dyn InferenceBackend>,
    tools_dir: PathBuf,
    trace: TraceLog,

    init_lock: Mutex<()>,
    ready: AtomicBool,
    /// Number of finished bootstrap attempts, successful or not.
    attempts: AtomicU64,
    catalog: RwLock<ModelCatalog>,
}

impl SessionLifecycleController {
    pub fn new(
        settings: Arc<SettingsService>,
        user_settings: Arc<dyn UserSettingsProvider>,
        registration: HostRegistrationGuard,
        backend: Arc<dyn InferenceBackend>,
    ) -> Self {
        let tools_dir = settings.root_folder().join(TOOLS_DIR_NAME);
        Self {
            settings,
            user_settings,
            registration,
            backend,
            tools_dir,
            trace: TraceLog::in_dir(&crate::data_dir()),
            init_lock: Mutex::new(()),
            ready: AtomicBool::new(false),
            attempts: AtomicU64::new(0),
            catalog: RwLock::new(ModelCatalog::default()),
        }
    }

    /// Scan `dir` for tool packs instead of `<settings root>/tools`.
    pub fn with_tools_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tools_dir = dir.into();
        self
    }

    /// Replace the default trace in the data directory.
    pub fn with_trace(mut self, trace: TraceLog) -> Self {
        self.trace = trace;
        self
    }

    pub fn tools_dir(&self) -> &Path {
        &self.tools_dir
    }

    pub fn trace(&self) -> &TraceLog {
        &self.trace
    }

    // ─── Initialization ──────────────────────────────────────────────────

    /// Bring the backend up. Returns whether the controller is ready.
    ///
    /// Never fails: bootstrap errors are logged with their full cause chain
    /// and reported as `false`. A caller that waited on another caller's
    /// attempt gets that attempt's outcome instead of starting a new one.
    pub async fn initialize(&self) -> bool {
        if self.ready.load(Ordering::Acquire) {
            return true;
        }

        let seen_attempts = self.attempts.load(Ordering::Acquire);
        let _guard = self.init_lock.lock().await;

        if self.ready.load(Ordering::Acquire) {
            return true;
        }
        if self.attempts.load(Ordering::Acquire) != seen_attempts {
            // An attempt finished while we waited, and it failed.
            return false;
        }

        let attempt = Uuid::new_v4();
        tracing::info!(attempt = %attempt, "initializing inference backend");
        self.trace.record(format!("initialize start attempt={attempt}"));

        let ready = match self.bootstrap(attempt).await {
            Ok(catalog) => {
                let default_model = catalog.default.as_ref().map(|m| m.name.clone());
                tracing::info!(
                    attempt = %attempt,
                    models = catalog.local_models.len(),
                    default_model = ?default_model,
                    "inference backend ready"
                );
                *self.catalog.write().unwrap_or_else(PoisonError::into_inner) = catalog;
                self.ready.store(true, Ordering::Release);
                self.trace.record(format!("initialize ok attempt={attempt}"));
                true
            }
            Err(e) => {
                tracing::error!(attempt = %attempt, error = %format!("{e:#}"), "initialization failed");
                self.trace
                    .record(format!("initialize failed attempt={attempt}: {e:#}"));
                false
            }
        };

        self.attempts.fetch_add(1, Ordering::AcqRel);
        ready
    }

    async fn bootstrap(&self, attempt: Uuid) -> anyhow::Result<ModelCatalog> {
        self.settings
            .load()
            .await
            .context("failed to load backend settings")?;

        self.sync_user_settings().await;

        let outcome = self.registration.ensure_registered().await;
        tracing::debug!(attempt = %attempt, outcome = ?outcome, "host registration checked");

        self.backend
            .load_tools()
            .await
            .context("failed to load built-in tools")?;

        for pack in discover_tool_packs(&self.tools_dir) {
            match self.backend.load_tool_pack(&pack).await {
                Ok(()) => tracing::info!(pack = %pack.name, version = %pack.version, "tool pack loaded"),
                Err(e) => tracing::warn!(pack = %pack.name, error = %e, "tool pack failed to load, skipping"),
            }
        }

        let catalog = self
            .backend
            .load_models()
            .await
            .context("failed to load model catalog")?;
        Ok(catalog)
    }

    /// Copy user-level preferences into backend settings. Failures are
    /// logged and the current settings are kept.
    async fn sync_user_settings(&self) {
        let user = match self.user_settings.user_settings().await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "user settings unavailable, keeping backend settings");
                return;
            }
        };

        let changed = self.settings.update(|s| user.apply_to(s)).await;
        if !changed {
            return;
        }

        let folder = self.settings.model_folder().await;
        tracing::info!(model_folder = %folder.display(), "applied user settings");
        if let Err(e) = self.settings.save().await {
            tracing::warn!(error = %e, "failed to persist user settings");
        }
    }

    /// Ready and a default model is loaded.
    pub fn is_available(&self) -> bool {
        self.ready.load(Ordering::Acquire)
            && self
                .catalog
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .default
                .is_some()
    }

    /// The model catalog from the last successful bootstrap.
    pub fn catalog(&self) -> ModelCatalog {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ─── Sessions ────────────────────────────────────────────────────────

    /// Open a session, bootstrapping first if needed.
    pub async fn create_session(
        &self,
        request: SessionRequest,
    ) -> Result<SessionHandle, InferenceError> {
        if !self.initialize().await {
            self.trace.record("create_session refused: not initialized");
            return Err(InferenceError::NotInitialized);
        }

        let context_size = self.settings.snapshot().await.context_size;
        let backend_request = BackendSessionRequest {
            model: request.model,
            system_prompt: request.system_prompt,
            think_level: think_level_to_wire(request.think_level),
            tool_groups: request
                .tool_groups
                .into_iter()
                .map(tool_group_to_wire)
                .collect(),
            context_size,
        };

        match self.backend.create_session(backend_request).await {
            Ok(handle) => {
                tracing::info!(session = %handle, "session created");
                self.trace.record(format!("session created id={handle}"));
                Ok(handle)
            }
            Err(e) => {
                tracing::error!(error = %e, "session creation failed");
                self.trace.record(format!("session creation failed: {e}"));
                Err(e)
            }
        }
    }

    /// Start a turn and return its response stream, bootstrapping first if
    /// needed. Cancelling `cancel` ends the stream and closes the session.
    pub async fn send(
        &self,
        request: SendRequest,
        cancel: CancellationToken,
    ) -> Result<ResponseStream, InferenceError> {
        if !self.initialize().await {
            self.trace.record("send refused: not initialized");
            return Err(InferenceError::NotInitialized);
        }

        let session = request.session.clone();
        let chunks = self.backend.send(request).await.map_err(|e| {
            tracing::error!(session = %session, error = %e, "send failed");
            e
        })?;
        Ok(response_stream(
            Arc::clone(&self.backend),
            session,
            chunks,
            cancel,
        ))
    }

    pub async fn close_session(&self, session: &SessionHandle) -> Result<(), InferenceError> {
        tracing::info!(session = %session, "closing session");
        self.backend
            .close_session(session, CloseReason::ClosedByCaller)
            .await
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
