//! Backend settings and the user-level preferences synced into them.
//!
//! The settings object is owned by an external store; this crate reads it
//! and updates a handful of fields (host credentials, model folder,
//! registered models, tuning) before persisting it back.

pub mod errors;
pub mod store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use errors::SettingsError;
pub use store::{JsonFileRepository, SettingsRepository, SettingsService};

/// A model file known to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredModel {
    pub name: String,
    pub file_name: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_multi_modal: bool,
}

/// Persisted backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendSettings {
    pub host_id: Option<String>,
    pub secret_key: Option<String>,
    /// Absolute, or relative to the settings root folder.
    pub model_folder: String,
    pub registered_models: Vec<RegisteredModel>,
    pub context_size: u32,
    pub gpu_layers: i32,
    pub threads: Option<u32>,
    pub batch_size: u32,
    pub temperature: f32,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            host_id: None,
            secret_key: None,
            model_folder: "models".to_string(),
            registered_models: Vec::new(),
            context_size: 4096,
            gpu_layers: -1,
            threads: None,
            batch_size: 512,
            temperature: 0.7,
        }
    }
}

impl BackendSettings {
    /// Whether a host secret has been stored (blank counts as absent).
    pub fn has_secret_key(&self) -> bool {
        self.secret_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    /// Case-insensitive lookup by file name.
    pub fn is_registered(&self, file_name: &str) -> bool {
        self.registered_models
            .iter()
            .any(|m| m.file_name.eq_ignore_ascii_case(file_name))
    }

    /// Append a model. If it is the default, every other entry loses its
    /// default flag first so at most one default exists.
    pub fn register_model(&mut self, model: RegisteredModel) {
        if model.is_default {
            for existing in &mut self.registered_models {
                existing.is_default = false;
            }
        }
        self.registered_models.push(model);
    }
}

/// User-level preferences that override backend defaults when set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub local_model_folder: Option<String>,
    pub context_size: Option<u32>,
    pub threads: Option<u32>,
}

impl UserSettings {
    /// Copy every set preference into `settings`. Returns whether anything
    /// changed.
    pub fn apply_to(&self, settings: &mut BackendSettings) -> bool {
        let before = settings.clone();

        if let Some(folder) = self
            .local_model_folder
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
        {
            settings.model_folder = folder.to_string();
        }
        if let Some(ctx) = self.context_size.filter(|c| *c > 0) {
            settings.context_size = ctx;
        }
        if let Some(threads) = self.threads.filter(|t| *t > 0) {
            settings.threads = Some(threads);
        }

        *settings != before
    }
}

/// Source of [`UserSettings`] (the user's own preference store).
#[async_trait]
pub trait UserSettingsProvider: Send + Sync {
    async fn user_settings(&self) -> Result<UserSettings, SettingsError>;
}

// ─── Tests ──────────────────────────────────────────────────────────────────
