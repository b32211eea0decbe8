//! Required-model manifest.
//!
//! The manifest lists every model file the agent needs. It is normally
//! shipped as YAML next to the app:
//!
//! ```yaml
//! models:
//!   - name: Qwen3 4B
//!     fileName: qwen3-4b-q4_k_m.gguf
//!     url: ${MODEL_MIRROR:-https://models.example.com}/qwen3-4b-q4_k_m.gguf
//!     isDefault: true
//! ```
//!
//! `${VAR}` and `${VAR:-default}` placeholders are expanded before parsing,
//! and a fallback beginning with `~` is resolved against the home directory.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::errors::ModelError;

/// One required model file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredModelManifestEntry {
    pub name: String,
    pub file_name: String,
    pub url: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_multi_modal: bool,
    /// Expected SHA-256 of the file, lowercase hex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// A manifest entry the reconciler decided must be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDownloadInfo {
    pub name: String,
    pub file_name: String,
    pub url: String,
    pub is_default: bool,
    pub is_multi_modal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl From<&RequiredModelManifestEntry> for ModelDownloadInfo {
    fn from(entry: &RequiredModelManifestEntry) -> Self {
        Self {
            name: entry.name.clone(),
            file_name: entry.file_name.clone(),
            url: entry.url.clone(),
            is_default: entry.is_default,
            is_multi_modal: entry.is_multi_modal,
            sha256: entry.sha256.clone(),
        }
    }
}

#[async_trait]
pub trait ModelManifestSource: Send + Sync {
    async fn required_models(&self) -> Result<Vec<RequiredModelManifestEntry>, ModelError>;
}

// ─── YAML Source ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    models: Vec<RequiredModelManifestEntry>,
}

/// Manifest read from a YAML file on every call, so edits are picked up
/// without a restart.
#[derive(Debug, Clone)]
pub struct YamlManifestSource {
    path: PathBuf,
}

impl YamlManifestSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ModelManifestSource for YamlManifestSource {
    async fn required_models(&self) -> Result<Vec<RequiredModelManifestEntry>, ModelError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ModelError::Manifest {
                reason: format!("failed to read {}: {e}", self.path.display()),
            })?;
        parse_manifest(&raw)
    }
}

/// Parse manifest YAML after env-var interpolation.
pub fn parse_manifest(raw: &str) -> Result<Vec<RequiredModelManifestEntry>, ModelError> {
    let interpolated = interpolate_env_vars(raw);
    let file: ManifestFile =
        serde_yaml::from_str(&interpolated).map_err(|e| ModelError::Manifest {
            reason: format!("failed to parse manifest: {e}"),
        })?;

    for entry in &file.models {
        if entry.file_name.trim().is_empty() || has_path_separator(&entry.file_name) {
            return Err(ModelError::Manifest {
                reason: format!("invalid fileName for model '{}'", entry.name),
            });
        }
    }

    Ok(file.models)
}

/// File names must be bare names inside the model folder.
fn has_path_separator(file_name: &str) -> bool {
    file_name.contains('/') || file_name.contains('\\') || Path::new(file_name).is_absolute()
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

fn placeholder() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("valid placeholder regex")
    })
}

/// Expand `${VAR}` and `${VAR:-fallback}`. An unset variable without a
/// fallback becomes the empty string; a fallback starting with `~` is
/// resolved against the home directory.
fn interpolate_env_vars(input: &str) -> String {
    placeholder()
        .replace_all(input, |caps: &Captures<'_>| {
            match (std::env::var(&caps[1]), caps.get(2)) {
                (Ok(value), _) => value,
                (Err(_), Some(fallback)) => home_relative(fallback.as_str()),
                (Err(_), None) => String::new(),
            }
        })
        .into_owned()
}

/// `~` or `~/rest` under the home directory; anything else unchanged.
fn home_relative(value: &str) -> String {
    let rest = match value.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return value.to_string(),
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home.display().to_string(),
        Some(home) => home.join(rest).display().to_string(),
        None => value.to_string(),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
