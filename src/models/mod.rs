//! Required model assets: manifest, validation, download and registration.

pub mod download;
pub mod errors;
pub mod manifest;
pub mod reconciler;
pub mod validation;

pub use download::{DownloadProgress, DownloadedFile, HttpDownloader, ModelDownloader, ProgressCallback};
pub use errors::ModelError;
pub use manifest::{
    ModelDownloadInfo, ModelManifestSource, RequiredModelManifestEntry, YamlManifestSource,
};
pub use reconciler::ModelDownloadReconciler;
pub use validation::{compute_sha256, validate_model_file};
