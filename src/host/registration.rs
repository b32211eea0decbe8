//! One-time registration of this machine as an inference host.
//!
//! Registration is opportunistic: it runs only when the user is
//! authenticated and no host secret is stored yet, and any failure is logged
//! and swallowed. Because the secret stays absent after a failure, the next
//! initialization pass tries again.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sysinfo::System;

use super::auth::AuthStateProvider;
use super::errors::RegistrationError;
use crate::settings::SettingsService;

/// Region tag sent with every registration.
pub const HOST_REGION: &str = "local";

const REGISTER_TIMEOUT: Duration = Duration::from_secs(15);

// ─── Types ──────────────────────────────────────────────────────────────────

/// What the backend account learns about this machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostDescriptor {
    pub machine_name: String,
    pub os_name: String,
    pub os_version: String,
    pub arch: String,
    pub region: String,
}

impl HostDescriptor {
    /// Describe the local machine.
    pub fn detect() -> Self {
        Self {
            machine_name: System::host_name().unwrap_or_else(|| "unknown-host".to_string()),
            os_name: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            os_version: System::long_os_version()
                .or_else(System::os_version)
                .unwrap_or_else(|| "Unknown".to_string()),
            arch: std::env::consts::ARCH.to_string(),
            region: HOST_REGION.to_string(),
        }
    }
}

/// Credentials issued for this host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRegistrationRecord {
    pub host_id: String,
    pub secret_key: String,
}

/// Performs the registration call.
#[async_trait]
pub trait HostRegistrar: Send + Sync {
    async fn register(
        &self,
        client_key: &str,
        host: &HostDescriptor,
    ) -> Result<HostRegistrationRecord, RegistrationError>;
}

// ─── HTTP Registrar ─────────────────────────────────────────────────────────

/// Registrar that posts the descriptor to `{base_url}/hosts/register`.
pub struct HttpHostRegistrar {
    http: reqwest::Client,
    base_url: String,
}

impl HttpHostRegistrar {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RegistrationError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(REGISTER_TIMEOUT)
            .build()
            .map_err(|e| RegistrationError::Transport {
                endpoint: base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http, base_url })
    }
}

#[async_trait]
impl HostRegistrar for HttpHostRegistrar {
    async fn register(
        &self,
        client_key: &str,
        host: &HostDescriptor,
    ) -> Result<HostRegistrationRecord, RegistrationError> {
        let url = format!("{}/hosts/register", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(client_key)
            .json(host)
            .send()
            .await
            .map_err(|e| RegistrationError::Transport {
                endpoint: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistrationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let record: HostRegistrationRecord =
            response
                .json()
                .await
                .map_err(|e| RegistrationError::MalformedResponse {
                    reason: e.to_string(),
                })?;

        if record.host_id.trim().is_empty() || record.secret_key.trim().is_empty() {
            return Err(RegistrationError::MalformedResponse {
                reason: "empty hostId or secretKey".into(),
            });
        }

        Ok(record)
    }
}

// ─── Guard ──────────────────────────────────────────────────────────────────

/// What [`HostRegistrationGuard::ensure_registered`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    NotAuthenticated,
    AlreadyRegistered,
    Registered,
    /// The attempt failed; it will be retried on the next initialization.
    Failed,
}

pub struct HostRegistrationGuard {
    auth: Arc<dyn AuthStateProvider>,
    registrar: Arc<dyn HostRegistrar>,
    settings: Arc<SettingsService>,
}

impl HostRegistrationGuard {
    pub fn new(
        auth: Arc<dyn AuthStateProvider>,
        registrar: Arc<dyn HostRegistrar>,
        settings: Arc<SettingsService>,
    ) -> Self {
        Self {
            auth,
            registrar,
            settings,
        }
    }

    /// Register this machine if authenticated and no secret is stored.
    /// Never fails; see [`RegistrationOutcome`].
    pub async fn ensure_registered(&self) -> RegistrationOutcome {
        let auth = self.auth.auth_state();
        if !auth.is_authenticated() {
            tracing::debug!("host registration skipped: not authenticated");
            return RegistrationOutcome::NotAuthenticated;
        }

        if self.settings.snapshot().await.has_secret_key() {
            tracing::debug!("host registration skipped: secret already stored");
            return RegistrationOutcome::AlreadyRegistered;
        }

        let host = HostDescriptor::detect();
        tracing::info!(
            machine = %host.machine_name,
            os = %host.os_name,
            os_version = %host.os_version,
            account = %auth.account_id,
            "registering local host"
        );

        let record = match self.registrar.register(&auth.client_key, &host).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "host registration failed, will retry on next init");
                return RegistrationOutcome::Failed;
            }
        };

        let stored = self
            .settings
            .update_and_save(|s| {
                s.host_id = Some(record.host_id.clone());
                s.secret_key = Some(record.secret_key.clone());
            })
            .await;
        if let Err(e) = stored {
            tracing::warn!(error = %e, "host registered but settings could not be saved");
            return RegistrationOutcome::Failed;
        }

        tracing::info!(host_id = %record.host_id, "host registered");
        RegistrationOutcome::Registered
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
