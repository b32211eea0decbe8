//! Authentication state as seen by this crate.
//!
//! The code-exchange flow that produces the state lives elsewhere. Here it is
//! read-only: a provider hands out the current [`AuthState`] and changes are
//! delivered through a `watch` channel rather than callbacks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthState {
    pub client_key: String,
    pub key_expiration: Option<DateTime<Utc>>,
    pub user_name: String,
    pub account_name: String,
    pub account_id: String,
    pub user_email: String,
}

impl AuthState {
    /// Authenticated iff a client key is present and has not expired.
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(Utc::now())
    }

    pub fn is_authenticated_at(&self, now: DateTime<Utc>) -> bool {
        !self.client_key.is_empty() && self.key_expiration.map_or(true, |exp| exp > now)
    }
}

pub trait AuthStateProvider: Send + Sync {
    fn auth_state(&self) -> AuthState;
}

/// Auth state holder that publishes every change to subscribers.
#[derive(Debug)]
pub struct AuthChannel {
    sender: watch::Sender<AuthState>,
}

impl AuthChannel {
    pub fn new(initial: AuthState) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Replace the state and notify subscribers. Returns whether the
    /// authenticated flag flipped.
    pub fn publish(&self, state: AuthState) -> bool {
        let was_authenticated = self.sender.borrow().is_authenticated();
        let now_authenticated = state.is_authenticated();
        self.sender.send_replace(state);
        if was_authenticated != now_authenticated {
            tracing::info!(authenticated = now_authenticated, "auth state changed");
        }
        was_authenticated != now_authenticated
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.sender.subscribe()
    }
}

impl Default for AuthChannel {
    fn default() -> Self {
        Self::new(AuthState::default())
    }
}

impl AuthStateProvider for AuthChannel {
    fn auth_state(&self) -> AuthState {
        self.sender.borrow().clone()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
