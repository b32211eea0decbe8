//! Host registration error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The registration endpoint could not be reached.
    #[error("registration request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    /// Non-2xx response from the registration endpoint.
    #[error("registration rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The response did not carry a usable host id and secret.
    #[error("malformed registration response: {reason}")]
    MalformedResponse { reason: String },
}
