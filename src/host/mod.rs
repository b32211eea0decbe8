//! Host identity: authentication state and one-time host registration.

pub mod auth;
pub mod errors;
pub mod registration;

pub use auth::{AuthChannel, AuthState, AuthStateProvider};
pub use errors::RegistrationError;
pub use registration::{
    HostDescriptor, HostRegistrar, HostRegistrationGuard, HostRegistrationRecord,
    HttpHostRegistrar, RegistrationOutcome,
};
