//! Session state and identity provider collaborators

pub mod cleanup;
pub mod idp;
pub mod session;

pub use cleanup::spawn_cleanup_task;
pub use idp::{IdentityProviderClient, IdpConfig, OidcClient};
pub use session::{InMemorySessionStore, Session, SessionId, SessionState, SessionStore};
