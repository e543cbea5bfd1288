//! OAuth authorization-code flow against the CRM accounts service, with
//! persisted and auto-refreshed tokens.

pub mod config;
pub mod error;
pub mod facade;
pub mod tokens;

pub use config::AuthConfig;
pub use error::AuthError;
pub use facade::{AuthFacade, AuthRequest};
pub use tokens::{FileTokenStore, MemoryTokenStore, TokenSet, TokenStore};
