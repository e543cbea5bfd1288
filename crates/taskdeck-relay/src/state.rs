use std::sync::Arc;

use taskdeck_auth::AuthFacade;

use crate::config::RelayConfig;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    /// `None` when no OAuth client is configured; `/auth/start` then
    /// answers 503.
    pub auth: Option<Arc<AuthFacade>>,
}

impl AppState {
    pub fn new(config: RelayConfig, auth: Option<AuthFacade>) -> Self {
        Self {
            config: Arc::new(config),
            auth: auth.map(Arc::new),
        }
    }
}
