//! Server state management.

use std::sync::Arc;

use smartnotes_core::config::AuthConfig;
use smartnotes_core::review::ReviewService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReviewService>,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(service: ReviewService, auth: AuthConfig) -> Self {
        Self {
            service: Arc::new(service),
            auth: Arc::new(auth),
        }
    }

    /// Owner for a bearer token, if the token is known.
    pub fn owner_for(&self, token: &str) -> Option<String> {
        self.auth.owner_for(token).map(str::to_string)
    }
}
