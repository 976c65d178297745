//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::Repository;
use crate::services::auth::TokenCodec;

/// Application state shared across all handlers.
///
/// Cheap to clone; handlers borrow the repository and token codec from it
/// to build per-request services.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    repo: Arc<dyn Repository>,
    tokens: TokenCodec,
}

impl AppState {
    /// Create the state from configuration and a storage backend.
    #[must_use]
    pub fn new(config: ApiConfig, repo: Arc<dyn Repository>) -> Self {
        let tokens = TokenCodec::new(&config.jwt_secret, config.token_ttl);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                repo,
                tokens,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// The storage backend.
    #[must_use]
    pub fn repo(&self) -> &dyn Repository {
        self.inner.repo.as_ref()
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenCodec {
        &self.inner.tokens
    }
}
