//! Expired session cleanup.

use std::sync::Arc;

use tracing::info;

use idguard_core::clock::Clock;
use idguard_core::config::session::SessionConfig;
use idguard_core::result::AppResult;
use idguard_store::IdentityStore;

/// Deletes sessions that have passed either timeout.
///
/// Purely an optimization: validation fails closed on expired sessions
/// whether or not cleanup has run. Safe to call concurrently and
/// repeatedly.
#[derive(Clone)]
pub struct SessionCleanup {
    /// Session persistence.
    store: Arc<dyn IdentityStore>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Timeout configuration.
    config: SessionConfig,
}

impl std::fmt::Debug for SessionCleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCleanup").finish()
    }
}

impl SessionCleanup {
    /// Creates a new cleanup handler.
    pub fn new(store: Arc<dyn IdentityStore>, clock: Arc<dyn Clock>, config: SessionConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Runs one cleanup cycle, returning the number of sessions removed.
    pub async fn run_cleanup(&self) -> AppResult<u64> {
        let removed = self
            .store
            .delete_expired_sessions(
                self.clock.now(),
                self.config.idle_timeout(),
                self.config.absolute_timeout(),
            )
            .await?;

        if removed > 0 {
            info!(removed, "Expired sessions cleaned up");
        }
        Ok(removed)
    }
}
