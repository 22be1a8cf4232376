//! Session creation, validation, and removal.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use idguard_core::clock::Clock;
use idguard_core::config::session::SessionConfig;
use idguard_core::result::AppResult;
use idguard_entity::session::{ExpiryCause, Session};
use idguard_store::IdentityStore;

use crate::token::{self, TokenSigner};

/// Outcome of checking a presented session token.
///
/// Every non-valid outcome fails closed: the session record (if any) has
/// already been deleted by the time the caller sees it.
#[derive(Debug)]
pub enum SessionCheck {
    /// The session is valid; `last_activity` has been refreshed.
    Valid(Session),
    /// No session exists for the token.
    Missing,
    /// The stored integrity tag did not verify. The record was deleted.
    BadSignature,
    /// The session passed a timeout. The record was deleted.
    Expired {
        /// The expired session, for audit attribution.
        session: Session,
        /// Which clock ran out.
        cause: ExpiryCause,
    },
}

/// Manages the session table: token issuance, validation, and removal.
///
/// Owner-account checks (active, not locked) are the caller's concern;
/// this type only knows tokens, signatures, and the two expiry clocks.
#[derive(Clone)]
pub struct SessionManager {
    /// Session persistence (lives in the identity store).
    store: Arc<dyn IdentityStore>,
    /// Integrity tag signer.
    signer: TokenSigner,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Timeout configuration.
    config: SessionConfig,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .finish()
    }
}

impl SessionManager {
    /// Creates a new session manager.
    pub fn new(
        store: Arc<dyn IdentityStore>,
        signer: TokenSigner,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            signer,
            clock,
            config,
        }
    }

    /// Issues a new session for the user: fresh random token, integrity
    /// tag, both clocks starting now.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        source_address: Option<String>,
    ) -> AppResult<Session> {
        let token = token::generate_token();
        let signature = self.signer.sign(&token, user_id);
        let now = self.clock.now();

        let session = Session {
            token,
            user_id,
            signature,
            source_address,
            created_at: now,
            last_activity: now,
        };

        self.store.insert_session(&session).await?;
        Ok(session)
    }

    /// Checks a presented token against the session table.
    ///
    /// Fails closed: unknown tokens report [`SessionCheck::Missing`]; a
    /// bad signature or an elapsed timeout deletes the record before
    /// returning. On success the idle clock is reset.
    pub async fn check(&self, token: &str) -> AppResult<SessionCheck> {
        let Some(mut session) = self.store.find_session(token).await? else {
            return Ok(SessionCheck::Missing);
        };

        if !self
            .signer
            .verify(&session.token, session.user_id, &session.signature)
        {
            warn!(user_id = %session.user_id, "Session signature verification failed");
            self.store.delete_session(token).await?;
            return Ok(SessionCheck::BadSignature);
        }

        let now = self.clock.now();
        if let Some(cause) = session.expired_by(
            now,
            self.config.idle_timeout(),
            self.config.absolute_timeout(),
        ) {
            self.store.delete_session(token).await?;
            return Ok(SessionCheck::Expired { session, cause });
        }

        self.store.touch_session(token, now).await?;
        session.last_activity = now;
        Ok(SessionCheck::Valid(session))
    }

    /// Deletes a session. Idempotent; returns whether a session existed.
    pub async fn remove(&self, token: &str) -> AppResult<bool> {
        self.store.delete_session(token).await
    }

    /// Deletes every session belonging to the user, returning the count.
    pub async fn remove_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        self.store.delete_sessions_for_user(user_id).await
    }

    /// The sessions currently inside both timeout windows.
    pub async fn list_active(&self) -> AppResult<Vec<Session>> {
        let now = self.clock.now();
        let sessions = self.store.list_sessions().await?;
        Ok(sessions
            .into_iter()
            .filter(|s| {
                s.expired_by(
                    now,
                    self.config.idle_timeout(),
                    self.config.absolute_timeout(),
                )
                .is_none()
            })
            .collect())
    }
}
