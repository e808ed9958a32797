//! The session store: current token + role, shared with every API caller.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{info, warn};

use verse_api::types::StatusAck;
use verse_api::{new_shared_token, ApiClient, ApiError, SharedToken};
use verse_common::Role;

use super::persist::{SessionDisk, SessionFile};

/// Placeholder token for guest sessions.
///
/// This is the backend's dev-bypass token: it gives the session API-shape
/// compatibility (requests carry a bearer header) but no real authorization.
/// Server-side checks remain the actual gate.
pub const GUEST_TOKEN: &str = "mock-token-123";

/// Identity recorded for guest sessions.
pub const GUEST_IDENTITY: &str = "guest@tradeverse.ai";

/// Errors from session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Login input rejected before any state change.
    #[error("invalid login: {0}")]
    InvalidLogin(String),

    /// The session file could not be written.
    #[error("session persistence failed: {0}")]
    Persist(String),
}

/// An active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token sent with API requests.
    pub token: String,
    /// Identity the token was issued to.
    pub identity: Option<String>,
    /// Capability level.
    pub role: Role,
    /// Whether the session is backed by the on-disk file.
    pub persisted: bool,
}

/// Backend seam for session teardown, mockable in tests.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn logout(&self) -> Result<StatusAck, ApiError>;
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn logout(&self) -> Result<StatusAck, ApiError> {
        ApiClient::logout(self).await
    }
}

/// Holds the current session and keeps the shared token slot in sync.
pub struct SessionStore {
    inner: RwLock<Option<Session>>,
    token: SharedToken,
    disk: SessionDisk,
    operators: Vec<String>,
}

impl SessionStore {
    pub fn new(disk: SessionDisk, operators: Vec<String>) -> Self {
        Self {
            inner: RwLock::new(None),
            token: new_shared_token(),
            disk,
            operators,
        }
    }

    /// The token slot to hand to the API client.
    pub fn shared_token(&self) -> SharedToken {
        Arc::clone(&self.token)
    }

    /// Current session, if any.
    pub fn current(&self) -> Option<Session> {
        self.inner.read().clone()
    }

    /// Current role, if a session is active.
    pub fn role(&self) -> Option<Role> {
        self.inner.read().as_ref().map(|s| s.role)
    }

    /// Whether the current session may request mode/environment transitions.
    pub fn is_privileged(&self) -> bool {
        self.role().is_some_and(|r| r.is_privileged())
    }

    /// Whether the current session is a guest session.
    pub fn is_guest(&self) -> bool {
        self.role().is_some_and(|r| !r.is_authenticated())
    }

    /// Persisted base-URL override, if one was saved.
    pub fn base_url_override(&self) -> Option<String> {
        self.disk.load().base_url
    }

    /// Restore a persisted session at startup.
    ///
    /// Optimistic: no network round-trip — validity is discovered lazily by
    /// the first failing API call. The role is re-derived from what was
    /// persisted: the guest token always restores as guest, a stored role
    /// claim wins otherwise, and absent both the identity is checked against
    /// the operator allow-list with `Authenticated` as the default.
    pub fn restore(&self) -> Option<Session> {
        let file = self.disk.load();
        let token = file.token?;

        let role = if token == GUEST_TOKEN {
            Role::Guest
        } else if let Some(claimed) = file.role {
            claimed
        } else {
            self.resolve_role(file.identity.as_deref())
        };

        let session = Session {
            token: token.clone(),
            identity: file.identity,
            role,
            persisted: true,
        };

        *self.token.write() = Some(token);
        *self.inner.write() = Some(session.clone());

        info!(role = %role, "Restored persisted session");
        Some(session)
    }

    /// Establish a session from a login token.
    ///
    /// `claimed_role` is the role claim returned by the auth backend, when
    /// it supplies one; otherwise the identity is compared against the
    /// operator allow-list. A failed login leaves any prior session
    /// untouched.
    pub fn login(
        &self,
        token: &str,
        identity: &str,
        claimed_role: Option<Role>,
    ) -> Result<Session, SessionError> {
        if token.trim().is_empty() {
            return Err(SessionError::InvalidLogin("empty token".to_string()));
        }

        let role = claimed_role.unwrap_or_else(|| self.resolve_role(Some(identity)));
        let session = Session {
            token: token.to_string(),
            identity: Some(identity.to_string()),
            role,
            persisted: true,
        };

        // Persist first: if the disk write fails the prior session stays
        // intact in memory and on disk.
        self.persist(&session)?;

        *self.token.write() = Some(session.token.clone());
        *self.inner.write() = Some(session.clone());

        info!(role = %role, identity, "Logged in");
        Ok(session)
    }

    /// Establish a reduced-capability guest session with the placeholder
    /// token.
    pub fn guest_login(&self) -> Result<Session, SessionError> {
        let session = Session {
            token: GUEST_TOKEN.to_string(),
            identity: Some(GUEST_IDENTITY.to_string()),
            role: Role::Guest,
            persisted: true,
        };

        self.persist(&session)?;

        *self.token.write() = Some(session.token.clone());
        *self.inner.write() = Some(session.clone());

        info!("Started guest session");
        Ok(session)
    }

    /// End the session: best-effort backend notify, then unconditional
    /// local clear. The local clear happens even when the network call
    /// errors.
    pub async fn logout<A: AuthApi + ?Sized>(&self, api: &A) {
        match api.logout().await {
            Ok(ack) if ack.is_success() => info!("Backend acknowledged logout"),
            Ok(ack) => warn!(status = %ack.status, "Backend logout returned non-success"),
            Err(e) => warn!(error = %e, "Backend logout failed; clearing local session anyway"),
        }
        self.clear_local();
    }

    /// Clear the in-memory session, the shared token slot, and the persisted
    /// token/role. The base-URL override survives.
    pub fn clear_local(&self) {
        *self.inner.write() = None;
        *self.token.write() = None;

        let mut file = self.disk.load();
        file.token = None;
        file.identity = None;
        file.role = None;
        if let Err(e) = self.disk.save(&file) {
            // Memory state is already cleared; the stale file only means the
            // next restore() picks up a token the backend will reject.
            warn!(error = %e, "Failed to clear persisted session");
        }
    }

    fn resolve_role(&self, identity: Option<&str>) -> Role {
        match identity {
            Some(id) if self.operators.iter().any(|op| op == id) => Role::Privileged,
            _ => Role::Authenticated,
        }
    }

    fn persist(&self, session: &Session) -> Result<(), SessionError> {
        let mut file = self.disk.load();
        file.token = Some(session.token.clone());
        file.identity = session.identity.clone();
        file.role = Some(session.role);
        self.disk
            .save(&file)
            .map_err(|e| SessionError::Persist(e.to_string()))
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("role", &self.role())
            .field("path", &self.disk.path())
            .finish()
    }
}
