//! MOCK / LIVE environment switching.
//!
//! LIVE is gated: only a privileged, non-guest session with an active broker
//! connection may enter it. MOCK always succeeds locally and forces a
//! logout-then-guest-login sequence so a live-capable session never lingers
//! after the environment is demoted.
//!
//! A consistency watch consumes the settings poller's snapshots: observing
//! `angel_connected: false` while LIVE is an inconsistent state and triggers
//! the same demotion, plus a corrective settings update.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use verse_api::types::{SettingsSnapshot, SettingsUpdate, UpdateAck};
use verse_api::{ApiClient, ApiError};
use verse_common::Environment;

use crate::poller::PollSnapshot;
use crate::session::{AuthApi, SessionStore};
use crate::state::GlobalState;

/// Backend seam for the settings endpoints, mockable in tests.
#[async_trait]
pub trait SettingsPlane: Send + Sync + 'static {
    async fn get_settings(&self) -> Result<SettingsSnapshot, ApiError>;
    async fn update_settings(&self, update: &SettingsUpdate) -> Result<UpdateAck, ApiError>;
}

#[async_trait]
impl SettingsPlane for ApiClient {
    async fn get_settings(&self) -> Result<SettingsSnapshot, ApiError> {
        ApiClient::get_settings(self).await
    }

    async fn update_settings(&self, update: &SettingsUpdate) -> Result<UpdateAck, ApiError> {
        ApiClient::update_settings(self, update).await
    }
}

/// Errors from environment transitions.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    /// LIVE requires a privileged (and therefore non-guest) session.
    /// Raised before any network call.
    #[error("switching to LIVE requires a privileged operator session")]
    NotPrivileged,

    /// The backend reports no active broker connection; the caller should
    /// route the user to the connection/setup flow instead of switching.
    #[error("broker connection is not active; complete the connection flow first")]
    BrokerOffline,

    /// Backend acknowledged with a non-success status or an unverified
    /// broker link.
    #[error("environment change rejected: {0}")]
    Rejected(String),

    /// The backend call itself failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Drives MOCK / LIVE transitions and the LIVE-consistency invariant.
pub struct EnvironmentController<C> {
    api: Arc<C>,
    session: Arc<SessionStore>,
    state: Arc<GlobalState>,
}

impl<C: SettingsPlane + AuthApi + 'static> EnvironmentController<C> {
    pub fn new(api: Arc<C>, session: Arc<SessionStore>, state: Arc<GlobalState>) -> Self {
        Self {
            api,
            session,
            state,
        }
    }

    /// Current environment.
    pub fn environment(&self) -> Environment {
        self.state.control.environment()
    }

    /// Switch to LIVE.
    ///
    /// Gates, in order: privileged session (no network call when this
    /// fails), then a fresh settings fetch must report an active broker
    /// connection. The switch is optimistic and rolled back when the
    /// backend does not acknowledge it with a verified broker link.
    pub async fn switch_to_live(&self) -> Result<(), EnvironmentError> {
        if !self.session.is_privileged() {
            return Err(EnvironmentError::NotPrivileged);
        }

        let snapshot = self.api.get_settings().await?;
        if !snapshot.angel_connected {
            return Err(EnvironmentError::BrokerOffline);
        }

        self.state.control.set_environment(Environment::Live);

        match self
            .api
            .update_settings(&SettingsUpdate::environment(Environment::Live))
            .await
        {
            Ok(ack) if ack.is_success() && ack.broker_connected => {
                info!("environment switched to LIVE");
                Ok(())
            }
            Ok(ack) => {
                self.state.control.set_environment(Environment::Mock);
                self.state.metrics.record_rollback();
                Err(EnvironmentError::Rejected(ack.error.unwrap_or_else(|| {
                    "broker link could not be verified".to_string()
                })))
            }
            Err(e) => {
                self.state.control.set_environment(Environment::Mock);
                self.state.metrics.record_rollback();
                Err(EnvironmentError::Api(e))
            }
        }
    }

    /// Switch to MOCK.
    ///
    /// Always succeeds locally: the environment flag flips, a corrective
    /// settings update is sent best-effort, and the session is demoted to
    /// guest via logout-then-guest-login so no live-capable token lingers.
    pub async fn switch_to_mock(&self) {
        self.state.control.set_environment(Environment::Mock);

        if let Err(e) = self
            .api
            .update_settings(&SettingsUpdate::environment(Environment::Mock))
            .await
        {
            warn!(error = %e, "corrective MOCK update failed; continuing locally");
        }

        self.session.logout(self.api.as_ref()).await;
        if let Err(e) = self.session.guest_login() {
            warn!(error = %e, "guest login after demotion failed to persist");
        }

        info!("environment demoted to MOCK with a guest session");
    }

    /// Watch the settings poller for the LIVE-consistency invariant.
    ///
    /// If a snapshot reports `angel_connected: false` while the environment
    /// is LIVE, the client treats the state as inconsistent and demotes to
    /// MOCK.
    pub fn spawn_consistency_watch(
        self: &Arc<Self>,
        mut rx: watch::Receiver<Option<PollSnapshot<SettingsSnapshot>>>,
    ) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let snapshot = rx.borrow().as_ref().map(|s| s.value.clone());
                let Some(settings) = snapshot else { continue };

                if this.environment().is_live() && !settings.angel_connected {
                    warn!("broker connection lost while LIVE; forcing MOCK");
                    this.switch_to_mock().await;
                }
            }
        })
    }
}

impl<C> std::fmt::Debug for EnvironmentController<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentController")
            .field("environment", &self.state.control.environment())
            .finish()
    }
}
