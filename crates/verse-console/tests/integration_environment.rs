//! Integration tests for the environment switch.
//!
//! These verify the MOCK/LIVE gating and the LIVE-consistency invariant
//! against a mock settings backend:
//! - MOCK demotion always ends with a guest session
//! - LIVE is blocked for non-privileged sessions and offline brokers
//! - A broker disconnect observed while LIVE forces MOCK

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;

use verse_api::types::{SettingsSnapshot, SettingsUpdate, StatusAck, UpdateAck};
use verse_api::ApiError;
use verse_common::{Environment, Role};
use verse_console::environment::{EnvironmentController, EnvironmentError, SettingsPlane};
use verse_console::poller::PollSnapshot;
use verse_console::session::{AuthApi, SessionDisk, SessionStore};
use verse_console::state::GlobalState;

/// Mock settings + auth backend.
#[derive(Default)]
struct MockBackend {
    settings_calls: AtomicUsize,
    update_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    /// Broker link state reported by get_settings.
    broker_connected: AtomicBool,
    /// Fail update_settings with a transport error.
    fail_update: AtomicBool,
    /// Report an unverified broker link in the update ack.
    ack_without_broker: AtomicBool,
    /// Environments requested through update_settings, in order.
    update_envs: Mutex<Vec<Option<Environment>>>,
}

fn snapshot_with(env: Environment, connected: bool) -> SettingsSnapshot {
    serde_json::from_value(serde_json::json!({
        "env": env.as_str(),
        "active_broker": "ANGEL",
        "angel_connected": connected,
        "broker_status": if connected { "CONNECTED" } else { "DISCONNECTED" },
        "mode": "MANUAL"
    }))
    .unwrap()
}

#[async_trait]
impl SettingsPlane for MockBackend {
    async fn get_settings(&self) -> Result<SettingsSnapshot, ApiError> {
        self.settings_calls.fetch_add(1, Ordering::SeqCst);
        let connected = self.broker_connected.load(Ordering::SeqCst);
        Ok(snapshot_with(Environment::Mock, connected))
    }

    async fn update_settings(&self, update: &SettingsUpdate) -> Result<UpdateAck, ApiError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.update_envs.lock().unwrap().push(update.env);
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 503,
                body: "backend unavailable".to_string(),
            });
        }
        let broker_connected = !self.ack_without_broker.load(Ordering::SeqCst);
        Ok(UpdateAck {
            status: "success".to_string(),
            env: update.env.unwrap_or_default(),
            active_broker: Some("ANGEL".to_string()),
            broker_connected,
            error: None,
        })
    }
}

#[async_trait]
impl AuthApi for MockBackend {
    async fn logout(&self) -> Result<StatusAck, ApiError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        Ok(StatusAck {
            status: "success".to_string(),
            message: None,
        })
    }
}

fn temp_dir(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("verse-it-env-{tag}-{}", uuid::Uuid::new_v4()))
}

fn setup(
    dir: &PathBuf,
    role: Role,
) -> (
    Arc<MockBackend>,
    Arc<SessionStore>,
    Arc<GlobalState>,
    Arc<EnvironmentController<MockBackend>>,
) {
    let api = Arc::new(MockBackend::default());
    let store = Arc::new(SessionStore::new(
        SessionDisk::at(dir.join("session.json")),
        Vec::new(),
    ));
    match role {
        Role::Guest => {
            store.guest_login().unwrap();
        }
        role => {
            store.login("tok-env", "trader@example.com", Some(role)).unwrap();
        }
    }
    let state = Arc::new(GlobalState::new());
    let ctl = Arc::new(EnvironmentController::new(
        Arc::clone(&api),
        Arc::clone(&store),
        Arc::clone(&state),
    ));
    (api, store, state, ctl)
}

// ============================================================================
// MOCK demotion
// ============================================================================

#[tokio::test]
async fn test_switch_to_mock_always_ends_as_guest() {
    let dir = temp_dir("mock-guest");
    let (api, store, state, ctl) = setup(&dir, Role::Privileged);
    state.control.set_environment(Environment::Live);

    ctl.switch_to_mock().await;

    // Regardless of the prior (privileged) role, the session is now guest.
    assert_eq!(store.role(), Some(Role::Guest));
    assert_eq!(state.control.environment(), Environment::Mock);
    assert_eq!(api.logout_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        *api.update_envs.lock().unwrap(),
        vec![Some(Environment::Mock)]
    );

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_switch_to_mock_succeeds_locally_when_update_fails() {
    let dir = temp_dir("mock-offline");
    let (api, store, state, ctl) = setup(&dir, Role::Privileged);
    api.fail_update.store(true, Ordering::SeqCst);
    state.control.set_environment(Environment::Live);

    ctl.switch_to_mock().await;

    assert_eq!(state.control.environment(), Environment::Mock);
    assert_eq!(store.role(), Some(Role::Guest));

    let _ = std::fs::remove_dir_all(dir);
}

// ============================================================================
// LIVE gating
// ============================================================================

#[tokio::test]
async fn test_live_blocked_for_guest_without_network_call() {
    let dir = temp_dir("live-guest");
    let (api, _store, state, ctl) = setup(&dir, Role::Guest);
    api.broker_connected.store(true, Ordering::SeqCst);

    let err = ctl.switch_to_live().await.unwrap_err();
    assert!(matches!(err, EnvironmentError::NotPrivileged));
    assert_eq!(api.settings_calls.load(Ordering::SeqCst), 0);
    assert_eq!(api.update_calls.load(Ordering::SeqCst), 0);
    assert_eq!(state.control.environment(), Environment::Mock);

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_live_blocked_when_broker_offline() {
    let dir = temp_dir("live-offline");
    let (api, _store, state, ctl) = setup(&dir, Role::Privileged);
    api.broker_connected.store(false, Ordering::SeqCst);

    let err = ctl.switch_to_live().await.unwrap_err();
    assert!(matches!(err, EnvironmentError::BrokerOffline));
    // The connectivity check ran but no switch was attempted.
    assert_eq!(api.settings_calls.load(Ordering::SeqCst), 1);
    assert_eq!(api.update_calls.load(Ordering::SeqCst), 0);
    assert_eq!(state.control.environment(), Environment::Mock);

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_live_switch_succeeds_with_connected_broker() {
    let dir = temp_dir("live-ok");
    let (api, _store, state, ctl) = setup(&dir, Role::Privileged);
    api.broker_connected.store(true, Ordering::SeqCst);

    ctl.switch_to_live().await.unwrap();
    assert_eq!(state.control.environment(), Environment::Live);
    assert_eq!(
        *api.update_envs.lock().unwrap(),
        vec![Some(Environment::Live)]
    );

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_live_switch_rolls_back_on_unverified_ack() {
    let dir = temp_dir("live-unverified");
    let (api, _store, state, ctl) = setup(&dir, Role::Privileged);
    api.broker_connected.store(true, Ordering::SeqCst);
    api.ack_without_broker.store(true, Ordering::SeqCst);

    let err = ctl.switch_to_live().await.unwrap_err();
    assert!(matches!(err, EnvironmentError::Rejected(_)));
    assert_eq!(state.control.environment(), Environment::Mock);
    assert_eq!(state.metrics.snapshot().mutations_rolled_back, 1);

    let _ = std::fs::remove_dir_all(dir);
}

// ============================================================================
// LIVE-consistency watch
// ============================================================================

#[tokio::test]
async fn test_broker_disconnect_while_live_forces_mock() {
    let dir = temp_dir("watch");
    let (api, store, state, ctl) = setup(&dir, Role::Privileged);
    state.control.set_environment(Environment::Live);

    let (tx, rx) = watch::channel(None);
    let watch_task = ctl.spawn_consistency_watch(rx);

    // A healthy snapshot changes nothing.
    tx.send(Some(PollSnapshot {
        seq: 1,
        value: snapshot_with(Environment::Live, true),
        fetched_at: Utc::now(),
    }))
    .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(state.control.environment(), Environment::Live);
    assert_eq!(store.role(), Some(Role::Privileged));

    // Broker drops while LIVE: inconsistent state, demote to MOCK.
    tx.send(Some(PollSnapshot {
        seq: 2,
        value: snapshot_with(Environment::Live, false),
        fetched_at: Utc::now(),
    }))
    .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(state.control.environment(), Environment::Mock);
    assert_eq!(store.role(), Some(Role::Guest));
    // Corrective update was issued.
    assert!(api
        .update_envs
        .lock()
        .unwrap()
        .contains(&Some(Environment::Mock)));

    watch_task.abort();
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_disconnect_while_mock_is_ignored() {
    let dir = temp_dir("watch-mock");
    let (api, store, _state, ctl) = setup(&dir, Role::Privileged);

    let (tx, rx) = watch::channel(None);
    let watch_task = ctl.spawn_consistency_watch(rx);

    tx.send(Some(PollSnapshot {
        seq: 1,
        value: snapshot_with(Environment::Mock, false),
        fetched_at: Utc::now(),
    }))
    .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Nothing demoted, nothing sent.
    assert_eq!(store.role(), Some(Role::Privileged));
    assert_eq!(api.update_calls.load(Ordering::SeqCst), 0);

    watch_task.abort();
    let _ = std::fs::remove_dir_all(dir);
}
