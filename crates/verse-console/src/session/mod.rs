//! Session lifecycle: token, role, and durable local persistence.
//!
//! The session store owns the one token slot shared with the API client.
//! Pollers read it; only the store and the mode/environment controllers
//! mutate it, through the transitions defined here.
//!
//! ## Usage
//!
//! ```ignore
//! let disk = SessionDisk::at(state_dir.join("session.json"));
//! let store = SessionStore::new(disk, config.operators.clone());
//!
//! // Pick up a persisted session (optimistic; validity is discovered by
//! // the first failing API call) or fall back to a guest session.
//! let session = match store.restore() {
//!     Some(s) => s,
//!     None => store.guest_login()?,
//! };
//!
//! // On shutdown: best-effort backend notify, unconditional local clear.
//! store.logout(api.as_ref()).await;
//! ```

pub mod persist;
pub mod store;

pub use persist::{SessionDisk, SessionFile};
pub use store::{AuthApi, Session, SessionError, SessionStore, GUEST_IDENTITY, GUEST_TOKEN};
