//! Auth endpoints.

use serde_json::json;

use crate::client::{ApiClient, ApiError};
use crate::types::StatusAck;

impl ApiClient {
    /// Best-effort session teardown (`POST /api/auth/logout`).
    ///
    /// The backend is stateless about sessions today; the call exists so the
    /// server can clear future session state. Callers must clear local state
    /// regardless of this call's outcome.
    pub async fn logout(&self) -> Result<StatusAck, ApiError> {
        self.post_json("/api/auth/logout", &json!({})).await
    }
}
