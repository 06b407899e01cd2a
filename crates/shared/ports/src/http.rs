use async_trait::async_trait;
use qxlink_core::Session;
use serde_json::Value;

use crate::HttpError;

/// Port for the broker's REST endpoints
///
/// Only account settings are needed by the client; the session supplies the
/// cookies and user agent the request must carry.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get_settings(&self, session: &Session) -> Result<Value, HttpError>;
}
