use async_trait::async_trait;
use serde_json::Value;

use super::ApiError;

/// Raw network access used by the sync manager and the data-access layer.
///
/// Both calls reject on a non-2xx status or a network failure. Paths are
/// relative to the API base (see [`crate::api::routes`]).
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `path` and return the decoded JSON body
    async fn perform_read(&self, path: &str) -> Result<Value, ApiError>;

    /// POST `body` as JSON to `path` and return the decoded JSON body
    async fn perform_write(&self, path: &str, body: &Value) -> Result<Value, ApiError>;
}
