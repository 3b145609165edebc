use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of a deferred write. The backend only takes POSTs for mutations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationMethod {
    #[default]
    #[serde(rename = "POST")]
    Post,
}

/// A write that failed to reach the server and waits for replay.
///
/// Older queues were written without `id`/`method` and with
/// `timestamp`/`retries`; both shapes load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMutation {
    #[serde(default = "uuid::Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub method: MutationMethod,
    pub path: String,
    #[serde(default)]
    pub body: Value,
    #[serde(
        rename = "enqueuedEpochMillis",
        alias = "timestamp",
        with = "chrono::serde::ts_milliseconds"
    )]
    pub enqueued_at: DateTime<Utc>,
    #[serde(rename = "retryCount", alias = "retries", default)]
    pub retry_count: u32,
}

impl PendingMutation {
    pub fn new(path: impl Into<String>, body: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            method: MutationMethod::Post,
            path: path.into(),
            body,
            enqueued_at: Utc::now(),
            retry_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_mutation_starts_fresh() {
        let mutation = PendingMutation::new("/item_update/1/2", json!({"status": "collected"}));
        assert_eq!(mutation.retry_count, 0);
        assert_eq!(mutation.method, MutationMethod::Post);
        assert!((Utc::now() - mutation.enqueued_at).num_seconds() < 5);
    }

    #[test]
    fn test_wire_format() {
        let mutation = PendingMutation::new("/list_complete/abc123", json!({}));
        let encoded = serde_json::to_value(&mutation).unwrap();
        assert_eq!(encoded["method"], json!("POST"));
        assert_eq!(encoded["path"], json!("/list_complete/abc123"));
        assert_eq!(encoded["retryCount"], json!(0));
        assert_eq!(
            encoded["enqueuedEpochMillis"],
            json!(mutation.enqueued_at.timestamp_millis())
        );
        assert_eq!(encoded["id"], json!(mutation.id.to_string()));
    }

    #[test]
    fn test_loads_legacy_entries() {
        let legacy = json!([{
            "method": "POST",
            "path": "/item_update/1/2",
            "body": {"status": "unavailable"},
            "timestamp": 1_700_000_000_000i64,
            "retries": 2
        }]);
        let queue: Vec<PendingMutation> = serde_json::from_value(legacy).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].retry_count, 2);
        assert_eq!(queue[0].enqueued_at.timestamp_millis(), 1_700_000_000_000);
        assert!(!queue[0].id.is_nil());
    }
}
