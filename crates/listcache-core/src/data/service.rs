use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::routes;
use crate::api::ApiError;
use crate::models::{ItemStatus, NewListItem, ShoppingList};
use crate::offline::SyncManager;

#[derive(Error, Debug)]
pub enum DataError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Unexpected data from backend: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Data returned by a read, and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome<T> {
    Live(T),
    Cached { data: T, cached_at: DateTime<Utc> },
}

impl<T> ReadOutcome<T> {
    pub fn data(&self) -> &T {
        match self {
            ReadOutcome::Live(data) => data,
            ReadOutcome::Cached { data, .. } => data,
        }
    }

    pub fn into_data(self) -> T {
        match self {
            ReadOutcome::Live(data) => data,
            ReadOutcome::Cached { data, .. } => data,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, ReadOutcome::Cached { .. })
    }
}

/// Result of a write: confirmed by the backend, or parked in the queue.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Applied(Value),
    Queued { id: Uuid },
}

impl WriteOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, WriteOutcome::Queued { .. })
    }
}

pub struct ListService {
    manager: Arc<SyncManager>,
    shop_id: String,
}

impl ListService {
    pub fn new(manager: Arc<SyncManager>, shop_id: impl Into<String>) -> Self {
        Self {
            manager,
            shop_id: shop_id.into(),
        }
    }

    pub fn manager(&self) -> &Arc<SyncManager> {
        &self.manager
    }

    pub fn shop_id(&self) -> &str {
        &self.shop_id
    }

    fn decode_lists(records: &[Value]) -> Result<Vec<ShoppingList>, DataError> {
        records
            .iter()
            .map(|record| serde_json::from_value(record.clone()).map_err(DataError::from))
            .collect()
    }

    // ===== Reads =====

    /// Fetch all lists for the shop, caching them on success
    pub async fn fetch_lists(&self) -> Result<ReadOutcome<Vec<ShoppingList>>, DataError> {
        let path = routes::lists_route(&self.shop_id);

        match self.manager.transport().perform_read(&path).await {
            Ok(value) => {
                let records: Vec<Value> = serde_json::from_value(value)?;
                let lists = Self::decode_lists(&records)?;
                self.manager.record_snapshot(records);
                debug!(count = lists.len(), "Fetched lists");
                Ok(ReadOutcome::Live(lists))
            }
            Err(e) => {
                let Some(snapshot) = self.manager.load_snapshot() else {
                    return Err(e.into());
                };
                warn!(error = %e, age = %snapshot.age_display(), "Fetching lists failed, using cached data");
                Ok(ReadOutcome::Cached {
                    data: Self::decode_lists(&snapshot.records)?,
                    cached_at: snapshot.last_sync,
                })
            }
        }
    }

    /// Fetch one list, falling back to its record in the cached snapshot
    pub async fn fetch_list(&self, list_id: &str) -> Result<ReadOutcome<ShoppingList>, DataError> {
        let path = routes::list_route(list_id);

        match self.manager.transport().perform_read(&path).await {
            Ok(value) => Ok(ReadOutcome::Live(serde_json::from_value(value)?)),
            Err(e) => {
                let cached = self.manager.load_snapshot().and_then(|snapshot| {
                    let last_sync = snapshot.last_sync;
                    snapshot
                        .records
                        .into_iter()
                        .find(|record| record.get("id").and_then(Value::as_str) == Some(list_id))
                        .map(|record| (record, last_sync))
                });

                let Some((record, cached_at)) = cached else {
                    return Err(e.into());
                };
                warn!(list_id = list_id, error = %e, "Fetching list failed, using cached data");
                Ok(ReadOutcome::Cached {
                    data: serde_json::from_value(record)?,
                    cached_at,
                })
            }
        }
    }

    // ===== Writes =====

    /// POST `body` to `path`; queue it when the backend cannot be reached.
    /// Rejections by a reachable backend are returned, not queued.
    async fn write(&self, path: String, body: Value) -> Result<WriteOutcome, DataError> {
        match self.manager.transport().perform_write(&path, &body).await {
            Ok(response) => Ok(WriteOutcome::Applied(response)),
            Err(e) if e.is_transient() => {
                warn!(path = %path, error = %e, "Write failed, queueing for sync");
                let id = self.manager.enqueue_mutation(path, body);
                Ok(WriteOutcome::Queued { id })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_item(
        &self,
        list_id: &str,
        item_id: &str,
        status: ItemStatus,
    ) -> Result<WriteOutcome, DataError> {
        self.write(
            routes::item_update_route(list_id, item_id),
            json!({ "status": status }),
        )
        .await
    }

    pub async fn complete_list(&self, list_id: &str) -> Result<WriteOutcome, DataError> {
        self.write(routes::list_complete_route(list_id), json!({})).await
    }

    pub async fn create_list(
        &self,
        title: &str,
        items: &[NewListItem],
    ) -> Result<WriteOutcome, DataError> {
        let items: Vec<Value> = items
            .iter()
            .map(|item| {
                json!({
                    "id": format!("item-{}", Uuid::new_v4().simple()),
                    "name": item.name,
                    "qty": item.qty,
                    "status": ItemStatus::Pending,
                    "version": 1,
                })
            })
            .collect();

        self.write(
            routes::list_create_route(&self.shop_id),
            json!({ "title": title.trim(), "items": items }),
        )
        .await
    }

    pub async fn delete_list(&self, list_id: &str) -> Result<WriteOutcome, DataError> {
        self.write(routes::list_delete_route(list_id), json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::testing::{manager_with, Call, MockTransport};

    const SHOP: &str = "NO-TR-001";

    fn service() -> (ListService, Arc<MockTransport>) {
        let transport = MockTransport::new();
        let manager = manager_with(Arc::new(MemoryStore::new()), transport.clone());
        (ListService::new(manager, SHOP), transport)
    }

    fn sample_lists() -> Value {
        json!([
            {"id": "abc123", "title": "Weekly", "status": "open", "items": [
                {"id": "1", "name": "Milk", "status": "pending", "version": 1}
            ]},
            {"id": "def456", "title": "Party", "status": "open", "items": []}
        ])
    }

    #[tokio::test]
    async fn test_fetch_lists_live_records_snapshot() {
        let (service, transport) = service();
        transport.respond_to_read(&routes::lists_route(SHOP), sample_lists());

        let outcome = service.fetch_lists().await.unwrap();

        assert!(!outcome.is_cached());
        assert_eq!(outcome.data().len(), 2);
        assert_eq!(service.manager().read_snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_lists_falls_back_to_cache() {
        let (service, transport) = service();
        transport.respond_to_read(&routes::lists_route(SHOP), sample_lists());
        service.fetch_lists().await.unwrap();

        transport.set_offline(true);
        let outcome = service.fetch_lists().await.unwrap();

        assert!(outcome.is_cached());
        let titles: Vec<_> = outcome.data().iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Weekly", "Party"]);
    }

    #[tokio::test]
    async fn test_fetch_lists_without_cache_propagates_error() {
        let (service, transport) = service();
        transport.set_offline(true);

        let err = service.fetch_lists().await.unwrap_err();
        assert!(matches!(err, DataError::Api(ApiError::ServerError(_))));
    }

    #[tokio::test]
    async fn test_cached_empty_snapshot_is_returned() {
        let (service, transport) = service();
        transport.respond_to_read(&routes::lists_route(SHOP), json!([]));
        service.fetch_lists().await.unwrap();

        transport.set_offline(true);
        let outcome = service.fetch_lists().await.unwrap();
        assert!(outcome.is_cached());
        assert!(outcome.into_data().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_list_falls_back_to_snapshot_record() {
        let (service, transport) = service();
        transport.respond_to_read(&routes::lists_route(SHOP), sample_lists());
        service.fetch_lists().await.unwrap();
        transport.set_offline(true);

        let outcome = service.fetch_list("abc123").await.unwrap();
        assert!(outcome.is_cached());
        assert_eq!(outcome.data().items.len(), 1);
        assert_eq!(outcome.data().item("1").map(|i| i.name.as_str()), Some("Milk"));

        assert!(service.fetch_list("zzz999").await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_list_live() {
        let (service, transport) = service();
        transport.respond_to_read(
            &routes::list_route("abc123"),
            json!({"id": "abc123", "title": "Weekly", "status": "open", "items": []}),
        );

        let outcome = service.fetch_list("abc123").await.unwrap();
        assert_eq!(outcome, ReadOutcome::Live(ShoppingList {
            id: "abc123".into(),
            title: "Weekly".into(),
            status: "open".into(),
            items: vec![],
            completed_at: None,
            completed_by: None,
        }));
    }

    #[tokio::test]
    async fn test_update_item_applied() {
        let (service, transport) = service();

        let outcome = service
            .update_item("abc123", "1", ItemStatus::Collected)
            .await
            .unwrap();

        assert!(matches!(outcome, WriteOutcome::Applied(_)));
        assert_eq!(
            transport.calls(),
            vec![Call::Write("/item_update/abc123/1".into(), json!({"status": "collected"}))]
        );
        assert_eq!(service.manager().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_write_queued_when_backend_unreachable() {
        let (service, transport) = service();
        transport.set_offline(true);

        let outcome = service.complete_list("abc123").await.unwrap();
        assert!(outcome.is_queued());

        let WriteOutcome::Queued { id } = outcome else {
            panic!("expected queued outcome, got {outcome:?}");
        };
        let queue = service.manager().pending_mutations();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, id);
        assert_eq!(queue[0].path, "/list_complete/abc123");
        assert_eq!(queue[0].body, json!({}));
    }

    #[tokio::test]
    async fn test_rejected_write_is_not_queued() {
        let (service, transport) = service();
        transport.fail_next_write(
            "/item_update/abc123/1",
            ApiError::BadRequest("version conflict".into()),
        );

        let err = service
            .update_item("abc123", "1", ItemStatus::Unavailable)
            .await
            .unwrap_err();

        assert!(matches!(err, DataError::Api(ApiError::BadRequest(_))));
        assert_eq!(service.manager().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_create_list_body() {
        let (service, transport) = service();
        let items = vec![
            NewListItem { name: "Milk".into(), qty: 2 },
            NewListItem { name: "Bread".into(), qty: 1 },
        ];

        service.create_list("  Weekly  ", &items).await.unwrap();

        let calls = transport.calls();
        let Call::Write(path, body) = &calls[0] else {
            panic!("expected a write");
        };
        assert_eq!(path, "/list_create?shopId=NO-TR-001");
        assert_eq!(body["title"], json!("Weekly"));
        assert_eq!(body["items"][0]["name"], json!("Milk"));
        assert_eq!(body["items"][0]["qty"], json!(2));
        assert_eq!(body["items"][0]["status"], json!("pending"));
        assert_eq!(body["items"][0]["version"], json!(1));
        assert!(body["items"][1]["id"].as_str().unwrap().starts_with("item-"));
    }

    #[tokio::test]
    async fn test_delete_list_route() {
        let (service, transport) = service();
        service.delete_list("ghi789").await.unwrap();
        assert_eq!(transport.write_paths(), vec!["/list_delete/ghi789?shopId=NO-OS-001"]);
    }
}
