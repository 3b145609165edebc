//! Test doubles shared by the unit tests of this crate.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use crate::api::{ApiError, Transport};
use crate::offline::{SyncManager, SyncSettings};
use crate::storage::{KeyValueStore, MemoryStore, StorageError};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Read(String),
    Write(String, Value),
}

/// Scriptable transport recording every call in order.
#[derive(Default)]
pub struct MockTransport {
    calls: Mutex<Vec<Call>>,
    offline: AtomicBool,
    read_responses: Mutex<HashMap<String, Value>>,
    write_failures: Mutex<HashMap<String, VecDeque<ApiError>>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every call fails with a transient server error while set
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn respond_to_read(&self, path: &str, body: Value) {
        self.read_responses
            .lock()
            .unwrap()
            .insert(path.to_string(), body);
    }

    /// Queue a one-shot failure for the next write to `path`
    pub fn fail_next_write(&self, path: &str, error: ApiError) {
        self.write_failures
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn write_paths(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Write(path, _) => Some(path),
                Call::Read(_) => None,
            })
            .collect()
    }

    fn unreachable() -> ApiError {
        ApiError::ServerError("502 Bad Gateway".to_string())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn perform_read(&self, path: &str) -> Result<Value, ApiError> {
        self.calls.lock().unwrap().push(Call::Read(path.to_string()));
        if self.offline.load(Ordering::SeqCst) {
            return Err(Self::unreachable());
        }
        self.read_responses
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(path.to_string()))
    }

    async fn perform_write(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Write(path.to_string(), body.clone()));
        if self.offline.load(Ordering::SeqCst) {
            return Err(Self::unreachable());
        }
        let scripted = self
            .write_failures
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(|failures| failures.pop_front());
        match scripted {
            Some(error) => Err(error),
            None => Ok(serde_json::json!({ "ok": true })),
        }
    }
}

/// Transport whose writes park until released, to hold a drain mid-flight.
#[derive(Default)]
pub struct GatedTransport {
    pub entered: Notify,
    pub release: Notify,
    writes: Mutex<Vec<String>>,
}

impl GatedTransport {
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn perform_read(&self, path: &str) -> Result<Value, ApiError> {
        Err(ApiError::NotFound(path.to_string()))
    }

    async fn perform_write(&self, path: &str, _body: &Value) -> Result<Value, ApiError> {
        self.writes.lock().unwrap().push(path.to_string());
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Value::Null)
    }
}

/// Transport that panics on every write.
pub struct PanickingTransport;

#[async_trait]
impl Transport for PanickingTransport {
    async fn perform_read(&self, path: &str) -> Result<Value, ApiError> {
        Err(ApiError::NotFound(path.to_string()))
    }

    async fn perform_write(&self, path: &str, _body: &Value) -> Result<Value, ApiError> {
        panic!("transport blew up on {}", path);
    }
}

/// Store that can be switched into failing writes.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("disk full".to_string()));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}

pub fn manager_with(
    store: Arc<dyn KeyValueStore>,
    transport: Arc<dyn Transport>,
) -> Arc<SyncManager> {
    Arc::new(SyncManager::new(store, transport, SyncSettings::default()))
}
