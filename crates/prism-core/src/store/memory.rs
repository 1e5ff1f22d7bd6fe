//! In-process object store.
//!
//! A store built with [`MemoryStore::recording`] also logs every call it
//! receives, which lets callers assert exactly which store operations a
//! pipeline run performed. The plain constructor keeps no log.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{StoreError, StoreResult};

use super::ObjectStore;

/// One operation received by a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Put(String),
    Get(String),
    Delete(String),
    Exists(String),
}

impl StoreCall {
    pub fn key(&self) -> &str {
        match self {
            StoreCall::Put(key)
            | StoreCall::Get(key)
            | StoreCall::Delete(key)
            | StoreCall::Exists(key) => key,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// Object store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    calls: Option<Mutex<Vec<StoreCall>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that logs every call it receives. The log grows until
    /// [`clear_calls`](Self::clear_calls), so keep it to tests.
    pub fn recording() -> Self {
        Self {
            objects: Mutex::default(),
            calls: Some(Mutex::default()),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.calls.is_some()
    }

    /// Every call received so far, in order. Empty unless recording.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls
            .as_ref()
            .map(|calls| calls.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .unwrap_or_default()
    }

    /// Keys passed to `put`, in order.
    pub fn puts(&self) -> Vec<String> {
        self.keys_of(|call| matches!(call, StoreCall::Put(_)))
    }

    /// Keys passed to `delete`, in order.
    pub fn deletes(&self) -> Vec<String> {
        self.keys_of(|call| matches!(call, StoreCall::Delete(_)))
    }

    /// Forget recorded calls; stored objects are kept.
    pub fn clear_calls(&self) {
        if let Some(calls) = &self.calls {
            calls.lock().unwrap_or_else(PoisonError::into_inner).clear();
        }
    }

    /// Currently stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = objects.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Content type recorded for `key`.
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|o| o.content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn keys_of(&self, filter: impl Fn(&StoreCall) -> bool) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| filter(call))
            .map(|call| call.key().to_string())
            .collect()
    }

    fn record(&self, call: StoreCall) {
        if let Some(calls) = &self.calls {
            calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
        }
    }

    fn objects(&self, key: &str) -> StoreResult<MutexGuard<'_, HashMap<String, StoredObject>>> {
        self.objects.lock().map_err(|e| StoreError::Backend {
            store: "memory".to_string(),
            key: key.to_string(),
            message: format!("lock poisoned: {e}"),
        })
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StoreResult<()> {
        self.record(StoreCall::Put(key.to_string()));
        self.objects(key)?.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.record(StoreCall::Get(key.to_string()));
        Ok(self.objects(key)?.get(key).map(|o| o.bytes.clone()))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.record(StoreCall::Delete(key.to_string()));
        self.objects(key)?.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.record(StoreCall::Exists(key.to_string()));
        Ok(self.objects(key)?.contains_key(key))
    }
}
