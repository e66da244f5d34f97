//! In-memory document store
//!
//! Backs the test suite and local fixtures. Behaves like the production
//! store contract: opaque generated ids, shallow-merge updates,
//! all-or-nothing batches, server-timestamp resolution at write time.
//! Collections can be switched into a failing mode to exercise the
//! degraded paths, and query scans are counted so coalescing can be
//! asserted.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::{
    resolve_server_timestamps, Direction, Document, DocumentStore, OrderBy, StoreError, WriteBatch,
};

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Value>>,
    failing: HashSet<String>,
}

/// In-memory [`DocumentStore`] implementation
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    scans: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `query_by_field` scans performed so far
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    /// Make every operation on `collection` fail with `Unavailable`
    pub fn set_failing(&self, collection: &str, failing: bool) {
        let mut inner = self.lock();
        if failing {
            inner.failing.insert(collection.to_string());
        } else {
            inner.failing.remove(collection);
        }
    }

    /// Direct read of a raw document, bypassing failure injection
    pub fn raw_document(&self, collection: &str, id: &str) -> Option<Value> {
        self.lock()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Lock poisoning only happens if a holder panicked; the data is
        // plain values, so recover the guard.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn check_available(inner: &Inner, collection: &str) -> Result<(), StoreError> {
        if inner.failing.contains(collection) {
            return Err(StoreError::Unavailable(format!(
                "collection {} is unreachable",
                collection
            )));
        }
        Ok(())
    }
}

fn shallow_merge(target: &mut Value, patch: &Value) -> Result<(), StoreError> {
    let (Value::Object(target_map), Value::Object(patch_map)) = (target, patch) else {
        return Err(StoreError::InvalidRecord(
            "records and patches must be JSON objects".to_string(),
        ));
    };
    for (key, value) in patch_map {
        target_map.insert(key.clone(), value.clone());
    }
    Ok(())
}

fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering as O;
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(O::Equal),
        _ => match (a.as_str(), b.as_str()) {
            (Some(x), Some(y)) => x.cmp(y),
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, mut record: Value) -> Result<String, StoreError> {
        if !record.is_object() {
            return Err(StoreError::InvalidRecord(
                "records must be JSON objects".to_string(),
            ));
        }
        resolve_server_timestamps(&mut record, Utc::now());
        let mut inner = self.lock();
        Self::check_available(&inner, collection)?;
        let id = Uuid::new_v4().to_string();
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), record);
        Ok(id)
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let inner = self.lock();
        Self::check_available(&inner, collection)?;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: Value,
        order_by: Option<OrderBy>,
    ) -> Result<Vec<Document>, StoreError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let inner = self.lock();
        Self::check_available(&inner, collection)?;
        let mut matches: Vec<Document> = inner
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, data)| data.get(field).unwrap_or(&Value::Null) == &value)
                    .map(|(id, data)| Document { id: id.clone(), data: data.clone() })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = order_by {
            matches.sort_by(|a, b| {
                let left = a.data.get(&order.field).unwrap_or(&Value::Null);
                let right = b.data.get(&order.field).unwrap_or(&Value::Null);
                let ordering = compare_values(left, right);
                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }
        Ok(matches)
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        mut patch: Value,
    ) -> Result<(), StoreError> {
        resolve_server_timestamps(&mut patch, Utc::now());
        let mut inner = self.lock();
        Self::check_available(&inner, collection)?;
        let doc = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::MissingDocument {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        shallow_merge(doc, &patch)
    }

    fn batch(&self) -> Box<dyn WriteBatch> {
        Box::new(MemoryBatch { store: self.clone(), ops: Vec::new() })
    }
}

struct MemoryBatch {
    store: MemoryStore,
    ops: Vec<(String, String, Value)>,
}

#[async_trait]
impl WriteBatch for MemoryBatch {
    fn update(&mut self, collection: &str, id: &str, patch: Value) {
        self.ops.push((collection.to_string(), id.to_string(), patch));
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        let now = Utc::now();
        for (_, _, patch) in self.ops.iter_mut() {
            resolve_server_timestamps(patch, now);
        }
        let mut inner = self.store.lock();
        // Validate the whole batch before touching anything.
        for (collection, id, patch) in &self.ops {
            MemoryStore::check_available(&inner, collection)?;
            if !patch.is_object() {
                return Err(StoreError::InvalidRecord(
                    "patches must be JSON objects".to_string(),
                ));
            }
            let exists = inner
                .collections
                .get(collection)
                .map(|docs| docs.contains_key(id))
                .unwrap_or(false);
            if !exists {
                return Err(StoreError::MissingDocument {
                    collection: collection.clone(),
                    id: id.clone(),
                });
            }
        }
        for (collection, id, patch) in &self.ops {
            let doc = inner
                .collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| StoreError::MissingDocument {
                    collection: collection.clone(),
                    id: id.clone(),
                })?;
            shallow_merge(doc, patch)?;
        }
        Ok(())
    }
}
