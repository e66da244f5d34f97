//! Repository layer over the external document store
//!
//! The core never talks to a concrete backend directly; it consumes the
//! minimal [`DocumentStore`] contract (keyed CRUD, query-by-field with
//! optional ordering, batched updates, server-assigned timestamps) and the
//! typed sub-repositories translate between domain models and raw
//! documents.

pub mod activities;
pub mod loans;
pub mod materials;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use thiserror::Error;

/// Errors raised at the store boundary
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No document {id} in collection {collection}")]
    MissingDocument { collection: String, id: String },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// A raw document together with its store-assigned id
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// Sort direction for ordered queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Ordering request for `query_by_field`
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: Direction::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: Direction::Desc }
    }
}

/// Marker field for write-time server timestamps
pub const SERVER_TIMESTAMP_FIELD: &str = "__server_timestamp__";

/// Sentinel value the store resolves to its own clock at write time
pub fn server_timestamp() -> Value {
    json!({ SERVER_TIMESTAMP_FIELD: true })
}

/// Replace any server-timestamp sentinel in `value` with `now`.
/// Store implementations call this when applying writes.
pub fn resolve_server_timestamps(value: &mut Value, now: DateTime<Utc>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 && map.contains_key(SERVER_TIMESTAMP_FIELD) {
                *value = json!(now);
                return;
            }
            for field in map.values_mut() {
                resolve_server_timestamps(field, now);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                resolve_server_timestamps(item, now);
            }
        }
        _ => {}
    }
}

/// Minimal document-store contract the core depends on
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a record, returning the store-assigned id
    async fn insert(&self, collection: &str, record: Value) -> Result<String, StoreError>;

    /// Fetch a record by id, `None` if absent
    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Equality query on a single field, optionally ordered
    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: Value,
        order_by: Option<OrderBy>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Shallow-merge `patch` into an existing record
    async fn update_by_id(&self, collection: &str, id: &str, patch: Value)
        -> Result<(), StoreError>;

    /// Start a batch of updates committed all-or-nothing
    fn batch(&self) -> Box<dyn WriteBatch>;
}

/// Accumulates updates applied atomically on commit
#[async_trait]
pub trait WriteBatch: Send {
    fn update(&mut self, collection: &str, id: &str, patch: Value);

    /// Apply every queued update, or none of them on failure
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Main repository struct holding the store handle and typed sub-repositories
#[derive(Clone)]
pub struct Repository {
    pub store: Arc<dyn DocumentStore>,
    pub loans: loans::LoansRepository,
    pub materials: materials::MaterialsRepository,
    pub activities: activities::ActivitiesRepository,
}

impl Repository {
    /// Create a new repository over the given store
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            loans: loans::LoansRepository::new(store.clone()),
            materials: materials::MaterialsRepository::new(store.clone()),
            activities: activities::ActivitiesRepository::new(store.clone()),
            store,
        }
    }
}
