//! Materials repository for document-store operations

use std::sync::Arc;

use serde_json::json;

use crate::{
    error::{AppError, AppResult},
    models::material::Material,
};

use super::{DocumentStore, StoreError};

pub const COLLECTION: &str = "materials";

#[derive(Clone)]
pub struct MaterialsRepository {
    store: Arc<dyn DocumentStore>,
}

impl MaterialsRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Get material by ID
    pub async fn get_by_id(&self, id: &str) -> AppResult<Material> {
        let data = self
            .store
            .get_by_id(COLLECTION, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Material with id {} not found", id)))?;
        let mut material: Material = serde_json::from_value(data).map_err(StoreError::from)?;
        material.id = Some(id.to_string());
        Ok(material)
    }

    /// Adjust the availability counter by `delta` (negative on loan
    /// creation, positive on return). Re-fetches the current count first;
    /// the store is the source of truth, not in-memory copies.
    pub async fn adjust_availability(&self, id: &str, delta: i64) -> AppResult<u32> {
        let material = self.get_by_id(id).await?;
        let adjusted = i64::from(material.quantity_available) + delta;
        if adjusted < 0 || adjusted > i64::from(material.quantity_total) {
            return Err(AppError::Dependency(format!(
                "availability adjustment of {} on material {} leaves {} of {}",
                delta, id, adjusted, material.quantity_total
            )));
        }
        let new_available = adjusted as u32;
        self.store
            .update_by_id(COLLECTION, id, json!({ "quantity_available": new_available }))
            .await?;
        Ok(new_available)
    }
}
