//! Activities repository for document-store operations

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::activity::{Activity, ActivityStatus},
};

use super::{Document, DocumentStore, StoreError};

pub const COLLECTION: &str = "activities";

#[derive(Clone)]
pub struct ActivitiesRepository {
    store: Arc<dyn DocumentStore>,
}

impl ActivitiesRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn decode(document: Document) -> Result<Activity, StoreError> {
        let mut activity: Activity = serde_json::from_value(document.data)?;
        activity.id = Some(document.id);
        Ok(activity)
    }

    /// Get activity by ID
    pub async fn get_by_id(&self, id: &str) -> AppResult<Activity> {
        let data = self
            .store
            .get_by_id(COLLECTION, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity with id {} not found", id)))?;
        Ok(Self::decode(Document { id: id.to_string(), data })?)
    }

    /// Activities a user is responsible for
    pub async fn find_by_responsible(&self, user_id: &str) -> AppResult<Vec<Activity>> {
        let documents = self
            .store
            .query_by_field(
                COLLECTION,
                "responsible_id",
                serde_json::Value::String(user_id.to_string()),
                None,
            )
            .await?;
        let mut activities = Vec::with_capacity(documents.len());
        for document in documents {
            activities.push(Self::decode(document)?);
        }
        Ok(activities)
    }

    /// Finished activities whose end date is older than `cutoff`.
    /// The end-date comparison runs client-side on top of the status query.
    pub async fn find_finished_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Activity>> {
        let status = serde_json::to_value(ActivityStatus::Finished).map_err(StoreError::from)?;
        let documents = self
            .store
            .query_by_field(COLLECTION, "status", status, None)
            .await?;
        let mut activities = Vec::new();
        for document in documents {
            let activity = Self::decode(document)?;
            if activity.end_date < cutoff {
                activities.push(activity);
            }
        }
        Ok(activities)
    }
}
