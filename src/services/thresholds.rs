//! Threshold settings service
//!
//! Loads and updates the persisted threshold snapshot. Updates run every
//! domain validator first: errors reject the save, warnings ride along in
//! the outcome so the admin screen can display them.

use serde_json::json;

use crate::{
    error::{AppError, AppResult},
    models::thresholds::ThresholdConfig,
    repository::{server_timestamp, Repository, StoreError},
    services::config_rules::{
        validate_activity_thresholds, validate_loan_thresholds, validate_notification_thresholds,
    },
};

pub const COLLECTION: &str = "system_config";
const KIND_VALUE: &str = "thresholds";

/// Result of a threshold update
#[derive(Debug, Clone)]
pub struct ThresholdUpdateOutcome {
    pub saved: ThresholdConfig,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct ThresholdsService {
    repository: Repository,
}

impl ThresholdsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    async fn find_current(&self) -> AppResult<Option<(String, ThresholdConfig)>> {
        let documents = self
            .repository
            .store
            .query_by_field(COLLECTION, "kind", json!(KIND_VALUE), None)
            .await?;
        let Some(document) = documents.into_iter().next() else {
            return Ok(None);
        };
        let config = document
            .data
            .get("config")
            .cloned()
            .ok_or_else(|| StoreError::InvalidRecord("threshold record without config".to_string()))?;
        let config: ThresholdConfig =
            serde_json::from_value(config).map_err(StoreError::from)?;
        Ok(Some((document.id, config)))
    }

    /// Current threshold snapshot, falling back to defaults when nothing
    /// has been saved yet
    pub async fn get(&self) -> AppResult<ThresholdConfig> {
        Ok(self
            .find_current()
            .await?
            .map(|(_, config)| config)
            .unwrap_or_default())
    }

    /// Validate and persist a new threshold snapshot.
    /// Any validation error rejects the whole update; warnings never do.
    pub async fn update(&self, candidate: ThresholdConfig) -> AppResult<ThresholdUpdateOutcome> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for report in [
            validate_loan_thresholds(&candidate.loans),
            validate_activity_thresholds(&candidate.activities),
            validate_notification_thresholds(&candidate.notifications),
        ] {
            errors.extend(report.errors);
            warnings.extend(report.warnings);
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors.join("; ")));
        }

        let record = json!({
            "kind": KIND_VALUE,
            "config": candidate,
            "updated_at": server_timestamp(),
        });
        match self.find_current().await? {
            Some((id, _)) => {
                self.repository.store.update_by_id(COLLECTION, &id, record).await?;
            }
            None => {
                self.repository.store.insert(COLLECTION, record).await?;
            }
        }
        tracing::info!(warnings = warnings.len(), "threshold configuration updated");
        Ok(ThresholdUpdateOutcome { saved: candidate, warnings })
    }
}
