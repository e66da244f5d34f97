//! Business logic services

pub mod config_rules;
pub mod loans;
pub mod notifications;
pub mod overdue_cache;
pub mod state;
pub mod thresholds;

use crate::repository::Repository;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub loans: loans::LoansService,
    pub thresholds: thresholds::ThresholdsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository) -> Self {
        Self {
            loans: loans::LoansService::new(repository.clone()),
            thresholds: thresholds::ThresholdsService::new(repository),
        }
    }
}
