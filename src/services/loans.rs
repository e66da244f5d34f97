//! Loan lifecycle service
//!
//! Orchestrates every persisted loan transition: creation, single and bulk
//! returns, the auto-mark-overdue sweep, and the creation policy gate.
//! Availability-count updates are deliberately best-effort: the loan
//! record is the primary effect, count drift is surfaced through the
//! outcome warnings and reconciled by the periodic review, never by
//! rollback.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::loan::{
        BulkReturnReport, CreateLoan, CreateLoanOutcome, DerivedStatus, Incident, Loan, LoanGate,
        LoanStatus, ReturnOutcome, SweepReport,
    },
    models::thresholds::ThresholdConfig,
    repository::{loans as loans_repo, server_timestamp, Repository},
    services::overdue_cache::OverdueQueryCache,
    services::state::derive_state,
};

/// A finished activity older than this many days triggers the sweep
pub const SWEEP_FINISHED_AGE_DAYS: i64 = 7;

/// Marker prepended to sweep-appended observation notes. Existing callers
/// match on this substring; do not change it.
pub const AUTO_MARK_NOTE: &str = "[MARCADO AUTOMÁTICAMENTE]";

/// Append a note to an observations trail. Existing text is never
/// overwritten; entries are newline-joined.
fn append_observations(existing: &str, addition: &str) -> String {
    if addition.is_empty() {
        existing.to_string()
    } else if existing.is_empty() {
        addition.to_string()
    } else {
        format!("{}\n{}", existing, addition)
    }
}

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    overdue_cache: Arc<OverdueQueryCache>,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository, overdue_cache: Arc::new(OverdueQueryCache::new()) }
    }

    /// Get a loan by id
    pub async fn get_loan(&self, loan_id: &str) -> AppResult<Loan> {
        self.repository.loans.get_by_id(loan_id).await
    }

    /// Currently overdue loans, served through the query cache
    pub async fn get_overdue_loans(&self, thresholds: &ThresholdConfig) -> AppResult<Vec<Loan>> {
        self.overdue_cache.get_overdue_loans(&self.repository, &thresholds.loans).await
    }

    /// Create a new loan and decrement material availability.
    ///
    /// The availability decrement is best-effort: if it fails the loan
    /// record still stands and the failure is reported in `warnings`.
    pub async fn create_loan(&self, data: CreateLoan) -> AppResult<CreateLoanOutcome> {
        data.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let material = self.repository.materials.get_by_id(&data.material_id).await?;
        if data.quantity_borrowed > material.quantity_available {
            return Err(AppError::BusinessRule(format!(
                "requested {} of material {} but only {} available",
                data.quantity_borrowed, data.material_id, material.quantity_available
            )));
        }

        let loan = Loan {
            id: None,
            material_id: data.material_id.clone(),
            user_id: data.user_id,
            activity_id: data.activity_id,
            quantity_borrowed: data.quantity_borrowed,
            // Overwritten by the store clock at write time.
            loan_date: Utc::now(),
            expected_return_date: data.expected_return_date,
            actual_return_date: None,
            last_updated: None,
            status: LoanStatus::InUse,
            observations: data.observations,
            incident: None,
            auto_marked_overdue: false,
            auto_marked_at: None,
        };
        let loan_id = self.repository.loans.create(&loan).await?;

        let mut warnings = Vec::new();
        let delta = -i64::from(data.quantity_borrowed);
        if let Err(error) = self.repository.materials.adjust_availability(&data.material_id, delta).await
        {
            tracing::warn!(
                loan_id = %loan_id,
                material_id = %data.material_id,
                "availability decrement failed after loan creation: {}",
                error
            );
            warnings.push(format!(
                "loan {} created but availability decrement failed: {}",
                loan_id, error
            ));
        }

        self.overdue_cache.invalidate();
        Ok(CreateLoanOutcome { loan_id, warnings })
    }

    /// Policy gate for loan creation, evaluated at instant `now`.
    /// A "no" is an answer, not an error.
    pub async fn can_create_loan(
        &self,
        user_id: &str,
        material_id: &str,
        thresholds: &ThresholdConfig,
        now: DateTime<Utc>,
    ) -> AppResult<LoanGate> {
        let user_loans = self.repository.loans.find_by_user(user_id).await?;

        for loan in &user_loans {
            let state = derive_state(loan, &thresholds.loans, now);
            if state.status == DerivedStatus::OverdueGrave {
                return Ok(LoanGate::deny(format!(
                    "user {} holds a loan {} days past the block threshold",
                    user_id, state.days_late
                )));
            }
        }

        let cooldown_hours = thresholds.loans.same_material_cooldown_hours;
        if cooldown_hours > 0 {
            let last_same_material = user_loans
                .iter()
                .filter(|loan| loan.material_id == material_id)
                .map(|loan| loan.loan_date)
                .max();
            if let Some(last) = last_same_material {
                let elapsed = now - last;
                if elapsed < Duration::hours(i64::from(cooldown_hours)) {
                    return Ok(LoanGate::deny(format!(
                        "material {} was already borrowed by user {} within the last {} hours",
                        material_id, user_id, cooldown_hours
                    )));
                }
            }
        }

        Ok(LoanGate::allow())
    }

    fn return_status_for(incident: Option<&Incident>) -> LoanStatus {
        incident.map(Incident::return_status).unwrap_or(LoanStatus::Returned)
    }

    /// Register the return of a single loan.
    ///
    /// Re-fetches the loan first; the store is the source of truth, not
    /// whatever copy the caller holds. Incident mapping: a loss is always
    /// `perdido`, high or critical severity is `danado`. Lost items never
    /// go back into available stock.
    pub async fn register_return(
        &self,
        loan_id: &str,
        observations: &str,
        incident: Option<Incident>,
    ) -> AppResult<ReturnOutcome> {
        let loan = self.repository.loans.get_by_id(loan_id).await?;
        if loan.status.is_returned_family() || loan.actual_return_date.is_some() {
            return Err(AppError::BusinessRule(format!("Loan {} already returned", loan_id)));
        }

        let status = Self::return_status_for(incident.as_ref());
        let mut patch = json!({
            "status": status,
            "observations": append_observations(&loan.observations, observations),
            "actual_return_date": server_timestamp(),
            "last_updated": server_timestamp(),
        });
        if let Some(incident) = &incident {
            patch["incident"] = serde_json::to_value(incident)
                .map_err(|e| AppError::Internal(e.to_string()))?;
        }
        self.repository.loans.update(loan_id, patch).await?;

        let mut warnings = Vec::new();
        if status != LoanStatus::Lost {
            let delta = i64::from(loan.quantity_borrowed);
            if let Err(error) =
                self.repository.materials.adjust_availability(&loan.material_id, delta).await
            {
                tracing::warn!(
                    loan_id = %loan_id,
                    material_id = %loan.material_id,
                    "availability increment failed after return: {}",
                    error
                );
                warnings.push(format!(
                    "loan {} returned but availability increment failed: {}",
                    loan_id, error
                ));
            }
        }

        self.overdue_cache.invalidate();
        let loan = self.repository.loans.get_by_id(loan_id).await?;
        Ok(ReturnOutcome { loan, warnings })
    }

    /// Return every open loan of an activity.
    ///
    /// Status flips go through a single batch commit; availability
    /// reconciliation then runs sequentially per loan so a double
    /// increment cannot race. Per-loan failures are collected, never
    /// aborting the rest: `success_count + errors.len()` equals the
    /// number of candidate loans.
    pub async fn bulk_return_by_activity(
        &self,
        activity_id: &str,
        observations: &str,
    ) -> AppResult<BulkReturnReport> {
        self.repository.activities.get_by_id(activity_id).await?;

        let candidates = self
            .repository
            .loans
            .find_by_activity_with_status(
                activity_id,
                &[LoanStatus::InUse, LoanStatus::MarkedForReturn],
            )
            .await?;

        let mut report = BulkReturnReport::default();
        if candidates.is_empty() {
            return Ok(report);
        }

        let mut batch = self.repository.store.batch();
        let mut batched: Vec<&Loan> = Vec::new();
        for loan in &candidates {
            let Some(id) = &loan.id else {
                report.errors.push("loan without id in activity query result".to_string());
                continue;
            };
            batch.update(
                loans_repo::COLLECTION,
                id,
                json!({
                    "status": LoanStatus::Returned,
                    "observations": append_observations(&loan.observations, observations),
                    "actual_return_date": server_timestamp(),
                    "last_updated": server_timestamp(),
                }),
            );
            batched.push(loan);
        }
        batch.commit().await?;

        for loan in batched {
            let id = loan.id.as_deref().unwrap_or_default();
            let delta = i64::from(loan.quantity_borrowed);
            match self.repository.materials.adjust_availability(&loan.material_id, delta).await {
                Ok(_) => report.success_count += 1,
                Err(error) => {
                    tracing::warn!(
                        loan_id = %id,
                        "availability reconciliation failed after bulk return: {}",
                        error
                    );
                    report.errors.push(format!("loan {}: {}", id, error));
                }
            }
        }

        self.overdue_cache.invalidate();
        tracing::info!(
            activity_id = %activity_id,
            success = report.success_count,
            failed = report.errors.len(),
            "bulk return finished"
        );
        Ok(report)
    }

    /// Mark loans of long-finished activities as pending return.
    ///
    /// Finds activities finished more than [`SWEEP_FINISHED_AGE_DAYS`] ago
    /// and flips their `en_uso` loans to `por_devolver`, tagged as
    /// system-driven. Per-activity failures are collected; only a total
    /// infrastructure failure propagates.
    pub async fn auto_mark_overdue_sweep(&self) -> AppResult<SweepReport> {
        let cutoff = Utc::now() - Duration::days(SWEEP_FINISHED_AGE_DAYS);
        let activities = self.repository.activities.find_finished_before(cutoff).await?;

        let mut report = SweepReport::default();
        for activity in &activities {
            let Some(activity_id) = &activity.id else {
                continue;
            };
            match self.mark_activity_loans(activity_id, &activity.name).await {
                Ok(marked) => {
                    report.processed_activities += 1;
                    report.marked_loans += marked;
                }
                Err(error) => {
                    tracing::warn!(
                        activity_id = %activity_id,
                        "sweep failed for activity: {}",
                        error
                    );
                    report.errors.push(format!("activity {}: {}", activity_id, error));
                }
            }
        }

        if report.marked_loans > 0 {
            self.overdue_cache.invalidate();
        }
        tracing::info!(
            activities = report.processed_activities,
            marked = report.marked_loans,
            failed = report.errors.len(),
            "auto-mark-overdue sweep finished"
        );
        Ok(report)
    }

    async fn mark_activity_loans(&self, activity_id: &str, activity_name: &str) -> AppResult<usize> {
        let loans = self
            .repository
            .loans
            .find_by_activity_with_status(activity_id, &[LoanStatus::InUse])
            .await?;
        if loans.is_empty() {
            return Ok(0);
        }

        let note = format!("{} Actividad finalizada: {}", AUTO_MARK_NOTE, activity_name);
        let mut batch = self.repository.store.batch();
        let mut marked = 0;
        for loan in &loans {
            let Some(id) = &loan.id else {
                continue;
            };
            batch.update(
                loans_repo::COLLECTION,
                id,
                json!({
                    "status": LoanStatus::MarkedForReturn,
                    "observations": append_observations(&loan.observations, &note),
                    "auto_marked_overdue": true,
                    "auto_marked_at": server_timestamp(),
                    "last_updated": server_timestamp(),
                }),
            );
            marked += 1;
        }
        batch.commit().await?;
        Ok(marked)
    }

    /// Loans a user answers for: their own, plus those of activities they
    /// are responsible for. If the activity-side query fails, degrade to
    /// the direct loans rather than failing the whole listing.
    pub async fn loans_under_responsibility(&self, user_id: &str) -> AppResult<Vec<Loan>> {
        let mut loans = self.repository.loans.find_by_user(user_id).await?;

        match self.repository.activities.find_by_responsible(user_id).await {
            Ok(activities) => {
                for activity in activities {
                    let Some(activity_id) = &activity.id else {
                        continue;
                    };
                    match self
                        .repository
                        .loans
                        .find_by_activity_with_status(
                            activity_id,
                            &[LoanStatus::InUse, LoanStatus::MarkedForReturn],
                        )
                        .await
                    {
                        Ok(activity_loans) => {
                            for loan in activity_loans {
                                if loan.user_id != user_id {
                                    loans.push(loan);
                                }
                            }
                        }
                        Err(error) => {
                            tracing::warn!(
                                activity_id = %activity_id,
                                "activity loan query failed, skipping in listing: {}",
                                error
                            );
                        }
                    }
                }
            }
            Err(error) => {
                tracing::warn!(
                    user_id = %user_id,
                    "responsibility query failed, listing direct loans only: {}",
                    error
                );
            }
        }
        Ok(loans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observations_are_appended_never_overwritten() {
        assert_eq!(append_observations("", "first"), "first");
        assert_eq!(append_observations("first", "second"), "first\nsecond");
        assert_eq!(append_observations("kept", ""), "kept");
    }

    #[test]
    fn incident_mapping_matches_policy() {
        use crate::models::loan::{IncidentKind, IncidentSeverity};

        let loss = Incident {
            kind: IncidentKind::Loss,
            severity: IncidentSeverity::Low,
            description: String::new(),
        };
        assert_eq!(LoansService::return_status_for(Some(&loss)), LoanStatus::Lost);

        let broken = Incident {
            kind: IncidentKind::Damage,
            severity: IncidentSeverity::Critical,
            description: String::new(),
        };
        assert_eq!(LoansService::return_status_for(Some(&broken)), LoanStatus::Damaged);

        let scuffed = Incident {
            kind: IncidentKind::Damage,
            severity: IncidentSeverity::Low,
            description: String::new(),
        };
        assert_eq!(LoansService::return_status_for(Some(&scuffed)), LoanStatus::Returned);

        assert_eq!(LoansService::return_status_for(None), LoanStatus::Returned);
    }
}
