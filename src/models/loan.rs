//! Loan model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Persisted loan status.
///
/// Wire values keep the original Spanish identifiers; existing documents
/// and UI filters depend on them. Only two transitions are ever written by
/// the core: to `por_devolver` (sweep / manual mark) and to a
/// returned-family status (`devuelto`, `perdido`, `danado`). Everything
/// else is derived view state, see [`DerivedStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    #[serde(rename = "en_uso")]
    InUse,
    #[serde(rename = "por_devolver")]
    MarkedForReturn,
    #[serde(rename = "devuelto")]
    Returned,
    #[serde(rename = "perdido")]
    Lost,
    #[serde(rename = "danado")]
    Damaged,
}

impl LoanStatus {
    /// Returned-family statuses are terminal: `actual_return_date` is set
    /// if and only if the loan carries one of these.
    pub fn is_returned_family(self) -> bool {
        matches!(self, LoanStatus::Returned | LoanStatus::Lost | LoanStatus::Damaged)
    }
}

/// Kind of incident reported at return time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentKind {
    Damage,
    Loss,
    Maintenance,
    Other,
}

/// Severity of a reported incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Incident attached to a loan at return time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub kind: IncidentKind,
    pub severity: IncidentSeverity,
    pub description: String,
}

impl Incident {
    /// Status the loan ends in when returned with this incident.
    /// Loss always maps to lost; high or critical severity maps to damaged.
    pub fn return_status(&self) -> LoanStatus {
        if self.kind == IncidentKind::Loss {
            LoanStatus::Lost
        } else if self.severity >= IncidentSeverity::High {
            LoanStatus::Damaged
        } else {
            LoanStatus::Returned
        }
    }
}

/// Loan document as persisted in the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub material_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    pub quantity_borrowed: u32,
    pub loan_date: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
    #[serde(default)]
    pub actual_return_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    /// Append-only text audit trail. Lifecycle events append lines, never
    /// overwrite; callers depend on substring markers in here.
    #[serde(default)]
    pub observations: String,
    #[serde(default)]
    pub incident: Option<Incident>,
    /// Set only by the automatic sweep, distinguishing system-driven from
    /// user-driven transitions.
    #[serde(default)]
    pub auto_marked_overdue: bool,
    #[serde(default)]
    pub auto_marked_at: Option<DateTime<Utc>>,
}

/// Create loan request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLoan {
    #[validate(length(min = 1, message = "material_id is required"))]
    pub material_id: String,
    #[validate(length(min = 1, message = "user_id is required"))]
    pub user_id: String,
    pub activity_id: Option<String>,
    #[validate(range(min = 1, message = "quantity_borrowed must be positive"))]
    pub quantity_borrowed: u32,
    pub expected_return_date: DateTime<Utc>,
    #[serde(default)]
    pub observations: String,
}

/// Lifecycle state derived from timestamps, never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedStatus {
    Active,
    InGrace,
    Overdue,
    OverdueGrave,
    ReturnedEarly,
    Returned,
    Lost,
    Damaged,
}

impl DerivedStatus {
    pub fn is_returned_family(self) -> bool {
        matches!(
            self,
            DerivedStatus::ReturnedEarly
                | DerivedStatus::Returned
                | DerivedStatus::Lost
                | DerivedStatus::Damaged
        )
    }
}

/// Result of deriving a loan's lifecycle state, recomputed on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DerivedLoanState {
    pub status: DerivedStatus,
    pub days_late: i64,
    pub return_deadline: DateTime<Utc>,
    pub penalty_applied: u32,
    pub bonus_applied: u32,
}

/// Outcome of a loan creation, including best-effort side effect failures
#[derive(Debug, Clone)]
pub struct CreateLoanOutcome {
    pub loan_id: String,
    /// Non-fatal problems (e.g. availability decrement failed); the loan
    /// record itself was written.
    pub warnings: Vec<String>,
}

/// Outcome of a single return
#[derive(Debug, Clone)]
pub struct ReturnOutcome {
    pub loan: Loan,
    pub warnings: Vec<String>,
}

/// Outcome of a bulk return over an activity's loans
#[derive(Debug, Clone, Default)]
pub struct BulkReturnReport {
    pub success_count: usize,
    pub errors: Vec<String>,
}

/// Outcome of the auto-mark-overdue sweep
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub processed_activities: usize,
    pub marked_loans: usize,
    pub errors: Vec<String>,
}

/// Answer of the loan-creation policy gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanGate {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl LoanGate {
    pub fn allow() -> Self {
        Self { allowed: true, reason: None }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self { allowed: false, reason: Some(reason.into()) }
    }
}
