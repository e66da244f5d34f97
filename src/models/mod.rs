//! Data models for the Prestapp core

pub mod activity;
pub mod loan;
pub mod material;
pub mod thresholds;

pub use activity::{Activity, ActivityStatus};
pub use loan::{
    BulkReturnReport, CreateLoan, CreateLoanOutcome, DerivedLoanState, DerivedStatus, Incident,
    IncidentKind, IncidentSeverity, Loan, LoanGate, LoanStatus, ReturnOutcome, SweepReport,
};
pub use material::Material;
pub use thresholds::{
    ActivityThresholds, LoanThresholds, NotificationThresholds, ThresholdConfig,
};
