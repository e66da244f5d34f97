//! Loan state calculator
//!
//! Single entry point for deriving a loan's lifecycle state from its
//! timestamps and a threshold snapshot. Every caller that needs to know
//! whether a loan is overdue (listing, notification planning, the
//! block-eligibility gate) goes through [`derive_state`] so the rules
//! cannot drift between call sites.

use chrono::{DateTime, Duration, Utc};

use crate::models::loan::{DerivedLoanState, DerivedStatus, Loan, LoanStatus};
use crate::models::thresholds::LoanThresholds;

/// Ceiling day count of a duration; zero for anything non-positive.
/// Any partial day past a deadline counts as a full late day.
pub(crate) fn ceil_days(delta: Duration) -> i64 {
    let secs = delta.num_seconds();
    if secs <= 0 {
        0
    } else {
        (secs + 86_399) / 86_400
    }
}

/// Derive a loan's lifecycle state at instant `now`.
///
/// Pure: identical inputs always produce identical output. The persisted
/// `status` only matters for the returned family (`devuelto`, `perdido`,
/// `danado`); everything before return is computed from timestamps alone,
/// so a loan still marked `en_uso` reads as overdue once its deadline is
/// behind `now`.
pub fn derive_state(
    loan: &Loan,
    thresholds: &LoanThresholds,
    now: DateTime<Utc>,
) -> DerivedLoanState {
    let return_deadline =
        loan.expected_return_date + Duration::days(i64::from(thresholds.grace_period_days));

    if let Some(returned_at) = loan.actual_return_date {
        let days_late = ceil_days(returned_at - return_deadline);
        // A late return only costs points past the tolerated delay.
        let penalty_applied = if days_late > i64::from(thresholds.max_delay_days) {
            thresholds.penalty_points_per_delay
        } else {
            0
        };
        let status = match loan.status {
            LoanStatus::Lost => DerivedStatus::Lost,
            LoanStatus::Damaged => DerivedStatus::Damaged,
            _ if returned_at <= loan.expected_return_date => DerivedStatus::ReturnedEarly,
            _ => DerivedStatus::Returned,
        };
        // The early bonus rewards returning at or before the nominal due
        // date. Returning within grace is tolerated, not rewarded.
        let bonus_applied = if status == DerivedStatus::ReturnedEarly {
            thresholds.early_return_bonus_points
        } else {
            0
        };
        return DerivedLoanState {
            status,
            days_late,
            return_deadline,
            penalty_applied,
            bonus_applied,
        };
    }

    let days_late = ceil_days(now - return_deadline);
    let (status, penalty_applied) = if now <= loan.expected_return_date {
        (DerivedStatus::Active, 0)
    } else if days_late == 0 {
        (DerivedStatus::InGrace, 0)
    } else if days_late <= i64::from(thresholds.block_delay_days) {
        // Flat penalty, applied once rather than per day.
        (DerivedStatus::Overdue, thresholds.penalty_points_per_delay)
    } else {
        (DerivedStatus::OverdueGrave, thresholds.penalty_points_per_delay * 2)
    };

    DerivedLoanState {
        status,
        days_late,
        return_deadline,
        penalty_applied,
        bonus_applied: 0,
    }
}

/// True when `available` units out of `total` fall under the configured
/// stock-minimum percentage. A material with no declared stock is never
/// below minimum.
pub fn is_stock_below_minimum(available: u32, total: u32, thresholds: &LoanThresholds) -> bool {
    if total == 0 {
        return false;
    }
    u64::from(available) * 100 < u64::from(total) * u64::from(thresholds.stock_minimum_percent)
}
