//! Notification planner
//!
//! Pure classification of which loans need a notification at a given
//! instant. Delivery (email/SMS/push) is an external concern; this module
//! only decides. At most one notification per loan per sweep.

use chrono::{DateTime, Utc};

use crate::models::loan::{DerivedStatus, Loan};
use crate::models::thresholds::ThresholdConfig;
use crate::services::state::{ceil_days, derive_state};

/// Kind of planned notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Deadline approaching, loan still active
    Reminder,
    /// Fired once, on the configured day of lateness
    Overdue,
    /// Fired on every evaluation while the loan is overdue-grave; the
    /// consequence escalates, so no single-shot suppression
    Grave,
}

/// A notification the caller should deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedNotification {
    pub loan_id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub days_late: i64,
}

/// Classify `loans` against the thresholds at instant `now`.
/// Unpersisted loans (no id) are skipped; there is nothing to reference
/// in a delivery.
pub fn plan_notifications(
    loans: &[Loan],
    config: &ThresholdConfig,
    now: DateTime<Utc>,
) -> Vec<PlannedNotification> {
    let mut planned = Vec::new();
    for loan in loans {
        let Some(loan_id) = loan.id.clone() else {
            continue;
        };
        let state = derive_state(loan, &config.loans, now);
        let kind = match state.status {
            DerivedStatus::Active => {
                // Reminders count down to the nominal due date; the grace
                // period is tolerance for lateness, not extra lead time.
                let days_until_due = ceil_days(loan.expected_return_date - now);
                let window = i64::from(config.notifications.reminder_days_before_return);
                if days_until_due > 0 && days_until_due <= window {
                    Some(NotificationKind::Reminder)
                } else {
                    None
                }
            }
            DerivedStatus::Overdue => {
                if state.days_late == i64::from(config.notifications.overdue_notification_day) {
                    Some(NotificationKind::Overdue)
                } else {
                    None
                }
            }
            DerivedStatus::OverdueGrave => Some(NotificationKind::Grave),
            _ => None,
        };
        if let Some(kind) = kind {
            planned.push(PlannedNotification {
                loan_id,
                user_id: loan.user_id.clone(),
                kind,
                days_late: state.days_late,
            });
        }
    }
    planned
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::models::loan::LoanStatus;
    use crate::models::thresholds::{LoanThresholds, NotificationThresholds};

    fn config() -> ThresholdConfig {
        ThresholdConfig {
            loans: LoanThresholds {
                grace_period_days: 3,
                block_delay_days: 30,
                ..LoanThresholds::default()
            },
            notifications: NotificationThresholds {
                reminder_days_before_return: 2,
                overdue_notification_day: 5,
                ..NotificationThresholds::default()
            },
            ..ThresholdConfig::default()
        }
    }

    fn loan(id: &str, expected: DateTime<Utc>) -> Loan {
        Loan {
            id: Some(id.to_string()),
            material_id: "m1".to_string(),
            user_id: "u1".to_string(),
            activity_id: None,
            quantity_borrowed: 1,
            loan_date: expected - Duration::days(10),
            expected_return_date: expected,
            actual_return_date: None,
            last_updated: None,
            status: LoanStatus::InUse,
            observations: String::new(),
            incident: None,
            auto_marked_overdue: false,
            auto_marked_at: None,
        }
    }

    fn date(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn reminder_inside_window_only() {
        let config = config();
        let loans = vec![loan("l1", date(2025, 1, 6, 0))];

        // Jan 5 noon: half a day to the due date, inside the 2-day window.
        let planned = plan_notifications(&loans, &config, date(2025, 1, 5, 12));
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].kind, NotificationKind::Reminder);

        // Jan 2: four days out, nothing to say yet.
        assert!(plan_notifications(&loans, &config, date(2025, 1, 2, 0)).is_empty());
    }

    #[test]
    fn overdue_fires_only_on_the_configured_day() {
        let config = config();
        let loans = vec![loan("l1", date(2025, 1, 1, 0))];
        // Deadline Jan 4. Day 5 of lateness is reached during Jan 8-9.
        let on_day = plan_notifications(&loans, &config, date(2025, 1, 8, 12));
        assert_eq!(on_day.len(), 1);
        assert_eq!(on_day[0].kind, NotificationKind::Overdue);
        assert_eq!(on_day[0].days_late, 5);

        let day_after = plan_notifications(&loans, &config, date(2025, 1, 10, 12));
        assert!(day_after.is_empty());
    }

    #[test]
    fn grave_fires_on_every_evaluation() {
        let config = config();
        let loans = vec![loan("l1", date(2025, 1, 1, 0))];
        for day in [40, 41, 60] {
            let now = date(2025, 1, 1, 0) + Duration::days(day);
            let planned = plan_notifications(&loans, &config, now);
            assert_eq!(planned.len(), 1);
            assert_eq!(planned[0].kind, NotificationKind::Grave);
        }
    }

    #[test]
    fn at_most_one_notification_per_loan() {
        let config = config();
        let loans = vec![
            loan("l1", date(2025, 1, 9, 0)),
            loan("l2", date(2025, 1, 1, 0)),
            loan("l3", date(2024, 11, 1, 0)),
        ];
        let planned = plan_notifications(&loans, &config, date(2025, 1, 8, 12));
        assert_eq!(planned.len(), 3);
        let mut ids: Vec<&str> = planned.iter().map(|n| n.loan_id.as_str()).collect();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn returned_loans_are_never_notified() {
        let config = config();
        let mut returned = loan("l1", date(2025, 1, 1, 0));
        returned.actual_return_date = Some(date(2025, 1, 2, 0));
        returned.status = LoanStatus::Returned;
        assert!(plan_notifications(&[returned], &config, date(2025, 1, 8, 12)).is_empty());
    }
}
