//! Threshold configuration snapshots
//!
//! An immutable snapshot of the configurable policy values the core reads.
//! The snapshot is loaded once (from files/env or from the system-config
//! document) and injected by value into every service call, so tests can
//! supply arbitrary configs without a load step.

use serde::{Deserialize, Serialize};

/// Loan lifecycle policy values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoanThresholds {
    /// Days after the nominal due date during which no penalty accrues
    pub grace_period_days: u32,
    /// Days late on return beyond which a late-return penalty applies
    pub max_delay_days: u32,
    /// Days late beyond which a loan becomes overdue-grave (block eligible)
    pub block_delay_days: u32,
    pub penalty_points_per_delay: u32,
    pub early_return_bonus_points: u32,
    /// Stock percentage under which a material counts as below minimum
    pub stock_minimum_percent: u32,
    /// Interval of the periodic availability-count review
    pub review_interval_days: u32,
    /// Minimum hours between two loans of the same material by the same
    /// user. Zero disables the check.
    pub same_material_cooldown_hours: u32,
}

impl Default for LoanThresholds {
    fn default() -> Self {
        Self {
            grace_period_days: 3,
            max_delay_days: 15,
            block_delay_days: 30,
            penalty_points_per_delay: 5,
            early_return_bonus_points: 2,
            stock_minimum_percent: 20,
            review_interval_days: 30,
            same_material_cooldown_hours: 0,
        }
    }
}

/// Activity scheduling policy values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityThresholds {
    pub min_advance_days: u32,
    pub max_advance_days: u32,
    pub min_duration_hours: u32,
    pub max_duration_hours: u32,
    /// Days before the activity start after which modifications are refused
    pub modification_cutoff_days: u32,
    /// Days of lead time required to create an activity
    pub creation_lead_days: u32,
}

impl Default for ActivityThresholds {
    fn default() -> Self {
        Self {
            min_advance_days: 2,
            max_advance_days: 90,
            min_duration_hours: 1,
            max_duration_hours: 8,
            modification_cutoff_days: 1,
            creation_lead_days: 7,
        }
    }
}

/// Notification planning policy values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationThresholds {
    /// A reminder fires when the deadline is at most this many days away
    pub reminder_days_before_return: u32,
    /// The overdue notification fires on exactly this day of lateness
    pub overdue_notification_day: u32,
    pub daily_send_hour: u32,
}

impl Default for NotificationThresholds {
    fn default() -> Self {
        Self {
            reminder_days_before_return: 2,
            overdue_notification_day: 1,
            daily_send_hour: 9,
        }
    }
}

/// Full threshold snapshot, one section per configurable domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub loans: LoanThresholds,
    pub activities: ActivityThresholds,
    pub notifications: NotificationThresholds,
}
