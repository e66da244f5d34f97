//! Business-range validation for threshold configuration
//!
//! One validator per configurable domain. Validation is pure, total and
//! additive: every violated rule contributes its own error so an admin
//! screen can display all problems at once. Warnings are advisory and
//! never block saving. Negative inputs cannot occur (fields are unsigned);
//! zero is rejected wherever the declared minimum is 1.

use crate::models::thresholds::{ActivityThresholds, LoanThresholds, NotificationThresholds};

/// Outcome of validating one configuration domain
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

struct Checker {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Checker {
    fn new() -> Self {
        Self { errors: Vec::new(), warnings: Vec::new() }
    }

    fn range(&mut self, name: &str, value: u32, min: u32, max: u32) {
        if value < min || value > max {
            self.errors
                .push(format!("{} must be between {} and {} (got {})", name, min, max, value));
        }
    }

    fn require(&mut self, condition: bool, message: &str) {
        if !condition {
            self.errors.push(message.to_string());
        }
    }

    fn advise(&mut self, condition: bool, message: &str) {
        if condition {
            self.warnings.push(message.to_string());
        }
    }

    fn finish(self) -> ValidationReport {
        ValidationReport {
            is_valid: self.errors.is_empty(),
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

/// Validate loan lifecycle thresholds
pub fn validate_loan_thresholds(config: &LoanThresholds) -> ValidationReport {
    let mut check = Checker::new();
    check.range("grace_period_days", config.grace_period_days, 0, 30);
    check.range("max_delay_days", config.max_delay_days, 1, 60);
    check.range("block_delay_days", config.block_delay_days, 1, 180);
    check.range("penalty_points_per_delay", config.penalty_points_per_delay, 0, 100);
    check.range("early_return_bonus_points", config.early_return_bonus_points, 0, 50);
    check.range("stock_minimum_percent", config.stock_minimum_percent, 0, 100);
    check.range("review_interval_days", config.review_interval_days, 1, 365);
    check.range("same_material_cooldown_hours", config.same_material_cooldown_hours, 0, 720);
    check.require(
        config.block_delay_days > config.max_delay_days,
        "block_delay_days must exceed max_delay_days",
    );
    check.require(
        config.max_delay_days > config.grace_period_days,
        "max_delay_days must exceed grace_period_days",
    );
    check.advise(
        config.grace_period_days > 7,
        "a grace period above 7 days can hide real delays",
    );
    check.advise(
        config.review_interval_days > 90,
        "a review interval above 90 days lets availability counts drift for a long time",
    );
    check.finish()
}

/// Validate activity scheduling thresholds
pub fn validate_activity_thresholds(config: &ActivityThresholds) -> ValidationReport {
    let mut check = Checker::new();
    check.range("min_advance_days", config.min_advance_days, 0, 30);
    check.range("max_advance_days", config.max_advance_days, 1, 365);
    check.range("min_duration_hours", config.min_duration_hours, 1, 24);
    check.range("max_duration_hours", config.max_duration_hours, 1, 168);
    check.range("modification_cutoff_days", config.modification_cutoff_days, 0, 30);
    check.range("creation_lead_days", config.creation_lead_days, 0, 60);
    check.require(
        config.max_advance_days > config.min_advance_days,
        "max_advance_days must exceed min_advance_days",
    );
    check.require(
        config.max_duration_hours > config.min_duration_hours,
        "max_duration_hours must exceed min_duration_hours",
    );
    check.require(
        config.modification_cutoff_days < config.creation_lead_days,
        "modification_cutoff_days must be smaller than creation_lead_days",
    );
    check.advise(
        config.creation_lead_days > 14,
        "a creation lead time above 14 days may reduce flexibility",
    );
    check.finish()
}

/// Validate notification planning thresholds
pub fn validate_notification_thresholds(config: &NotificationThresholds) -> ValidationReport {
    let mut check = Checker::new();
    check.range("reminder_days_before_return", config.reminder_days_before_return, 0, 30);
    check.range("overdue_notification_day", config.overdue_notification_day, 1, 60);
    check.range("daily_send_hour", config.daily_send_hour, 0, 23);
    check.advise(
        config.reminder_days_before_return == 0,
        "a reminder window of 0 days disables return reminders",
    );
    check.finish()
}
