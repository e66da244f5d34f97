//! Prestapp - Club Loan Lifecycle Core
//!
//! The loan lifecycle and overdue reconciliation engine behind the
//! Prestapp club-materials application: derived loan state, bulk
//! transitions (batch return, auto-mark-overdue sweep), threshold
//! validation and the cached overdue-loans query. UI, auth and
//! notification delivery live elsewhere; they call into
//! [`services::Services`] over any [`repository::DocumentStore`].

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
