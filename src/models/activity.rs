//! Activity model (sweep input)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Activity state as persisted in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Active,
    Finished,
    Cancelled,
}

/// Activity document as persisted in the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub status: ActivityStatus,
    pub end_date: DateTime<Utc>,
    /// User answering for the activity's outstanding loans
    #[serde(default)]
    pub responsible_id: Option<String>,
}
