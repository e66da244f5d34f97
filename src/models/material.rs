//! Material (inventory) model

use serde::{Deserialize, Serialize};

/// Material document as persisted in the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub quantity_total: u32,
    pub quantity_available: u32,
}
