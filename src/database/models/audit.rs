use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::store::StoreError;
use crate::inventory::AuditEntry;

#[derive(Debug, Clone, FromRow)]
pub struct AuditRow {
    pub id: Uuid,
    pub action: String,
    pub product_id: Option<Uuid>,
    pub actor: String,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = StoreError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(Self {
            action: row.action.parse().map_err(StoreError::Decode)?,
            id: row.id,
            product_id: row.product_id,
            actor: row.actor,
            details: row.details,
            created_at: row.created_at,
        })
    }
}
