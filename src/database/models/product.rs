use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::store::StoreError;
use crate::inventory::Product;

/// Raw `products` row; enums are stored as text.
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub location: String,
    pub serial_number: Option<String>,
    pub status: String,
    pub condition: String,
    pub description: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub cost: Option<Decimal>,
    pub assignee: Option<String>,
    pub loan_due: Option<NaiveDate>,
    pub retirement_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: row.status.parse().map_err(StoreError::Decode)?,
            condition: row.condition.parse().map_err(StoreError::Decode)?,
            id: row.id,
            name: row.name,
            brand: row.brand,
            category: row.category,
            location: row.location,
            serial_number: row.serial_number,
            description: row.description,
            purchase_date: row.purchase_date,
            cost: row.cost,
            assignee: row.assignee,
            loan_due: row.loan_due,
            retirement_reason: row.retirement_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
