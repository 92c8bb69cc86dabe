use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{Condition, Product, ProductStatus};

const DATE_FORMAT: &str = "%d/%m/%Y";
const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";
const UNSPECIFIED: &str = "Unspecified";

/// Display-ready projection of a [`Product`]. Recomputed on every fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub brand_label: String,
    pub category: String,
    pub category_label: String,
    pub location: String,
    pub location_label: String,
    pub serial_number: Option<String>,
    pub status: ProductStatus,
    pub status_label: String,
    pub condition: Condition,
    pub condition_label: String,
    pub description: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_date_display: Option<String>,
    pub cost: Option<Decimal>,
    pub cost_display: Option<String>,
    pub assignee: Option<String>,
    pub loan_due: Option<NaiveDate>,
    pub loan_due_display: Option<String>,
    pub retirement_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_at_display: String,
    pub updated_at: DateTime<Utc>,
    pub updated_at_display: String,
}

impl From<&Product> for ProductView {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            brand: p.brand.clone(),
            brand_label: label_or_unspecified(&p.brand),
            category: p.category.clone(),
            category_label: label_or_unspecified(&p.category),
            location: p.location.clone(),
            location_label: label_or_unspecified(&p.location),
            serial_number: p.serial_number.clone(),
            status: p.status,
            status_label: p.status.label().to_string(),
            condition: p.condition,
            condition_label: p.condition.label().to_string(),
            description: p.description.clone(),
            purchase_date: p.purchase_date,
            purchase_date_display: p.purchase_date.map(|d| d.format(DATE_FORMAT).to_string()),
            cost: p.cost,
            cost_display: p.cost.map(format_money),
            assignee: p.assignee.clone(),
            loan_due: p.loan_due,
            loan_due_display: p.loan_due.map(|d| d.format(DATE_FORMAT).to_string()),
            retirement_reason: p.retirement_reason.clone(),
            created_at: p.created_at,
            created_at_display: p.created_at.format(TIMESTAMP_FORMAT).to_string(),
            updated_at: p.updated_at,
            updated_at_display: p.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

impl From<Product> for ProductView {
    fn from(p: Product) -> Self {
        ProductView::from(&p)
    }
}

fn label_or_unspecified(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        UNSPECIFIED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// `1234.5` -> `$1,234.50`
pub fn format_money(amount: Decimal) -> String {
    let fixed = format!("{:.2}", amount.round_dp(2));
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{}${}.{}", sign, grouped, fraction)
}
