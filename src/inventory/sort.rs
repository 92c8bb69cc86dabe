use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use crate::filter::SortDirection;

use super::model::Product;
use super::view::ProductView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    Brand,
    Category,
    Location,
    SerialNumber,
    Status,
    Condition,
    PurchaseDate,
    Cost,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub const ALL: [SortField; 11] = [
        SortField::Name,
        SortField::Brand,
        SortField::Category,
        SortField::Location,
        SortField::SerialNumber,
        SortField::Status,
        SortField::Condition,
        SortField::PurchaseDate,
        SortField::Cost,
        SortField::CreatedAt,
        SortField::UpdatedAt,
    ];

    /// Query-string token, identical to the database column name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Brand => "brand",
            SortField::Category => "category",
            SortField::Location => "location",
            SortField::SerialNumber => "serial_number",
            SortField::Status => "status",
            SortField::Condition => "condition",
            SortField::PurchaseDate => "purchase_date",
            SortField::Cost => "cost",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(
            self,
            SortField::Name
                | SortField::Brand
                | SortField::Category
                | SortField::Location
                | SortField::SerialNumber
                | SortField::Status
                | SortField::Condition
        )
    }

    pub fn text_columns() -> Vec<&'static str> {
        Self::ALL.iter().filter(|f| f.is_text()).map(|f| f.as_str()).collect()
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortField::ALL
            .into_iter()
            .find(|f| f.as_str() == s.trim())
            .ok_or_else(|| format!("unknown sort field '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Newest first; used when the caller supplies no sort.
    pub fn default_order() -> Self {
        Self::new(SortField::CreatedAt, SortDirection::Desc)
    }
}

/// A single comparable cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue<'a> {
    Text(&'a str),
    Number(Decimal),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

/// Anything the table can sort by [`SortField`].
pub trait Sortable {
    fn sort_value(&self, field: SortField) -> Option<SortValue<'_>>;
}

macro_rules! impl_sortable {
    ($ty:ty) => {
        impl Sortable for $ty {
            fn sort_value(&self, field: SortField) -> Option<SortValue<'_>> {
                match field {
                    SortField::Name => Some(SortValue::Text(&self.name)),
                    SortField::Brand => Some(SortValue::Text(&self.brand)),
                    SortField::Category => Some(SortValue::Text(&self.category)),
                    SortField::Location => Some(SortValue::Text(&self.location)),
                    SortField::SerialNumber => self.serial_number.as_deref().map(SortValue::Text),
                    SortField::Status => Some(SortValue::Text(self.status.as_str())),
                    SortField::Condition => Some(SortValue::Text(self.condition.as_str())),
                    SortField::PurchaseDate => self.purchase_date.map(SortValue::Date),
                    SortField::Cost => self.cost.map(SortValue::Number),
                    SortField::CreatedAt => Some(SortValue::Timestamp(self.created_at)),
                    SortField::UpdatedAt => Some(SortValue::Timestamp(self.updated_at)),
                }
            }
        }
    };
}

impl_sortable!(Product);
impl_sortable!(ProductView);

/// Case-insensitive collation; ties fall back to the raw strings so the
/// order stays total.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

fn compare_values(a: &SortValue<'_>, b: &SortValue<'_>) -> Ordering {
    match (a, b) {
        (SortValue::Text(a), SortValue::Text(b)) => compare_text(a, b),
        (SortValue::Number(a), SortValue::Number(b)) => a.cmp(b),
        (SortValue::Date(a), SortValue::Date(b)) => a.cmp(b),
        (SortValue::Timestamp(a), SortValue::Timestamp(b)) => a.cmp(b),
        // Mixed kinds never come from one field
        _ => Ordering::Equal,
    }
}

/// Compares two items on one field. `None` always sorts last, whatever the
/// direction.
pub fn compare_by<T: Sortable>(a: &T, b: &T, spec: SortSpec) -> Ordering {
    match (a.sort_value(spec.field), b.sort_value(spec.field)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ord = compare_values(&a, &b);
            match spec.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
    }
}

/// Stable in-place sort.
pub fn sort_items<T: Sortable>(items: &mut [T], spec: SortSpec) {
    items.sort_by(|a, b| compare_by(a, b, spec));
}
