use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::error::{FieldErrors, InventoryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Available,
    Assigned,
    Loaned,
    Maintenance,
    Retired,
}

impl ProductStatus {
    pub const ALL: [ProductStatus; 5] = [
        ProductStatus::Available,
        ProductStatus::Assigned,
        ProductStatus::Loaned,
        ProductStatus::Maintenance,
        ProductStatus::Retired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Available => "available",
            ProductStatus::Assigned => "assigned",
            ProductStatus::Loaned => "loaned",
            ProductStatus::Maintenance => "maintenance",
            ProductStatus::Retired => "retired",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProductStatus::Available => "Available",
            ProductStatus::Assigned => "Assigned",
            ProductStatus::Loaned => "On loan",
            ProductStatus::Maintenance => "In maintenance",
            ProductStatus::Retired => "Retired",
        }
    }

    /// Whether someone currently holds the item.
    pub fn is_checked_out(&self) -> bool {
        matches!(self, ProductStatus::Assigned | ProductStatus::Loaned)
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown status '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    #[default]
    Good,
    Fair,
    Poor,
    Damaged,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::New,
        Condition::Good,
        Condition::Fair,
        Condition::Poor,
        Condition::Damaged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::Good => "good",
            Condition::Fair => "fair",
            Condition::Poor => "poor",
            Condition::Damaged => "damaged",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Condition::New => "New",
            Condition::Good => "Good",
            Condition::Fair => "Fair",
            Condition::Poor => "Poor",
            Condition::Damaged => "Damaged",
        }
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown condition '{}'", s))
    }
}

/// A product record as owned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub location: String,
    /// `None` marks a stackable quantity item.
    pub serial_number: Option<String>,
    pub status: ProductStatus,
    pub condition: Condition,
    pub description: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub cost: Option<Decimal>,
    pub assignee: Option<String>,
    pub loan_due: Option<NaiveDate>,
    pub retirement_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Builds a fresh `available` product from a validated create payload.
    pub fn create(input: NewProduct) -> Result<Self, InventoryError> {
        input.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            brand: input.brand.trim().to_string(),
            category: input.category.trim().to_string(),
            location: input.location.trim().to_string(),
            serial_number: normalize_serial(input.serial_number.as_deref()),
            status: ProductStatus::Available,
            condition: input.condition.unwrap_or_default(),
            description: normalize_optional(input.description.as_deref()),
            purchase_date: input.purchase_date,
            cost: input.cost.map(normalize_cost),
            assignee: None,
            loan_due: None,
            retirement_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a partial update; unchanged fields keep their values.
    pub fn apply_update(&mut self, update: ProductUpdate) -> Result<(), InventoryError> {
        update.validate()?;
        if let Some(name) = update.name { self.name = name.trim().to_string(); }
        if let Some(brand) = update.brand { self.brand = brand.trim().to_string(); }
        if let Some(category) = update.category { self.category = category.trim().to_string(); }
        if let Some(location) = update.location { self.location = location.trim().to_string(); }
        if let Some(serial) = update.serial_number { self.serial_number = normalize_serial(serial.as_deref()); }
        if let Some(condition) = update.condition { self.condition = condition; }
        if let Some(description) = update.description { self.description = normalize_optional(description.as_deref()); }
        if let Some(purchase_date) = update.purchase_date { self.purchase_date = purchase_date; }
        if let Some(cost) = update.cost { self.cost = cost.map(normalize_cost); }
        self.touch();
        Ok(())
    }

    pub fn is_serialized(&self) -> bool {
        self.serial_number.is_some()
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Trims a serial number; blank input means "no serial number".
pub fn normalize_serial(raw: Option<&str>) -> Option<String> {
    normalize_optional(raw)
}

fn normalize_optional(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub brand: String,
    pub category: String,
    pub location: String,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub purchase_date: Option<NaiveDate>,
    #[serde(default)]
    pub cost: Option<Decimal>,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), InventoryError> {
        let mut errors = FieldErrors::new();
        required_text(&mut errors, "name", &self.name);
        required_text(&mut errors, "brand", &self.brand);
        required_text(&mut errors, "category", &self.category);
        required_text(&mut errors, "location", &self.location);
        check_serial(&mut errors, self.serial_number.as_deref());
        check_cost(&mut errors, self.cost);
        errors.into_result()
    }
}

/// Partial update. For nullable fields the outer `Option` means "present in
/// the payload" and the inner one carries an explicit `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub serial_number: Option<Option<String>>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub purchase_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub cost: Option<Option<Decimal>>,
}

impl ProductUpdate {
    pub fn validate(&self) -> Result<(), InventoryError> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name { required_text(&mut errors, "name", name); }
        if let Some(brand) = &self.brand { required_text(&mut errors, "brand", brand); }
        if let Some(category) = &self.category { required_text(&mut errors, "category", category); }
        if let Some(location) = &self.location { required_text(&mut errors, "location", location); }
        if let Some(serial) = &self.serial_number { check_serial(&mut errors, serial.as_deref()); }
        if let Some(cost) = self.cost { check_cost(&mut errors, cost); }
        errors.into_result()
    }
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

const MAX_TEXT_LEN: usize = 255;

fn required_text(errors: &mut FieldErrors, field: &str, value: &str) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.insert(field, "This field is required");
    } else if trimmed.chars().count() > MAX_TEXT_LEN {
        errors.insert(field, format!("Must be at most {} characters", MAX_TEXT_LEN));
    }
}

fn check_serial(errors: &mut FieldErrors, serial: Option<&str>) {
    if let Some(serial) = serial {
        if serial.trim().chars().count() > MAX_TEXT_LEN {
            errors.insert("serial_number", format!("Must be at most {} characters", MAX_TEXT_LEN));
        }
    }
}

/// Costs are stored as `NUMERIC(12, 2)`.
const COST_SCALE: u32 = 2;

fn max_cost() -> Decimal {
    Decimal::from(10_000_000_000_i64)
}

fn check_cost(errors: &mut FieldErrors, cost: Option<Decimal>) {
    match cost {
        Some(c) if c.is_sign_negative() => errors.insert("cost", "Cost cannot be negative"),
        Some(c) if normalize_cost(c) >= max_cost() => errors.insert("cost", "Cost must be below 10,000,000,000"),
        _ => {}
    }
}

fn normalize_cost(cost: Decimal) -> Decimal {
    cost.round_dp(COST_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn laptop() -> NewProduct {
        NewProduct {
            name: " Laptop ".into(),
            brand: "Dell".into(),
            category: "Computers".into(),
            location: "HQ".into(),
            serial_number: Some("   ".into()),
            ..Default::default()
        }
    }

    #[test]
    fn create_trims_and_blanks_serial() {
        let product = Product::create(laptop()).unwrap();
        assert_eq!(product.name, "Laptop");
        assert_eq!(product.serial_number, None);
        assert_eq!(product.status, ProductStatus::Available);
        assert_eq!(product.condition, Condition::Good);
    }

    #[test]
    fn create_reports_every_missing_field() {
        let err = Product::create(NewProduct::default()).unwrap_err();
        match err {
            InventoryError::Validation(fields) => {
                for field in ["name", "brand", "category", "location"] {
                    assert!(fields.contains(field), "missing {}", field);
                }
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn update_distinguishes_null_from_absent() {
        let mut product = Product::create(NewProduct {
            serial_number: Some("SN-1".into()),
            description: Some("spare".into()),
            ..laptop()
        })
        .unwrap();

        let update: ProductUpdate = serde_json::from_value(json!({ "serial_number": null })).unwrap();
        product.apply_update(update).unwrap();
        assert_eq!(product.serial_number, None);
        assert_eq!(product.description.as_deref(), Some("spare"));
    }

    #[test]
    fn negative_cost_is_rejected() {
        let input = NewProduct { cost: Some(Decimal::new(-100, 2)), ..laptop() };
        assert!(matches!(input.validate(), Err(InventoryError::Validation(_))));
    }

    #[test]
    fn cost_fits_the_stored_precision() {
        let too_big = NewProduct { cost: Some(Decimal::new(10_000_000_000, 0)), ..laptop() };
        match too_big.validate() {
            Err(InventoryError::Validation(fields)) => assert!(fields.contains("cost")),
            other => panic!("unexpected result: {:?}", other),
        }

        let product = Product::create(NewProduct { cost: Some(Decimal::new(1_234_567, 3)), ..laptop() }).unwrap();
        assert_eq!(product.cost, Some(Decimal::new(123_457, 2)));

        let mut updated = product.clone();
        let update = ProductUpdate { cost: Some(Some(Decimal::new(9_999_999_999_994, 3))), ..Default::default() };
        updated.apply_update(update).unwrap();
        assert_eq!(updated.cost, Some(Decimal::new(999_999_999_999, 2)));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Loaned".parse::<ProductStatus>(), Ok(ProductStatus::Loaned));
        assert!("lost".parse::<ProductStatus>().is_err());
    }
}
