use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use super::model::ProductStatus;

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Cannot {action} a product that is {status}")]
    InvalidTransition {
        action: &'static str,
        status: ProductStatus,
    },
}

/// Per-field validation messages, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(HashMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    /// Keeps the first message reported for a field.
    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), InventoryError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(InventoryError::Validation(self))
        }
    }

    pub fn into_map(self) -> HashMap<String, String> {
        self.0
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<_> = self.0.keys().map(String::as_str).collect();
        fields.sort_unstable();
        write!(f, "{}", fields.join(", "))
    }
}
