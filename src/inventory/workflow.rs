use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::{FieldErrors, InventoryError};
use super::model::{Product, ProductStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRequest {
    pub assignee: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanRequest {
    pub borrower: String,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetireRequest {
    pub reason: String,
}

fn required_person(field: &str, value: &str) -> Result<String, InventoryError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InventoryError::Validation(FieldErrors::single(field, "This field is required")));
    }
    Ok(trimmed.to_string())
}

fn ensure(product: &Product, action: &'static str, allowed: &[ProductStatus]) -> Result<(), InventoryError> {
    if allowed.contains(&product.status) {
        Ok(())
    } else {
        Err(InventoryError::InvalidTransition { action, status: product.status })
    }
}

impl Product {
    /// available -> assigned
    pub fn assign(&mut self, request: &AssignRequest) -> Result<(), InventoryError> {
        let assignee = required_person("assignee", &request.assignee)?;
        ensure(self, "assign", &[ProductStatus::Available])?;
        self.status = ProductStatus::Assigned;
        self.assignee = Some(assignee);
        self.loan_due = None;
        self.touch();
        Ok(())
    }

    /// available -> loaned, due date today or later
    pub fn loan(&mut self, request: &LoanRequest) -> Result<(), InventoryError> {
        let borrower = required_person("borrower", &request.borrower)?;
        if request.due_date < Utc::now().date_naive() {
            return Err(InventoryError::Validation(FieldErrors::single(
                "due_date",
                "Due date cannot be in the past",
            )));
        }
        ensure(self, "loan", &[ProductStatus::Available])?;
        self.status = ProductStatus::Loaned;
        self.assignee = Some(borrower);
        self.loan_due = Some(request.due_date);
        self.touch();
        Ok(())
    }

    /// assigned | loaned | maintenance -> available
    pub fn return_to_stock(&mut self) -> Result<(), InventoryError> {
        ensure(
            self,
            "return",
            &[ProductStatus::Assigned, ProductStatus::Loaned, ProductStatus::Maintenance],
        )?;
        self.status = ProductStatus::Available;
        self.assignee = None;
        self.loan_due = None;
        self.touch();
        Ok(())
    }

    /// available -> maintenance
    pub fn send_to_maintenance(&mut self) -> Result<(), InventoryError> {
        ensure(self, "send to maintenance", &[ProductStatus::Available])?;
        self.status = ProductStatus::Maintenance;
        self.touch();
        Ok(())
    }

    /// available | maintenance -> retired
    pub fn retire(&mut self, request: &RetireRequest) -> Result<(), InventoryError> {
        let reason = required_person("reason", &request.reason)?;
        ensure(self, "retire", &[ProductStatus::Available, ProductStatus::Maintenance])?;
        self.status = ProductStatus::Retired;
        self.retirement_reason = Some(reason);
        self.touch();
        Ok(())
    }

    /// Items someone currently holds cannot be deleted.
    pub fn ensure_deletable(&self) -> Result<(), InventoryError> {
        if self.status.is_checked_out() {
            return Err(InventoryError::InvalidTransition { action: "delete", status: self.status });
        }
        Ok(())
    }
}
