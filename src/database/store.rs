use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::User;
use crate::filter::FilterError;
use crate::inventory::{AuditEntry, AuditQuery, InventoryFilter, Product};
use crate::types::Page;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Corrupt row: {0}")]
    Decode(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<FilterError> for StoreError {
    fn from(err: FilterError) -> Self {
        StoreError::QueryError(err.to_string())
    }
}

/// Persistence boundary. Handlers and services only see this trait.
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_products(&self, filter: &InventoryFilter) -> Result<Page<Product>, StoreError>;

    async fn get_product(&self, id: Uuid) -> Result<Product, StoreError>;

    /// Inserts the product and its audit entry as one unit. Fails with
    /// `Conflict` when the serial number is already taken.
    async fn insert_product(&self, product: &Product, audit: &AuditEntry) -> Result<(), StoreError>;

    /// Replaces the stored row only while its `updated_at` still equals
    /// `read_at`, recording `audit` in the same unit. A row that changed
    /// since it was read fails with `Conflict` and nothing is written.
    async fn update_product(&self, product: &Product, read_at: DateTime<Utc>, audit: &AuditEntry)
        -> Result<(), StoreError>;

    /// Same precondition as `update_product`.
    async fn delete_product(&self, id: Uuid, read_at: DateTime<Utc>, audit: &AuditEntry) -> Result<(), StoreError>;

    /// Audit entries that do not accompany a product write, such as logins.
    async fn record_audit(&self, entry: &AuditEntry) -> Result<(), StoreError>;

    /// Newest first.
    async fn list_audit(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Fails with `Conflict` when the email is already registered.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
