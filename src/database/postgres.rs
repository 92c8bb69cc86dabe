use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::models::{AuditRow, ProductRow, User, UserRow};
use crate::database::query_builder::QueryBuilder;
use crate::database::store::{Store, StoreError};
use crate::inventory::{AuditEntry, AuditQuery, InventoryFilter, Product, SortField};
use crate::types::Page;

const PRODUCT_COLUMNS: &str = "id, name, brand, category, location, serial_number, status, condition, \
     description, purchase_date, cost, assignee, loan_due, retirement_reason, created_at, updated_at";

/// Unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_unique(err: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    let unique = matches!(&err, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION));
    if unique {
        StoreError::Conflict(what())
    } else {
        StoreError::Sqlx(err)
    }
}

fn insert_audit(entry: &AuditEntry) -> Query<'_, Postgres, PgArguments> {
    sqlx::query(
        "INSERT INTO audit_log (id, action, product_id, actor, details, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(entry.id)
    .bind(entry.action.as_str())
    .bind(entry.product_id)
    .bind(&entry.actor)
    .bind(&entry.details)
    .bind(entry.created_at)
}

/// Explains a conditional write that matched no row. The transaction is
/// rolled back when it is dropped.
async fn stale_or_missing(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> StoreError {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
        .bind(id)
        .fetch_one(&mut **tx)
        .await;
    match exists {
        Ok(true) => StoreError::Conflict(format!("Product {} was modified by another request", id)),
        Ok(false) => StoreError::NotFound(format!("Product {} not found", id)),
        Err(err) => StoreError::Sqlx(err),
    }
}

fn serial_conflict(product: &Product) -> String {
    format!(
        "Serial number '{}' is already registered",
        product.serial_number.as_deref().unwrap_or_default()
    )
}

#[async_trait]
impl Store for PgStore {
    async fn list_products(&self, filter: &InventoryFilter) -> Result<Page<Product>, StoreError> {
        let text_columns = SortField::text_columns();
        let data = filter.to_filter_data();

        let (total, rows) = QueryBuilder::<ProductRow>::new("products")?
            .text_columns(&text_columns)
            .max_limit(Some(i64::from(filter.per_page)))
            .filter(data)?
            .fetch_page(&self.pool)
            .await?;

        let items = rows.into_iter().map(Product::try_from).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, total.max(0) as u64, filter.page, filter.per_page))
    }

    async fn get_product(&self, id: Uuid) -> Result<Product, StoreError> {
        let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Product {} not found", id)))?;
        Product::try_from(row)
    }

    async fn insert_product(&self, product: &Product, audit: &AuditEntry) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO products ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
            PRODUCT_COLUMNS
        );
        let mut tx = self.pool.begin().await?;
        sqlx::query(&sql)
            .bind(product.id)
            .bind(&product.name)
            .bind(&product.brand)
            .bind(&product.category)
            .bind(&product.location)
            .bind(&product.serial_number)
            .bind(product.status.as_str())
            .bind(product.condition.as_str())
            .bind(&product.description)
            .bind(product.purchase_date)
            .bind(product.cost)
            .bind(&product.assignee)
            .bind(product.loan_due)
            .bind(&product.retirement_reason)
            .bind(product.created_at)
            .bind(product.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_unique(e, || serial_conflict(product)))?;
        insert_audit(audit).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_product(
        &self,
        product: &Product,
        read_at: DateTime<Utc>,
        audit: &AuditEntry,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = $2, brand = $3, category = $4, location = $5, serial_number = $6,
                status = $7, condition = $8, description = $9, purchase_date = $10, cost = $11,
                assignee = $12, loan_due = $13, retirement_reason = $14, updated_at = $15
            WHERE id = $1 AND updated_at = $16
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.brand)
        .bind(&product.category)
        .bind(&product.location)
        .bind(&product.serial_number)
        .bind(product.status.as_str())
        .bind(product.condition.as_str())
        .bind(&product.description)
        .bind(product.purchase_date)
        .bind(product.cost)
        .bind(&product.assignee)
        .bind(product.loan_due)
        .bind(&product.retirement_reason)
        .bind(product.updated_at)
        .bind(read_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique(e, || serial_conflict(product)))?;

        if result.rows_affected() == 0 {
            return Err(stale_or_missing(&mut tx, product.id).await);
        }
        insert_audit(audit).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_product(&self, id: Uuid, read_at: DateTime<Utc>, audit: &AuditEntry) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM products WHERE id = $1 AND updated_at = $2")
            .bind(id)
            .bind(read_at)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(stale_or_missing(&mut tx, id).await);
        }
        insert_audit(audit).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn record_audit(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        insert_audit(entry).execute(&self.pool).await?;
        Ok(())
    }

    async fn list_audit(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, action, product_id, actor, details, created_at
            FROM audit_log
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::text IS NULL OR action = $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(query.product_id)
        .bind(query.action.map(|a| a.as_str()))
        .bind(i64::from(query.effective_limit()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditEntry::try_from).collect()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, role, password_hash, is_active, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, role, password_hash, is_active, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, role, password_hash, is_active, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, || format!("Email '{}' is already registered", user.email)))?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, role, password_hash, is_active, created_at FROM users ORDER BY lower(name)",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
