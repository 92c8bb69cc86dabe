use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::models::User;
use crate::database::store::{Store, StoreError};
use crate::inventory::{sort_items, AuditEntry, AuditQuery, InventoryFilter, Product};
use crate::types::Page;

#[derive(Default)]
struct Tables {
    products: Vec<Product>,
    audit: Vec<AuditEntry>,
    users: Vec<User>,
}

/// Process-local store used when no database is configured and by the
/// integration tests. Applies the same filtering, ordering and paging rules
/// as the SQL store.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn serial_taken(products: &[Product], candidate: &Product) -> bool {
    match &candidate.serial_number {
        Some(serial) => products
            .iter()
            .any(|p| p.id != candidate.id && p.serial_number.as_deref() == Some(serial.as_str())),
        None => false,
    }
}

fn serial_conflict(product: &Product) -> StoreError {
    StoreError::Conflict(format!(
        "Serial number '{}' is already registered",
        product.serial_number.as_deref().unwrap_or_default()
    ))
}

/// Position of the row with `id`, provided nobody wrote it after `read_at`.
fn current_index(products: &[Product], id: Uuid, read_at: DateTime<Utc>) -> Result<usize, StoreError> {
    let index = products
        .iter()
        .position(|p| p.id == id)
        .ok_or_else(|| StoreError::NotFound(format!("Product {} not found", id)))?;
    if products[index].updated_at != read_at {
        return Err(StoreError::Conflict(format!("Product {} was modified by another request", id)));
    }
    Ok(index)
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_products(&self, filter: &InventoryFilter) -> Result<Page<Product>, StoreError> {
        let tables = self.tables.read().await;
        let mut matching: Vec<Product> = tables.products.iter().filter(|p| filter.matches(p)).cloned().collect();
        drop(tables);

        // id order first so the stable sort leaves ties in id order
        matching.sort_by_key(|p| p.id);
        sort_items(&mut matching, filter.effective_sort());

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.per_page as usize)
            .collect();
        Ok(Page::new(items, total, filter.page, filter.per_page))
    }

    async fn get_product(&self, id: Uuid) -> Result<Product, StoreError> {
        self.tables
            .read()
            .await
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Product {} not found", id)))
    }

    async fn insert_product(&self, product: &Product, audit: &AuditEntry) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if serial_taken(&tables.products, product) {
            return Err(serial_conflict(product));
        }
        tables.products.push(product.clone());
        tables.audit.push(audit.clone());
        Ok(())
    }

    async fn update_product(
        &self,
        product: &Product,
        read_at: DateTime<Utc>,
        audit: &AuditEntry,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let index = current_index(&tables.products, product.id, read_at)?;
        if serial_taken(&tables.products, product) {
            return Err(serial_conflict(product));
        }
        tables.products[index] = product.clone();
        tables.audit.push(audit.clone());
        Ok(())
    }

    async fn delete_product(&self, id: Uuid, read_at: DateTime<Utc>, audit: &AuditEntry) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let index = current_index(&tables.products, id, read_at)?;
        tables.products.remove(index);
        tables.audit.push(audit.clone());
        Ok(())
    }

    async fn record_audit(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        self.tables.write().await.audit.push(entry.clone());
        Ok(())
    }

    async fn list_audit(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .audit
            .iter()
            .rev()
            .filter(|e| query.matches(e))
            .take(query.effective_limit() as usize)
            .cloned()
            .collect())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.iter().find(|u| u.email == email).cloned())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("Email '{}' is already registered", user.email)));
        }
        tables.users.push(user.clone());
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users = self.tables.read().await.users.clone();
        users.sort_by_key(|u| u.name.to_lowercase());
        Ok(users)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{AuditAction, FilterChange, NewProduct, ProductStatus, SortField, SortSpec};
    use crate::filter::SortDirection;
    use serde_json::json;

    fn product(name: &str, serial: Option<&str>) -> Product {
        Product::create(NewProduct {
            name: name.into(),
            brand: "Dell".into(),
            category: "Laptops".into(),
            location: "HQ".into(),
            serial_number: serial.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    fn entry(action: AuditAction, product: &Product) -> AuditEntry {
        AuditEntry::new(action, Some(product.id), "ed@x.io", json!({}))
    }

    async fn insert(store: &MemoryStore, product: &Product) -> Result<(), StoreError> {
        store.insert_product(product, &entry(AuditAction::Create, product)).await
    }

    #[tokio::test]
    async fn rejects_duplicate_serials() {
        let store = MemoryStore::new();
        insert(&store, &product("Latitude", Some("SN-1"))).await.unwrap();
        let err = insert(&store, &product("Latitude", Some("SN-1"))).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // stackable items share no serial and never conflict
        insert(&store, &product("Mouse", None)).await.unwrap();
        insert(&store, &product("Mouse", None)).await.unwrap();
        assert_eq!(store.list_audit(&AuditQuery::default()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn lists_filtered_sorted_and_paged() {
        let store = MemoryStore::new();
        for name in ["charlie", "Alpha", "bravo", "delta"] {
            insert(&store, &product(name, None)).await.unwrap();
        }
        let mut retired = product("echo", None);
        retired.status = ProductStatus::Retired;
        insert(&store, &retired).await.unwrap();

        let filter = InventoryFilter::default()
            .apply(FilterChange::Status(Some(ProductStatus::Available)))
            .apply(FilterChange::Sort(Some(SortSpec::new(SortField::Name, SortDirection::Asc))))
            .apply(FilterChange::PerPage(3));
        let page = store.list_products(&filter).await.unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 2);
        let names: Vec<_> = page.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Alpha", "bravo", "charlie"]);

        let second = store.list_products(&filter.apply(FilterChange::Page(2))).await.unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].name, "delta");
    }

    #[tokio::test]
    async fn update_and_delete_missing_rows() {
        let store = MemoryStore::new();
        let ghost = product("ghost", None);
        let audit = entry(AuditAction::Update, &ghost);
        let updated = store.update_product(&ghost, ghost.updated_at, &audit).await;
        assert!(matches!(updated, Err(StoreError::NotFound(_))));
        let deleted = store.delete_product(ghost.id, ghost.updated_at, &audit).await;
        assert!(matches!(deleted, Err(StoreError::NotFound(_))));
        assert!(store.list_audit(&AuditQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_writes_are_rejected_without_audit() {
        let store = MemoryStore::new();
        let original = product("Latitude", Some("SN-1"));
        insert(&store, &original).await.unwrap();
        let read_at = original.updated_at;

        let mut first = original.clone();
        first.location = "Lab".into();
        first.updated_at = read_at + chrono::Duration::seconds(1);
        store.update_product(&first, read_at, &entry(AuditAction::Update, &first)).await.unwrap();

        // second writer still holds the pre-update timestamp
        let mut second = original.clone();
        second.location = "Depot".into();
        second.updated_at = read_at + chrono::Duration::seconds(2);
        let updated = store.update_product(&second, read_at, &entry(AuditAction::Update, &second)).await;
        assert!(matches!(updated, Err(StoreError::Conflict(_))));
        let deleted = store.delete_product(original.id, read_at, &entry(AuditAction::Delete, &original)).await;
        assert!(matches!(deleted, Err(StoreError::Conflict(_))));

        assert_eq!(store.get_product(original.id).await.unwrap().location, "Lab");
        assert_eq!(store.list_audit(&AuditQuery::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn audit_is_newest_first() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.record_audit(&AuditEntry::new(AuditAction::Create, Some(id), "a@x.io", json!({}))).await.unwrap();
        store.record_audit(&AuditEntry::new(AuditAction::Update, Some(id), "a@x.io", json!({}))).await.unwrap();
        store.record_audit(&AuditEntry::new(AuditAction::Login, None, "a@x.io", json!({}))).await.unwrap();

        let all = store.list_audit(&AuditQuery::default()).await.unwrap();
        assert_eq!(all[0].action, AuditAction::Login);

        let for_product = store
            .list_audit(&AuditQuery { product_id: Some(id), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(for_product.len(), 2);
        assert_eq!(for_product[0].action, AuditAction::Update);
    }
}
