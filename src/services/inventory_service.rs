use serde_json::{json, Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::Store;
use crate::inventory::{
    group_rows, AssignRequest, AuditAction, AuditEntry, GroupRow, InventoryFilter, LoanRequest, NewProduct, Product,
    ProductUpdate, ProductView, RetireRequest,
};
use crate::types::Page;

use super::ServiceError;

/// Status transition requested through one of the workflow endpoints.
#[derive(Debug, Clone)]
pub enum WorkflowAction {
    Assign(AssignRequest),
    Loan(LoanRequest),
    Return,
    Maintenance,
    Retire(RetireRequest),
}

impl WorkflowAction {
    pub fn audit_action(&self) -> AuditAction {
        match self {
            WorkflowAction::Assign(_) => AuditAction::Assign,
            WorkflowAction::Loan(_) => AuditAction::Loan,
            WorkflowAction::Return => AuditAction::Return,
            WorkflowAction::Maintenance => AuditAction::Maintenance,
            WorkflowAction::Retire(_) => AuditAction::Retire,
        }
    }

    fn apply(&self, product: &mut Product) -> Result<(), ServiceError> {
        match self {
            WorkflowAction::Assign(request) => product.assign(request)?,
            WorkflowAction::Loan(request) => product.loan(request)?,
            WorkflowAction::Return => product.return_to_stock()?,
            WorkflowAction::Maintenance => product.send_to_maintenance()?,
            WorkflowAction::Retire(request) => product.retire(request)?,
        }
        Ok(())
    }

    fn details(&self, from: &Product) -> Value {
        let mut details = json!({ "from": from.status.as_str() });
        match self {
            WorkflowAction::Assign(r) => details["assignee"] = json!(r.assignee.trim()),
            WorkflowAction::Loan(r) => {
                details["borrower"] = json!(r.borrower.trim());
                details["due_date"] = json!(r.due_date);
            }
            WorkflowAction::Retire(r) => details["reason"] = json!(r.reason.trim()),
            WorkflowAction::Return | WorkflowAction::Maintenance => {}
        }
        details
    }
}

/// Inventory use cases. Every successful mutation appends exactly one
/// audit entry attributed to `actor`.
pub struct InventoryService {
    store: Arc<dyn Store>,
}

impl InventoryService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, filter: &InventoryFilter) -> Result<Page<ProductView>, ServiceError> {
        let page = self.store.list_products(filter).await?;
        Ok(page.map(ProductView::from))
    }

    /// Grouped projection of one page. `total` and `total_pages` still count
    /// individual items, so pagination matches the flat listing.
    pub async fn grouped(&self, filter: &InventoryFilter) -> Result<Page<GroupRow<ProductView>>, ServiceError> {
        let page = self.list(filter).await?;
        Ok(Page {
            items: group_rows(page.items),
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            total_pages: page.total_pages,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<ProductView, ServiceError> {
        Ok(self.store.get_product(id).await?.into())
    }

    pub async fn create(&self, input: NewProduct, actor: &str) -> Result<ProductView, ServiceError> {
        let product = Product::create(input)?;
        let details = json!({ "name": product.name, "serial_number": product.serial_number });
        let entry = AuditEntry::new(AuditAction::Create, Some(product.id), actor, details);
        self.store.insert_product(&product, &entry).await?;
        tracing::info!(id = %product.id, actor, "Product created");
        Ok(product.into())
    }

    pub async fn update(&self, id: Uuid, update: ProductUpdate, actor: &str) -> Result<ProductView, ServiceError> {
        let mut product = self.store.get_product(id).await?;
        let before = product.clone();
        product.apply_update(update)?;
        let details = json!({ "changed": changed_fields(&before, &product) });
        let entry = AuditEntry::new(AuditAction::Update, Some(id), actor, details);
        self.store.update_product(&product, before.updated_at, &entry).await?;
        Ok(product.into())
    }

    pub async fn delete(&self, id: Uuid, actor: &str) -> Result<(), ServiceError> {
        let product = self.store.get_product(id).await?;
        product.ensure_deletable()?;
        let details = json!({ "name": product.name, "serial_number": product.serial_number });
        let entry = AuditEntry::new(AuditAction::Delete, Some(id), actor, details);
        self.store.delete_product(id, product.updated_at, &entry).await?;
        tracing::info!(%id, actor, "Product deleted");
        Ok(())
    }

    /// Applies a workflow step. Losing a race against another write to the
    /// same product fails with a store `Conflict` rather than overwriting it.
    pub async fn transition(&self, id: Uuid, action: WorkflowAction, actor: &str) -> Result<ProductView, ServiceError> {
        let mut product = self.store.get_product(id).await?;
        let read_at = product.updated_at;
        let details = action.details(&product);
        action.apply(&mut product)?;
        let entry = AuditEntry::new(action.audit_action(), Some(id), actor, details);
        self.store.update_product(&product, read_at, &entry).await?;
        tracing::info!(%id, actor, action = %action.audit_action(), status = %product.status, "Product transitioned");
        Ok(product.into())
    }
}

/// Top-level fields whose serialized value differs, ignoring timestamps.
fn changed_fields(before: &Product, after: &Product) -> Vec<String> {
    let as_map = |p: &Product| match serde_json::to_value(p) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    let (before, after) = (as_map(before), as_map(after));
    let mut changed: Vec<String> = after
        .iter()
        .filter(|(key, _)| key.as_str() != "updated_at")
        .filter(|(key, value)| before.get(key.as_str()) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect();
    changed.sort();
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::User;
    use crate::database::{MemoryStore, StoreError};
    use crate::inventory::{AuditQuery, InventoryError, ProductStatus};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};

    fn service() -> (InventoryService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (InventoryService::new(store.clone()), store)
    }

    fn laptop(serial: Option<&str>) -> NewProduct {
        NewProduct {
            name: "Laptop".into(),
            brand: "Dell".into(),
            category: "Computers".into(),
            location: "HQ".into(),
            serial_number: serial.map(str::to_string),
            ..Default::default()
        }
    }

    async fn audit_count(store: &MemoryStore) -> usize {
        store.list_audit(&AuditQuery::default()).await.unwrap().len()
    }

    #[tokio::test]
    async fn mutations_append_one_audit_entry_each() {
        let (svc, store) = service();
        let created = svc.create(laptop(Some("SN-1")), "ed@x.io").await.unwrap();
        assert_eq!(audit_count(&store).await, 1);

        let update = ProductUpdate { location: Some("Lab".into()), ..Default::default() };
        let updated = svc.update(created.id, update, "ed@x.io").await.unwrap();
        assert_eq!(updated.location, "Lab");
        assert_eq!(audit_count(&store).await, 2);

        svc.transition(created.id, WorkflowAction::Maintenance, "ed@x.io").await.unwrap();
        svc.transition(created.id, WorkflowAction::Return, "ed@x.io").await.unwrap();
        svc.delete(created.id, "admin@x.io").await.unwrap();
        assert_eq!(audit_count(&store).await, 5);

        let latest = store.list_audit(&AuditQuery::default()).await.unwrap();
        assert_eq!(latest[0].action, AuditAction::Delete);
        assert_eq!(latest[0].actor, "admin@x.io");
        assert_eq!(latest[3].details["changed"], json!(["location"]));
    }

    #[tokio::test]
    async fn failed_mutations_leave_no_audit_trail() {
        let (svc, store) = service();
        svc.create(laptop(Some("SN-1")), "ed@x.io").await.unwrap();
        let dup = svc.create(laptop(Some("SN-1")), "ed@x.io").await.unwrap_err();
        assert!(matches!(dup, ServiceError::Store(StoreError::Conflict(_))));

        let invalid = svc.create(NewProduct::default(), "ed@x.io").await.unwrap_err();
        assert!(matches!(invalid, ServiceError::Inventory(InventoryError::Validation(_))));

        assert_eq!(audit_count(&store).await, 1);
    }

    #[tokio::test]
    async fn checked_out_items_cannot_be_deleted() {
        let (svc, _) = service();
        let item = svc.create(laptop(None), "ed@x.io").await.unwrap();
        let loan = LoanRequest { borrower: "Sam".into(), due_date: Utc::now().date_naive() + Duration::days(3) };
        let loaned = svc.transition(item.id, WorkflowAction::Loan(loan), "ed@x.io").await.unwrap();
        assert_eq!(loaned.status, ProductStatus::Loaned);
        assert_eq!(loaned.assignee.as_deref(), Some("Sam"));

        let err = svc.delete(item.id, "admin@x.io").await.unwrap_err();
        assert!(matches!(err, ServiceError::Inventory(InventoryError::InvalidTransition { .. })));
        assert!(svc.get(item.id).await.is_ok());
    }

    /// Hands out the row, then lets other tasks run before the caller writes.
    struct YieldingStore(MemoryStore);

    #[async_trait]
    impl Store for YieldingStore {
        async fn list_products(&self, filter: &InventoryFilter) -> Result<Page<Product>, StoreError> {
            self.0.list_products(filter).await
        }

        async fn get_product(&self, id: Uuid) -> Result<Product, StoreError> {
            let product = self.0.get_product(id).await;
            tokio::task::yield_now().await;
            product
        }

        async fn insert_product(&self, product: &Product, audit: &AuditEntry) -> Result<(), StoreError> {
            self.0.insert_product(product, audit).await
        }

        async fn update_product(
            &self,
            product: &Product,
            read_at: DateTime<Utc>,
            audit: &AuditEntry,
        ) -> Result<(), StoreError> {
            self.0.update_product(product, read_at, audit).await
        }

        async fn delete_product(&self, id: Uuid, read_at: DateTime<Utc>, audit: &AuditEntry) -> Result<(), StoreError> {
            self.0.delete_product(id, read_at, audit).await
        }

        async fn record_audit(&self, entry: &AuditEntry) -> Result<(), StoreError> {
            self.0.record_audit(entry).await
        }

        async fn list_audit(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError> {
            self.0.list_audit(query).await
        }

        async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            self.0.find_user_by_email(email).await
        }

        async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            self.0.get_user(id).await
        }

        async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
            self.0.insert_user(user).await
        }

        async fn list_users(&self) -> Result<Vec<User>, StoreError> {
            self.0.list_users().await
        }

        async fn health_check(&self) -> Result<(), StoreError> {
            self.0.health_check().await
        }
    }

    fn assign(name: &str) -> WorkflowAction {
        WorkflowAction::Assign(AssignRequest { assignee: name.into() })
    }

    #[tokio::test]
    async fn concurrent_assigns_let_exactly_one_win() {
        let store = Arc::new(YieldingStore(MemoryStore::new()));
        let svc = InventoryService::new(store.clone());
        let item = svc.create(laptop(Some("SN-9")), "ed@x.io").await.unwrap();

        let (ana, luis) = tokio::join!(
            svc.transition(item.id, assign("Ana"), "ed@x.io"),
            svc.transition(item.id, assign("Luis"), "al@x.io"),
        );
        let winner = match (&ana, &luis) {
            (Ok(_), Err(ServiceError::Store(StoreError::Conflict(_)))) => "Ana",
            (Err(ServiceError::Store(StoreError::Conflict(_))), Ok(_)) => "Luis",
            other => panic!("expected one winner and one conflict, got {:?}", other),
        };

        let stored = svc.get(item.id).await.unwrap();
        assert_eq!(stored.status, ProductStatus::Assigned);
        assert_eq!(stored.assignee.as_deref(), Some(winner));

        let assigns = store
            .list_audit(&AuditQuery { action: Some(AuditAction::Assign), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(assigns.len(), 1);
        assert_eq!(assigns[0].details["assignee"], json!(winner));
    }

    #[tokio::test]
    async fn update_racing_a_transition_cannot_undo_it() {
        let store = Arc::new(YieldingStore(MemoryStore::new()));
        let svc = InventoryService::new(store.clone());
        let item = svc.create(laptop(Some("SN-10")), "ed@x.io").await.unwrap();

        let update = ProductUpdate { location: Some("Lab".into()), ..Default::default() };
        let (moved, assigned) = tokio::join!(
            svc.update(item.id, update, "ed@x.io"),
            svc.transition(item.id, assign("Ana"), "ed@x.io"),
        );
        assert!(moved.is_ok() != assigned.is_ok());

        let stored = svc.get(item.id).await.unwrap();
        assert_eq!(stored.status == ProductStatus::Assigned, assigned.is_ok());
        assert_eq!(stored.location == "Lab", moved.is_ok());
        assert_eq!(audit_count(&store.0).await, 2);
    }

    #[tokio::test]
    async fn grouped_collapses_stacks_on_the_page() {
        let (svc, _) = service();
        svc.create(laptop(None), "ed@x.io").await.unwrap();
        svc.create(laptop(Some("  ")), "ed@x.io").await.unwrap();
        svc.create(laptop(Some("SN-001")), "ed@x.io").await.unwrap();
        svc.create(laptop(Some("SN-002")), "ed@x.io").await.unwrap();

        let grouped = svc.grouped(&InventoryFilter::default()).await.unwrap();
        assert_eq!(grouped.total, 4);
        assert_eq!(grouped.items.len(), 3);
        assert!(grouped.items.iter().any(|row| row.label == "Laptop (x2)" && row.quantity == 2));
    }
}
