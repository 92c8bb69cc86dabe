pub mod audit;
pub mod error;
pub mod grouping;
pub mod model;
pub mod query;
pub mod selection;
pub mod sort;
pub mod view;
pub mod workflow;

pub use audit::{AuditAction, AuditEntry, AuditQuery};
pub use error::{FieldErrors, InventoryError};
pub use grouping::{group_items, group_key, group_rows, GroupKey, GroupRow, Groupable, Groups, RowKind};
pub use model::{Condition, NewProduct, Product, ProductStatus, ProductUpdate};
pub use query::{FilterChange, InventoryFilter};
pub use selection::{derive_group_state, GroupState, SelectionSet};
pub use sort::{sort_items, SortField, SortSpec, Sortable};
pub use view::ProductView;
pub use workflow::{AssignRequest, LoanRequest, RetireRequest};
