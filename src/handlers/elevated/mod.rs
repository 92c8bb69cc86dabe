// handlers/elevated/mod.rs - Administrator-only endpoints
pub mod audit;
pub mod users;

pub use audit::list as audit_list;
pub use users::{create as users_create, list as users_list};
