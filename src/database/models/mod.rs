pub mod audit;
pub mod product;
pub mod user;

pub use audit::AuditRow;
pub use product::ProductRow;
pub use user::{normalize_email, NewUser, NewUserError, User, UserRow};
