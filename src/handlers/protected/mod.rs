// handlers/protected/mod.rs - Endpoints for any signed-in user
//
// Reading needs Reader, mutating needs Editor, deleting needs Administrator.
pub mod auth;
pub mod inventory;
pub mod workflow;

pub use auth::me;
pub use inventory::{create, delete, get, grouped, list, update};
pub use workflow::{assign, loan, maintenance, retire, return_to_stock};
