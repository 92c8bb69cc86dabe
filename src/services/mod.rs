use thiserror::Error;

use crate::auth::AuthError;
use crate::database::models::NewUserError;
use crate::database::StoreError;
use crate::error::ApiError;
use crate::inventory::InventoryError;

pub mod auth_service;
pub mod inventory_service;

pub use auth_service::AuthService;
pub use inventory_service::{InventoryService, WorkflowAction};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    NewUser(#[from] NewUserError),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Store(e) => e.into(),
            ServiceError::Inventory(e) => e.into(),
            ServiceError::Auth(e) => e.into(),
            ServiceError::NewUser(e) => e.into(),
        }
    }
}
