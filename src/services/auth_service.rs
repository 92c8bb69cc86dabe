use serde_json::json;
use std::sync::Arc;

use crate::auth::{verify_password, AuthError, JwtKeys};
use crate::database::models::{normalize_email, NewUser, User};
use crate::database::Store;
use crate::inventory::{AuditAction, AuditEntry};

use super::ServiceError;

/// Successful login: the user and the session token to put in the cookie.
#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub token: String,
}

pub struct AuthService {
    store: Arc<dyn Store>,
    jwt: Arc<JwtKeys>,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, jwt: Arc<JwtKeys>) -> Self {
        Self { store, jwt }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ServiceError> {
        let email = normalize_email(email);
        let user = match self.store.find_user_by_email(&email).await? {
            Some(user) if verify_password(password, &user.password_hash) => user,
            _ => {
                tracing::warn!(email = %email, "Failed login");
                return Err(AuthError::InvalidCredentials.into());
            }
        };
        if !user.is_active {
            return Err(AuthError::InactiveUser.into());
        }

        let token = self.jwt.issue(user.id, &user.email, user.role)?;
        self.store
            .record_audit(&AuditEntry::new(AuditAction::Login, None, user.email.clone(), json!({})))
            .await?;
        tracing::info!(user = %user.email, role = %user.role, "Login");
        Ok(Session { user, token })
    }

    pub async fn create_user(&self, input: NewUser) -> Result<User, ServiceError> {
        let user = input.into_user()?;
        self.store.insert_user(&user).await?;
        tracing::info!(user = %user.email, role = %user.role, "User created");
        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        Ok(self.store.list_users().await?)
    }
}
