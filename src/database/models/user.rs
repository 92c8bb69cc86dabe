use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::auth::{hash_password, AuthError, Role};
use crate::database::store::StoreError;
use crate::inventory::{FieldErrors, InventoryError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            role: row.role.parse().map_err(StoreError::Decode)?,
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password: String,
}

const MIN_PASSWORD_LEN: usize = 8;

impl NewUser {
    pub fn validate(&self) -> Result<(), InventoryError> {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.insert("name", "This field is required");
        }
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => errors.insert("email", "Must be a valid email address"),
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.insert("password", format!("Must be at least {} characters", MIN_PASSWORD_LEN));
        }
        errors.into_result()
    }

    /// Validated, normalised user with a hashed password.
    pub fn into_user(self) -> Result<User, NewUserError> {
        self.validate()?;
        Ok(User {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            email: normalize_email(&self.email),
            role: self.role,
            password_hash: hash_password(&self.password)?,
            is_active: true,
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NewUserError {
    #[error(transparent)]
    Invalid(#[from] InventoryError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_is_normalised_and_hashed() {
        let user = NewUser {
            name: " Ana ".into(),
            email: " Ana@Example.COM ".into(),
            role: Role::Editor,
            password: "correct horse".into(),
        }
        .into_user()
        .unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.name, "Ana");
        assert!(crate::auth::verify_password("correct horse", &user.password_hash));

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn rejects_bad_email_and_short_password() {
        let err = NewUser { name: "x".into(), email: "nope".into(), role: Role::Reader, password: "short".into() }
            .validate()
            .unwrap_err();
        match err {
            InventoryError::Validation(fields) => {
                assert!(fields.contains("email"));
                assert!(fields.contains("password"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
