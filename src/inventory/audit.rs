use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Assign,
    Loan,
    Return,
    Maintenance,
    Retire,
    Login,
}

impl AuditAction {
    pub const ALL: [AuditAction; 9] = [
        AuditAction::Create,
        AuditAction::Update,
        AuditAction::Delete,
        AuditAction::Assign,
        AuditAction::Loan,
        AuditAction::Return,
        AuditAction::Maintenance,
        AuditAction::Retire,
        AuditAction::Login,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::Assign => "assign",
            AuditAction::Loan => "loan",
            AuditAction::Return => "return",
            AuditAction::Maintenance => "maintenance",
            AuditAction::Retire => "retire",
            AuditAction::Login => "login",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown audit action '{}'", s))
    }
}

/// Append-only activity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub action: AuditAction,
    pub product_id: Option<Uuid>,
    pub actor: String,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, product_id: Option<Uuid>, actor: impl Into<String>, details: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            product_id,
            actor: actor.into(),
            details,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditQuery {
    pub product_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    pub limit: Option<u32>,
}

impl AuditQuery {
    pub const DEFAULT_LIMIT: u32 = 100;
    pub const MAX_LIMIT: u32 = 500;

    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT)
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.product_id.map(|id| entry.product_id == Some(id)).unwrap_or(true)
            && self.action.map(|a| entry.action == a).unwrap_or(true)
    }
}
