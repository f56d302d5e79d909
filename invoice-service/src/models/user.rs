//! User reference data, resolved from the `X-User-ID` header by the handlers
//! and passed explicitly into the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Customer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Customer => "customer",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "admin" => UserRole::Admin,
            _ => UserRole::Customer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub name: String,
    pub role: String,
    pub created_utc: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        UserRole::from_string(&self.role) == UserRole::Admin
    }
}
