//! Company reference data. Lifecycle is owned by the identity service; the
//! pipeline only resolves companies to validate ownership of an upload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub company_id: Uuid,
    pub name: String,
    pub created_utc: DateTime<Utc>,
}
