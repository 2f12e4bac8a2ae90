use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{RegistrationSource, Segment};

/// A workshop or bootcamp offering with member/non-member pricing in IDR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_member: i64,
    pub price_non_member: i64,
    pub starts_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unique on (email, program_id); the constraint, not this struct,
/// is what prevents duplicate enrollment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramRegistration {
    pub id: Uuid,
    pub program_id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub institution: Option<String>,
    pub segment: Option<Segment>,
    pub source: RegistrationSource,
    pub member_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
