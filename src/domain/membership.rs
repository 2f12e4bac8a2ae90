use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchasable membership tier. Always sold at its flat price; member
/// discounts do not apply to the thing that grants membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipPackage {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub duration_months: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
