use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique by email. Created lazily at the first successful
/// membership-package settlement, alongside a linked User.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub institution: Option<String>,
    pub segment: Segment,
    pub student_id: Option<String>,
    pub degree: Option<String>,
    pub interest_areas: Vec<String>,
    pub join_date: DateTime<Utc>,
    pub status: MemberStatus,
    pub membership_package_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Active,
    Inactive,
    Suspended,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Basic,
    Student,
    Professional,
    Corporate,
}

impl Default for Segment {
    fn default() -> Self {
        Segment::Basic
    }
}

/// Where a registration came from, resolved at checkout time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationSource {
    Member,
    NonMember,
    Admin,
}
