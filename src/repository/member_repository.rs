use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Member, MemberStatus, Segment},
    error::{AppError, Result},
    repository::MemberRepository,
};

// Row/enum mapping is shared with the settlement store, which writes
// members inside its transactions.
#[derive(FromRow)]
pub(crate) struct MemberRow {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) name: String,
    pub(crate) phone: Option<String>,
    pub(crate) institution: Option<String>,
    pub(crate) segment: String,
    pub(crate) student_id: Option<String>,
    pub(crate) degree: Option<String>,
    pub(crate) interest_areas: String,
    pub(crate) join_date: NaiveDateTime,
    pub(crate) status: String,
    pub(crate) membership_package_id: Option<String>,
    pub(crate) user_id: Option<String>,
    pub(crate) created_at: NaiveDateTime,
    pub(crate) updated_at: NaiveDateTime,
}

pub(crate) const MEMBER_COLUMNS: &str =
    "id, email, name, phone, institution, segment, student_id, degree, interest_areas, \
     join_date, status, membership_package_id, user_id, created_at, updated_at";

pub(crate) fn row_to_member(row: MemberRow) -> Result<Member> {
    Ok(Member {
        id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
        email: row.email,
        name: row.name,
        phone: row.phone,
        institution: row.institution,
        segment: parse_segment(&row.segment)?,
        student_id: row.student_id,
        degree: row.degree,
        interest_areas: serde_json::from_str(&row.interest_areas)
            .map_err(|e| AppError::Database(format!("Invalid interest areas: {}", e)))?,
        join_date: DateTime::from_naive_utc_and_offset(row.join_date, Utc),
        status: parse_member_status(&row.status)?,
        membership_package_id: parse_optional_uuid(row.membership_package_id)?,
        user_id: parse_optional_uuid(row.user_id)?,
        created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
    })
}

pub(crate) fn parse_optional_uuid(value: Option<String>) -> Result<Option<Uuid>> {
    value
        .map(|s| Uuid::parse_str(&s).map_err(|e| AppError::Database(e.to_string())))
        .transpose()
}

pub(crate) fn parse_segment(s: &str) -> Result<Segment> {
    match s {
        "Basic" => Ok(Segment::Basic),
        "Student" => Ok(Segment::Student),
        "Professional" => Ok(Segment::Professional),
        "Corporate" => Ok(Segment::Corporate),
        _ => Err(AppError::Database(format!("Invalid segment: {}", s))),
    }
}

pub(crate) fn segment_to_str(segment: &Segment) -> &'static str {
    match segment {
        Segment::Basic => "Basic",
        Segment::Student => "Student",
        Segment::Professional => "Professional",
        Segment::Corporate => "Corporate",
    }
}

pub(crate) fn parse_member_status(s: &str) -> Result<MemberStatus> {
    match s {
        "Active" => Ok(MemberStatus::Active),
        "Inactive" => Ok(MemberStatus::Inactive),
        "Suspended" => Ok(MemberStatus::Suspended),
        _ => Err(AppError::Database(format!("Invalid member status: {}", s))),
    }
}

pub(crate) fn member_status_to_str(status: &MemberStatus) -> &'static str {
    match status {
        MemberStatus::Active => "Active",
        MemberStatus::Inactive => "Inactive",
        MemberStatus::Suspended => "Suspended",
    }
}

pub struct SqliteMemberRepository {
    pool: SqlitePool,
}

impl SqliteMemberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberRepository for SqliteMemberRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Member>> {
        let row = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {} FROM members WHERE email = ?",
            MEMBER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(row_to_member(r)?)),
            None => Ok(None),
        }
    }
}
