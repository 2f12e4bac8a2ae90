use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{ProgramRegistration, RegistrationSource},
    error::{AppError, Result},
    repository::{member_repository::parse_optional_uuid, RegistrationRepository},
};

#[derive(FromRow)]
pub(crate) struct RegistrationRow {
    pub(crate) id: String,
    pub(crate) program_id: String,
    pub(crate) email: String,
    pub(crate) name: String,
    pub(crate) phone: Option<String>,
    pub(crate) institution: Option<String>,
    pub(crate) segment: Option<String>,
    pub(crate) source: String,
    pub(crate) member_id: Option<String>,
    pub(crate) user_id: Option<String>,
    pub(crate) created_at: NaiveDateTime,
    pub(crate) updated_at: NaiveDateTime,
}

pub(crate) const REGISTRATION_COLUMNS: &str =
    "id, program_id, email, name, phone, institution, segment, source, member_id, user_id, \
     created_at, updated_at";

pub(crate) fn row_to_registration(row: RegistrationRow) -> Result<ProgramRegistration> {
    Ok(ProgramRegistration {
        id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
        program_id: Uuid::parse_str(&row.program_id)
            .map_err(|e| AppError::Database(e.to_string()))?,
        email: row.email,
        name: row.name,
        phone: row.phone,
        institution: row.institution,
        segment: row
            .segment
            .as_deref()
            .map(super::member_repository::parse_segment)
            .transpose()?,
        source: parse_source(&row.source)?,
        member_id: parse_optional_uuid(row.member_id)?,
        user_id: parse_optional_uuid(row.user_id)?,
        created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
    })
}

pub(crate) fn parse_source(s: &str) -> Result<RegistrationSource> {
    match s {
        "Member" => Ok(RegistrationSource::Member),
        "NonMember" => Ok(RegistrationSource::NonMember),
        "Admin" => Ok(RegistrationSource::Admin),
        _ => Err(AppError::Database(format!(
            "Invalid registration source: {}",
            s
        ))),
    }
}

pub(crate) fn source_to_str(source: &RegistrationSource) -> &'static str {
    match source {
        RegistrationSource::Member => "Member",
        RegistrationSource::NonMember => "NonMember",
        RegistrationSource::Admin => "Admin",
    }
}

pub struct SqliteRegistrationRepository {
    pool: SqlitePool,
}

impl SqliteRegistrationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistrationRepository for SqliteRegistrationRepository {
    async fn find_by_email_and_program(
        &self,
        email: &str,
        program_id: Uuid,
    ) -> Result<Option<ProgramRegistration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {} FROM program_registrations WHERE email = ? AND program_id = ?",
            REGISTRATION_COLUMNS
        ))
        .bind(email)
        .bind(program_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(row_to_registration(r)?)),
            None => Ok(None),
        }
    }
}
