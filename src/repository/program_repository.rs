use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::Program,
    error::{AppError, Result},
    repository::ProgramRepository,
};

// Database row struct that matches the SQLite schema
#[derive(FromRow)]
struct ProgramRow {
    id: String,
    name: String,
    description: Option<String>,
    price_member: i64,
    price_non_member: i64,
    starts_at: Option<NaiveDateTime>,
    is_active: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteProgramRepository {
    pool: SqlitePool,
}

impl SqliteProgramRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_program(row: ProgramRow) -> Result<Program> {
        Ok(Program {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            name: row.name,
            description: row.description,
            price_member: row.price_member,
            price_non_member: row.price_non_member,
            starts_at: row
                .starts_at
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            is_active: row.is_active != 0,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

const PROGRAM_COLUMNS: &str = "id, name, description, price_member, price_non_member, \
                               starts_at, is_active, created_at, updated_at";

#[async_trait]
impl ProgramRepository for SqliteProgramRepository {
    async fn create(&self, program: Program) -> Result<Program> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO programs (
                id, name, description, price_member, price_non_member,
                starts_at, is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(program.id.to_string())
        .bind(&program.name)
        .bind(&program.description)
        .bind(program.price_member)
        .bind(program.price_non_member)
        .bind(program.starts_at.map(|dt| dt.naive_utc()))
        .bind(program.is_active as i32)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(program.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created program".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Program>> {
        let row = sqlx::query_as::<_, ProgramRow>(&format!(
            "SELECT {} FROM programs WHERE id = ?",
            PROGRAM_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_program(r)?)),
            None => Ok(None),
        }
    }

    async fn list_active(&self) -> Result<Vec<Program>> {
        let rows = sqlx::query_as::<_, ProgramRow>(&format!(
            "SELECT {} FROM programs WHERE is_active = 1 ORDER BY created_at DESC",
            PROGRAM_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_program).collect()
    }
}
