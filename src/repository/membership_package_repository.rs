use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::MembershipPackage,
    error::{AppError, Result},
    repository::MembershipPackageRepository,
};

#[derive(FromRow)]
struct PackageRow {
    id: String,
    name: String,
    description: Option<String>,
    price: i64,
    duration_months: Option<i32>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteMembershipPackageRepository {
    pool: SqlitePool,
}

impl SqliteMembershipPackageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_package(row: PackageRow) -> Result<MembershipPackage> {
        Ok(MembershipPackage {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            name: row.name,
            description: row.description,
            price: row.price,
            duration_months: row.duration_months,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

#[async_trait]
impl MembershipPackageRepository for SqliteMembershipPackageRepository {
    async fn create(&self, package: MembershipPackage) -> Result<MembershipPackage> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO membership_packages (
                id, name, description, price, duration_months, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(package.id.to_string())
        .bind(&package.name)
        .bind(&package.description)
        .bind(package.price)
        .bind(package.duration_months)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(package.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created membership package".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MembershipPackage>> {
        let row = sqlx::query_as::<_, PackageRow>(
            r#"
            SELECT id, name, description, price, duration_months, created_at, updated_at
            FROM membership_packages
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_package(r)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<MembershipPackage>> {
        let rows = sqlx::query_as::<_, PackageRow>(
            r#"
            SELECT id, name, description, price, duration_months, created_at, updated_at
            FROM membership_packages
            ORDER BY price ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_package).collect()
    }
}
