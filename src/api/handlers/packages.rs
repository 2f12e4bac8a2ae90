use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::MembershipPackage,
    error::{AppError, Result},
};

#[derive(Debug, Serialize)]
pub struct PackageDto {
    id: Uuid,
    name: String,
    description: Option<String>,
    price: i64,
    duration_months: Option<i32>,
}

impl From<MembershipPackage> for PackageDto {
    fn from(package: MembershipPackage) -> Self {
        Self {
            id: package.id,
            name: package.name,
            description: package.description,
            price: package.price,
            duration_months: package.duration_months,
        }
    }
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<PackageDto>>> {
    let packages = state.services.package_repo.list().await?;
    Ok(Json(packages.into_iter().map(Into::into).collect()))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PackageDto>> {
    let package = state
        .services
        .package_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Membership package not found".to_string()))?;

    Ok(Json(package.into()))
}
