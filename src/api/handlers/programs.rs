use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::Program,
    error::{AppError, Result},
};

#[derive(Debug, Serialize)]
pub struct ProgramDto {
    id: Uuid,
    name: String,
    description: Option<String>,
    price_member: i64,
    price_non_member: i64,
    starts_at: Option<String>,
}

impl From<Program> for ProgramDto {
    fn from(program: Program) -> Self {
        Self {
            id: program.id,
            name: program.name,
            description: program.description,
            price_member: program.price_member,
            price_non_member: program.price_non_member,
            starts_at: program.starts_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ProgramDto>>> {
    let programs = state.services.program_repo.list_active().await?;
    Ok(Json(programs.into_iter().map(Into::into).collect()))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProgramDto>> {
    let program = state
        .services
        .program_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Program not found".to_string()))?;

    Ok(Json(program.into()))
}
