use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::state::AppState,
    domain::{PaymentGateway, PaymentMethod, Segment},
    error::{AppError, Result},
    service::checkout_service::{CheckoutResult, MembershipCheckoutInput, ProgramCheckoutInput},
};

fn default_gateway() -> PaymentGateway {
    PaymentGateway::Midtrans
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProgramCheckoutDto {
    pub program_id: Uuid,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub name: String,
    pub phone: Option<String>,
    pub institution: Option<String>,
    pub segment: Option<Segment>,
    pub method: Option<PaymentMethod>,
    #[serde(default = "default_gateway")]
    pub gateway: PaymentGateway,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MembershipCheckoutDto {
    pub membership_package_id: Uuid,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub name: String,
    pub phone: Option<String>,
    pub institution: Option<String>,
    pub segment: Option<Segment>,
    pub student_id: Option<String>,
    pub degree: Option<String>,
    #[serde(default)]
    pub interest_areas: Vec<String>,
    pub join_date: Option<DateTime<Utc>>,
    pub method: Option<PaymentMethod>,
    #[serde(default = "default_gateway")]
    pub gateway: PaymentGateway,
}

pub async fn program(
    State(state): State<AppState>,
    Json(dto): Json<ProgramCheckoutDto>,
) -> Result<Json<CheckoutResult>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let result = state
        .services
        .checkout_service
        .checkout_program(
            dto.gateway,
            ProgramCheckoutInput {
                program_id: dto.program_id,
                email: dto.email,
                name: dto.name,
                phone: dto.phone,
                institution: dto.institution,
                segment: dto.segment,
                method: dto.method,
                user_id: None,
            },
        )
        .await?;

    Ok(Json(result))
}

pub async fn membership(
    State(state): State<AppState>,
    Json(dto): Json<MembershipCheckoutDto>,
) -> Result<Json<CheckoutResult>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let result = state
        .services
        .checkout_service
        .checkout_membership(
            dto.gateway,
            MembershipCheckoutInput {
                membership_package_id: dto.membership_package_id,
                email: dto.email,
                name: dto.name,
                phone: dto.phone,
                institution: dto.institution,
                segment: dto.segment,
                student_id: dto.student_id,
                degree: dto.degree,
                interest_areas: dto.interest_areas,
                join_date: dto.join_date,
                method: dto.method,
                user_id: None,
            },
        )
        .await?;

    Ok(Json(result))
}
