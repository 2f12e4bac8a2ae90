use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    cache::IntentCache,
    domain::{
        MembershipIntent, PaymentGateway, PaymentMethod, ProgramIntent, RegistrationIntent,
        Segment,
    },
    error::{AppError, Result},
    payments::{GatewayCheckout, GatewayCheckoutRequest, PaymentGatewayClient},
    repository::{MemberRepository, RegistrationRepository},
    service::pricing_service::{normalize_email, PricingService},
};

pub const ORDER_PREFIX_PROGRAM: &str = "PRG";
pub const ORDER_PREFIX_MEMBERSHIP: &str = "MEM";

pub const CURRENCY: &str = "IDR";

/// `<PREFIX>-<base36 millis>-<8 hex>`, upper-cased. Collision-resistant
/// enough for an idempotency key: the timestamp orders it, the random
/// suffix disambiguates same-millisecond checkouts.
pub fn gen_order_id(prefix: &str) -> String {
    let ts = to_base36(Utc::now().timestamp_millis() as u64);
    let rnd: [u8; 4] = rand::random();
    format!("{}-{}-{}", prefix, ts, hex::encode(rnd)).to_uppercase()
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}

#[derive(Debug, Clone)]
pub struct ProgramCheckoutInput {
    pub program_id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub institution: Option<String>,
    pub segment: Option<Segment>,
    pub method: Option<PaymentMethod>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct MembershipCheckoutInput {
    pub membership_package_id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub institution: Option<String>,
    pub segment: Option<Segment>,
    pub student_id: Option<String>,
    pub degree: Option<String>,
    pub interest_areas: Vec<String>,
    pub join_date: Option<DateTime<Utc>>,
    pub method: Option<PaymentMethod>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResult {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    /// Gateway payload the frontend renders (QR, redirect URL, token).
    pub gateway: GatewayCheckout,
}

/// Opens a gateway transaction and parks the registration intent in the
/// cache. Nothing durable is written here: payment is not guaranteed
/// until the webhook confirms it, and the TTL bounds abandoned checkouts.
pub struct CheckoutService {
    pricing: Arc<PricingService>,
    registration_repo: Arc<dyn RegistrationRepository>,
    member_repo: Arc<dyn MemberRepository>,
    cache: Arc<dyn IntentCache>,
    midtrans: Option<Arc<dyn PaymentGatewayClient>>,
    ipaymu: Option<Arc<dyn PaymentGatewayClient>>,
    intent_ttl: Duration,
}

impl CheckoutService {
    pub fn new(
        pricing: Arc<PricingService>,
        registration_repo: Arc<dyn RegistrationRepository>,
        member_repo: Arc<dyn MemberRepository>,
        cache: Arc<dyn IntentCache>,
        midtrans: Option<Arc<dyn PaymentGatewayClient>>,
        ipaymu: Option<Arc<dyn PaymentGatewayClient>>,
        intent_ttl: Duration,
    ) -> Self {
        Self {
            pricing,
            registration_repo,
            member_repo,
            cache,
            midtrans,
            ipaymu,
            intent_ttl,
        }
    }

    fn client_for(&self, gateway: PaymentGateway) -> Result<&Arc<dyn PaymentGatewayClient>> {
        let client = match gateway {
            PaymentGateway::Midtrans => self.midtrans.as_ref(),
            PaymentGateway::Ipaymu => self.ipaymu.as_ref(),
        };
        client.ok_or_else(|| {
            AppError::BadRequest(format!("Payment gateway {:?} is not enabled", gateway))
        })
    }

    pub async fn checkout_program(
        &self,
        gateway: PaymentGateway,
        input: ProgramCheckoutInput,
    ) -> Result<CheckoutResult> {
        let email = normalize_email(&input.email);

        let quote = self
            .pricing
            .resolve_program_price(input.program_id, &email)
            .await?;

        // Fast-path UX hint; the (email, program_id) unique constraint
        // remains the authority at settlement time.
        if self
            .registration_repo
            .find_by_email_and_program(&email, input.program_id)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateRegistration(format!(
                "Email already registered in {}",
                quote.program_name
            )));
        }

        let order_id = gen_order_id(ORDER_PREFIX_PROGRAM);
        let method = input.method.unwrap_or(PaymentMethod::Qris);

        let gateway_res = self
            .client_for(gateway)?
            .create_checkout(&GatewayCheckoutRequest {
                order_id: order_id.clone(),
                amount: quote.amount,
                item_id: input.program_id.to_string(),
                item_name: quote.program_name.clone(),
                description: "Program Registration".to_string(),
                buyer_name: input.name.clone(),
                buyer_email: email.clone(),
                buyer_phone: input.phone.clone(),
                method,
            })
            .await?;

        let intent = RegistrationIntent::Program(ProgramIntent {
            program_id: input.program_id,
            email,
            name: input.name,
            phone: input.phone,
            institution: input.institution,
            segment: input.segment,
            user_id: input.user_id,
            member_id: quote.member_id,
            source: quote.source,
            amount: quote.amount,
            currency: CURRENCY.to_string(),
            method,
        });
        self.cache.put(&order_id, &intent, self.intent_ttl).await?;

        tracing::info!(
            order_id = %order_id,
            amount = quote.amount,
            gateway = ?gateway,
            "Program checkout opened"
        );

        Ok(CheckoutResult {
            order_id,
            amount: quote.amount,
            currency: CURRENCY.to_string(),
            gateway: gateway_res,
        })
    }

    pub async fn checkout_membership(
        &self,
        gateway: PaymentGateway,
        input: MembershipCheckoutInput,
    ) -> Result<CheckoutResult> {
        let email = normalize_email(&input.email);

        if let Some(existing) = self.member_repo.find_by_email(&email).await? {
            return Err(AppError::DuplicateRegistration(format!(
                "Email already registered to member {}",
                existing.name
            )));
        }

        let quote = self
            .pricing
            .resolve_package_price(input.membership_package_id)
            .await?;

        let order_id = gen_order_id(ORDER_PREFIX_MEMBERSHIP);
        let method = input.method.unwrap_or(PaymentMethod::Qris);

        let gateway_res = self
            .client_for(gateway)?
            .create_checkout(&GatewayCheckoutRequest {
                order_id: order_id.clone(),
                amount: quote.amount,
                item_id: input.membership_package_id.to_string(),
                item_name: quote.name.clone(),
                description: "Member Registration".to_string(),
                buyer_name: input.name.clone(),
                buyer_email: email.clone(),
                buyer_phone: input.phone.clone(),
                method,
            })
            .await?;

        let intent = RegistrationIntent::Membership(MembershipIntent {
            membership_package_id: input.membership_package_id,
            email,
            name: input.name,
            phone: input.phone,
            institution: input.institution,
            segment: input.segment,
            student_id: input.student_id,
            degree: input.degree,
            interest_areas: input.interest_areas,
            join_date: input.join_date,
            user_id: input.user_id,
            amount: quote.amount,
            currency: CURRENCY.to_string(),
            method,
        });
        self.cache.put(&order_id, &intent, self.intent_ttl).await?;

        tracing::info!(
            order_id = %order_id,
            amount = quote.amount,
            gateway = ?gateway,
            "Membership checkout opened"
        );

        Ok(CheckoutResult {
            order_id,
            amount: quote.amount,
            currency: CURRENCY.to_string(),
            gateway: gateway_res,
        })
    }
}
