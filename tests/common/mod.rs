#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use sanggar::{
    cache::MemoryIntentCache,
    domain::{MembershipPackage, PaymentGateway, Program},
    error::Result,
    payments::{signature, GatewayCheckout, GatewayCheckoutRequest, PaymentGatewayClient},
    repository::{
        MemberRepository, MembershipPackageRepository, ProgramRepository,
        RegistrationRepository, SettlementStore, SqliteMemberRepository,
        SqliteMembershipPackageRepository, SqliteProgramRepository, SqliteRegistrationRepository,
        SqliteSettlementStore,
    },
    service::{
        checkout_service::CheckoutService,
        pricing_service::PricingService,
        webhook_service::{GatewayCredentials, WebhookService},
    },
};

pub const MIDTRANS_SERVER_KEY: &str = "SB-Mid-server-testing";
pub const IPAYMU_VA: &str = "0000001234567890";
pub const IPAYMU_API_KEY: &str = "SANDBOX-APIKEY-123";
pub const DEFAULT_PASSWORD: &str = "Password123!";

/// Gateway stand-in: records every checkout request and hands back a
/// renderable payload without touching the network.
pub struct FakeGateway {
    gateway: PaymentGateway,
    pub requests: Mutex<Vec<GatewayCheckoutRequest>>,
}

impl FakeGateway {
    pub fn new(gateway: PaymentGateway) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl PaymentGatewayClient for FakeGateway {
    fn gateway(&self) -> PaymentGateway {
        self.gateway
    }

    async fn create_checkout(&self, req: &GatewayCheckoutRequest) -> Result<GatewayCheckout> {
        self.requests.lock().unwrap().push(req.clone());
        Ok(GatewayCheckout {
            gateway: self.gateway,
            payload: json!({
                "token": "fake-token",
                "redirect_url": format!("https://pay.example/{}", req.order_id),
            }),
        })
    }
}

pub struct TestHarness {
    pub pool: SqlitePool,
    pub cache: Arc<MemoryIntentCache>,
    pub midtrans_gateway: Arc<FakeGateway>,
    pub ipaymu_gateway: Arc<FakeGateway>,
    pub checkout: CheckoutService,
    pub webhook: WebhookService,
    pub program_repo: SqliteProgramRepository,
    pub package_repo: SqliteMembershipPackageRepository,
    pub member_repo: SqliteMemberRepository,
    pub store: Arc<SqliteSettlementStore>,
}

pub async fn harness() -> anyhow::Result<TestHarness> {
    let pool = SqlitePool::connect(":memory:").await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let cache = Arc::new(MemoryIntentCache::new());
    let midtrans_gateway = FakeGateway::new(PaymentGateway::Midtrans);
    let ipaymu_gateway = FakeGateway::new(PaymentGateway::Ipaymu);

    let program_repo: Arc<dyn ProgramRepository> =
        Arc::new(SqliteProgramRepository::new(pool.clone()));
    let package_repo: Arc<dyn MembershipPackageRepository> =
        Arc::new(SqliteMembershipPackageRepository::new(pool.clone()));
    let member_repo: Arc<dyn MemberRepository> =
        Arc::new(SqliteMemberRepository::new(pool.clone()));
    let registration_repo: Arc<dyn RegistrationRepository> =
        Arc::new(SqliteRegistrationRepository::new(pool.clone()));

    let pricing = Arc::new(PricingService::new(
        program_repo,
        package_repo,
        member_repo,
    ));

    let checkout = CheckoutService::new(
        pricing,
        registration_repo,
        Arc::new(SqliteMemberRepository::new(pool.clone())),
        cache.clone(),
        Some(midtrans_gateway.clone() as Arc<dyn PaymentGatewayClient>),
        Some(ipaymu_gateway.clone() as Arc<dyn PaymentGatewayClient>),
        Duration::from_secs(7200),
    );

    let store = Arc::new(SqliteSettlementStore::new(
        pool.clone(),
        DEFAULT_PASSWORD.to_string(),
    ));
    let webhook = WebhookService::new(
        store.clone() as Arc<dyn SettlementStore>,
        cache.clone(),
        GatewayCredentials {
            midtrans_server_key: Some(MIDTRANS_SERVER_KEY.to_string()),
            ipaymu_va: Some(IPAYMU_VA.to_string()),
            ipaymu_api_key: Some(IPAYMU_API_KEY.to_string()),
        },
    );

    Ok(TestHarness {
        pool: pool.clone(),
        cache,
        midtrans_gateway,
        ipaymu_gateway,
        checkout,
        webhook,
        program_repo: SqliteProgramRepository::new(pool.clone()),
        package_repo: SqliteMembershipPackageRepository::new(pool.clone()),
        member_repo: SqliteMemberRepository::new(pool.clone()),
        store,
    })
}

pub async fn create_program(
    repo: &SqliteProgramRepository,
    name: &str,
    price_member: i64,
    price_non_member: i64,
) -> anyhow::Result<Program> {
    let now = Utc::now();
    Ok(repo
        .create(Program {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            price_member,
            price_non_member,
            starts_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await?)
}

pub async fn create_package(
    repo: &SqliteMembershipPackageRepository,
    name: &str,
    price: i64,
) -> anyhow::Result<MembershipPackage> {
    let now = Utc::now();
    Ok(repo
        .create(MembershipPackage {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            price,
            duration_months: Some(12),
            created_at: now,
            updated_at: now,
        })
        .await?)
}

/// Insert a member row directly; settlement is the only production
/// writer, so tests that need a pre-existing member go under the hood.
pub async fn insert_member(pool: &SqlitePool, email: &str, name: &str) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now().naive_utc();
    sqlx::query(
        r#"
        INSERT INTO members (id, email, name, segment, interest_areas, join_date,
                             status, created_at, updated_at)
        VALUES (?, ?, ?, 'Basic', '[]', ?, 'Active', ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(email)
    .bind(name)
    .bind(now)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn insert_user(
    pool: &SqlitePool,
    email: &str,
    name: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now().naive_utc();
    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, password_hash, role, is_email_verified,
                           created_at, updated_at)
        VALUES (?, ?, ?, 'x', ?, 0, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(email)
    .bind(name)
    .bind(role)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> anyhow::Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// A correctly signed Midtrans notification payload.
pub fn midtrans_notification(
    order_id: &str,
    transaction_status: &str,
    gross_amount: &str,
) -> serde_json::Value {
    let signature_key = signature::midtrans_notification_signature(
        MIDTRANS_SERVER_KEY,
        order_id,
        "200",
        gross_amount,
    );
    json!({
        "order_id": order_id,
        "transaction_status": transaction_status,
        "gross_amount": gross_amount,
        "status_code": "200",
        "signature_key": signature_key,
        "transaction_id": format!("trx-{}", order_id),
        "payment_type": "qris",
        "transaction_time": Utc::now().to_rfc3339(),
    })
}

/// A correctly signed iPaymu webhook: raw body bytes plus the signature
/// header value.
pub fn ipaymu_notification(order_id: &str, status: &str, amount: i64) -> (Vec<u8>, String) {
    let body = serde_json::to_vec(&json!({
        "reference_id": order_id,
        "status": status,
        "trx_id": 88231,
        "amount": amount,
        "via": "qris",
    }))
    .unwrap();
    let sig = signature::ipaymu_signature("POST", IPAYMU_VA, IPAYMU_API_KEY, &body);
    (body, sig)
}
