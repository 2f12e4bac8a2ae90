pub mod checkout_service;
pub mod pricing_service;
pub mod webhook_service;

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use crate::cache::IntentCache;
use crate::config::Settings;
use crate::payments::{IpaymuClient, MidtransClient, PaymentGatewayClient};
use crate::repository::*;

use checkout_service::CheckoutService;
use pricing_service::PricingService;
use webhook_service::{GatewayCredentials, WebhookService};

pub struct ServiceContext {
    pub pricing_service: Arc<PricingService>,
    pub checkout_service: Arc<CheckoutService>,
    pub webhook_service: Arc<WebhookService>,
    pub program_repo: Arc<dyn ProgramRepository>,
    pub package_repo: Arc<dyn MembershipPackageRepository>,
    pub settlement_store: Arc<dyn SettlementStore>,
    /// Concrete client kept around for the live status probe endpoint.
    pub midtrans_client: Option<Arc<MidtransClient>>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(
        db_pool: SqlitePool,
        cache: Arc<dyn IntentCache>,
        midtrans_client: Option<Arc<MidtransClient>>,
        ipaymu_client: Option<Arc<IpaymuClient>>,
        settings: &Settings,
    ) -> Self {
        let program_repo: Arc<dyn ProgramRepository> =
            Arc::new(SqliteProgramRepository::new(db_pool.clone()));
        let package_repo: Arc<dyn MembershipPackageRepository> =
            Arc::new(SqliteMembershipPackageRepository::new(db_pool.clone()));
        let member_repo: Arc<dyn MemberRepository> =
            Arc::new(SqliteMemberRepository::new(db_pool.clone()));
        let registration_repo: Arc<dyn RegistrationRepository> =
            Arc::new(SqliteRegistrationRepository::new(db_pool.clone()));
        let settlement_store: Arc<dyn SettlementStore> = Arc::new(SqliteSettlementStore::new(
            db_pool.clone(),
            settings.membership.default_password.clone(),
        ));

        let pricing_service = Arc::new(PricingService::new(
            program_repo.clone(),
            package_repo.clone(),
            member_repo.clone(),
        ));

        let midtrans_gateway: Option<Arc<dyn PaymentGatewayClient>> = midtrans_client
            .clone()
            .map(|c| c as Arc<dyn PaymentGatewayClient>);
        let ipaymu_gateway: Option<Arc<dyn PaymentGatewayClient>> =
            ipaymu_client.map(|c| c as Arc<dyn PaymentGatewayClient>);

        let checkout_service = Arc::new(CheckoutService::new(
            pricing_service.clone(),
            registration_repo,
            member_repo,
            cache.clone(),
            midtrans_gateway,
            ipaymu_gateway,
            Duration::from_secs(settings.cache.intent_ttl_seconds),
        ));

        let credentials = GatewayCredentials {
            midtrans_server_key: settings.midtrans.server_key.clone(),
            ipaymu_va: settings.ipaymu.va.clone(),
            ipaymu_api_key: settings.ipaymu.api_key.clone(),
        };
        let webhook_service = Arc::new(WebhookService::new(
            settlement_store.clone(),
            cache,
            credentials,
        ));

        Self {
            pricing_service,
            checkout_service,
            webhook_service,
            program_repo,
            package_repo,
            settlement_store,
            midtrans_client,
            db_pool,
        }
    }
}
