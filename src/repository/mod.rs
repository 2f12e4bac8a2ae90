use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::*;
use crate::error::Result;

pub mod member_repository;
pub mod membership_package_repository;
pub mod program_repository;
pub mod registration_repository;
pub mod settlement_store;

pub use member_repository::SqliteMemberRepository;
pub use membership_package_repository::SqliteMembershipPackageRepository;
pub use program_repository::SqliteProgramRepository;
pub use registration_repository::SqliteRegistrationRepository;
pub use settlement_store::SqliteSettlementStore;

#[async_trait]
pub trait ProgramRepository: Send + Sync {
    async fn create(&self, program: Program) -> Result<Program>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Program>>;
    async fn list_active(&self) -> Result<Vec<Program>>;
}

#[async_trait]
pub trait MembershipPackageRepository: Send + Sync {
    async fn create(&self, package: MembershipPackage) -> Result<MembershipPackage>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<MembershipPackage>>;
    async fn list(&self) -> Result<Vec<MembershipPackage>>;
}

#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// Lookup by normalized (trimmed, lower-cased) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<Member>>;
}

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    async fn find_by_email_and_program(
        &self,
        email: &str,
        program_id: Uuid,
    ) -> Result<Option<ProgramRegistration>>;
}

/// Durable side of reconciliation. Everything that must be atomic
/// (registration-or-reuse + payment, member-or-reuse + user-or-promote +
/// payment) happens inside a single transaction behind this port; the
/// unique constraint on payments.order_id is the authority when two
/// webhook deliveries race.
#[async_trait]
pub trait SettlementStore: Send + Sync {
    async fn find_payment(&self, order_id: &str) -> Result<Option<Payment>>;

    /// Mutate an existing payment row in place on a status transition.
    async fn record_status_change(&self, order_id: &str, change: StatusChange) -> Result<Payment>;

    /// Insert a payment row with no registration/member linkage (pending
    /// record or audit stub). If a concurrent delivery already inserted
    /// the row, the existing row is returned instead.
    async fn insert_payment(&self, new: NewPayment) -> Result<Payment>;

    /// Atomically upsert the program registration and the linked payment.
    async fn settle_program(
        &self,
        order_id: &str,
        intent: &ProgramIntent,
        meta: &NotificationMeta,
    ) -> Result<ProgramSettlement>;

    /// Atomically find-or-create the user and member, then upsert the
    /// linked payment.
    async fn settle_membership(
        &self,
        order_id: &str,
        intent: &MembershipIntent,
        meta: &NotificationMeta,
    ) -> Result<MembershipSettlement>;
}

/// Facts extracted from a verified gateway notification, as the
/// settlement store needs them.
#[derive(Debug, Clone)]
pub struct NotificationMeta {
    pub gateway: PaymentGateway,
    pub raw_payload: serde_json::Value,
    pub gateway_transaction_id: Option<String>,
    pub reported_method: Option<PaymentMethod>,
    pub reported_amount: i64,
}

#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: PaymentStatus,
    pub raw_payload: serde_json::Value,
    pub gateway_transaction_id: Option<String>,
    pub method: Option<PaymentMethod>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: String,
    pub email: String,
    pub amount: i64,
    pub currency: String,
    pub method: Option<PaymentMethod>,
    pub gateway: Option<PaymentGateway>,
    pub status: PaymentStatus,
    pub raw_payload: Option<serde_json::Value>,
    pub gateway_transaction_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgramSettlement {
    pub registration: ProgramRegistration,
    pub payment: Payment,
}

#[derive(Debug, Clone, Serialize)]
pub struct MembershipSettlement {
    pub member: Member,
    pub user: User,
    pub payment: Payment,
}
