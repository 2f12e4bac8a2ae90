use std::sync::Arc;

use serde::Serialize;

use crate::{
    cache::IntentCache,
    domain::{Payment, PaymentGateway, PaymentMethod, PaymentStatus, RegistrationIntent},
    error::{AppError, Result},
    payments::{
        ipaymu::{self, IpaymuNotification},
        midtrans::{self, MidtransNotification},
        signature,
    },
    repository::{
        MembershipSettlement, NewPayment, NotificationMeta, ProgramSettlement, SettlementStore,
        StatusChange,
    },
};

/// Keys needed to authenticate inbound notifications. Both gateways are
/// verified; a webhook that fails its check never touches state.
#[derive(Debug, Clone, Default)]
pub struct GatewayCredentials {
    pub midtrans_server_key: Option<String>,
    pub ipaymu_va: Option<String>,
    pub ipaymu_api_key: Option<String>,
}

/// What a notification did to durable state. Serialized into the webhook
/// HTTP response so gateway dashboards show something meaningful.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", content = "result", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    /// Same order id, same status: idempotent replay, nothing changed.
    Replayed(Payment),
    /// Status transition recorded on the existing payment row.
    Updated(Payment),
    /// First receipt, not yet settled; payment row without links.
    Recorded(Payment),
    /// No cached intent and no payment row: audit-only stub.
    Orphaned(Payment),
    /// First completion of a program registration.
    Program(ProgramSettlement),
    /// First completion of a membership purchase.
    Membership(MembershipSettlement),
}

/// Turns asynchronous gateway notifications into durable state, exactly
/// once per order id. The cache holds intent that is not yet durable;
/// the payments.order_id unique constraint is what makes replays and
/// races converge.
pub struct WebhookService {
    store: Arc<dyn SettlementStore>,
    cache: Arc<dyn IntentCache>,
    credentials: GatewayCredentials,
}

impl WebhookService {
    pub fn new(
        store: Arc<dyn SettlementStore>,
        cache: Arc<dyn IntentCache>,
        credentials: GatewayCredentials,
    ) -> Self {
        Self {
            store,
            cache,
            credentials,
        }
    }

    pub async fn handle_midtrans(
        &self,
        payload: serde_json::Value,
    ) -> Result<ReconciliationOutcome> {
        let server_key = self
            .credentials
            .midtrans_server_key
            .as_deref()
            .ok_or_else(|| {
                AppError::BadRequest("Midtrans gateway is not configured".to_string())
            })?;

        let notif: MidtransNotification = serde_json::from_value(payload.clone())
            .map_err(|e| AppError::BadRequest(format!("Malformed notification: {}", e)))?;

        if !signature::verify_midtrans_signature(
            server_key,
            &notif.order_id,
            &notif.status_code,
            &notif.gross_amount,
            &notif.signature_key,
        ) {
            return Err(AppError::InvalidSignature(
                "Midtrans signature mismatch".to_string(),
            ));
        }

        let status = midtrans::map_transaction_status(&notif.transaction_status);
        let meta = NotificationMeta {
            gateway: PaymentGateway::Midtrans,
            raw_payload: payload,
            gateway_transaction_id: notif.transaction_id.clone(),
            reported_method: notif
                .payment_type
                .as_deref()
                .and_then(PaymentMethod::from_gateway_token),
            reported_amount: notif.gross_amount_rupiah(),
        };

        self.reconcile(&notif.order_id, status, meta).await
    }

    /// iPaymu posts JSON with a `signature` header computed the same way
    /// as request signing; verification runs over the raw body bytes
    /// before anything is parsed.
    pub async fn handle_ipaymu(
        &self,
        raw_body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<ReconciliationOutcome> {
        let (va, api_key) = match (
            self.credentials.ipaymu_va.as_deref(),
            self.credentials.ipaymu_api_key.as_deref(),
        ) {
            (Some(va), Some(api_key)) => (va, api_key),
            _ => {
                return Err(AppError::BadRequest(
                    "iPaymu gateway is not configured".to_string(),
                ))
            }
        };

        let supplied = signature_header.ok_or_else(|| {
            AppError::InvalidSignature("Missing signature header".to_string())
        })?;

        if !signature::verify_ipaymu_signature(va, api_key, raw_body, supplied) {
            return Err(AppError::InvalidSignature(
                "iPaymu signature mismatch".to_string(),
            ));
        }

        let payload: serde_json::Value = serde_json::from_slice(raw_body)
            .map_err(|e| AppError::BadRequest(format!("Malformed notification: {}", e)))?;
        let notif: IpaymuNotification = serde_json::from_value(payload.clone())
            .map_err(|e| AppError::BadRequest(format!("Malformed notification: {}", e)))?;

        let status = ipaymu::map_status(&notif.status);
        let meta = NotificationMeta {
            gateway: PaymentGateway::Ipaymu,
            raw_payload: payload,
            gateway_transaction_id: notif.transaction_id(),
            reported_method: notif.method(),
            reported_amount: notif.amount_rupiah(),
        };

        self.reconcile(&notif.reference_id, status, meta).await
    }

    async fn reconcile(
        &self,
        order_id: &str,
        status: PaymentStatus,
        meta: NotificationMeta,
    ) -> Result<ReconciliationOutcome> {
        tracing::info!(
            order_id = %order_id,
            status = ?status,
            gateway = ?meta.gateway,
            "Webhook notification received"
        );

        if let Some(existing) = self.store.find_payment(order_id).await? {
            if existing.status == status {
                tracing::debug!(order_id = %order_id, "Replayed notification; no state change");
                return Ok(ReconciliationOutcome::Replayed(existing));
            }

            // A payment that completes before it was ever linked still
            // needs the registration/member commit from the cached intent.
            if status == PaymentStatus::Completed && !existing.is_linked() {
                if let Some(intent) = self.cache.get(order_id).await? {
                    let outcome = self.settle(order_id, intent, &meta).await?;
                    self.cache.delete(order_id).await?;
                    return Ok(outcome);
                }
            }

            let updated = self
                .store
                .record_status_change(
                    order_id,
                    StatusChange {
                        status,
                        raw_payload: meta.raw_payload,
                        gateway_transaction_id: meta.gateway_transaction_id,
                        method: meta.reported_method,
                    },
                )
                .await?;
            tracing::info!(order_id = %order_id, status = ?status, "Payment status updated");
            return Ok(ReconciliationOutcome::Updated(updated));
        }

        match self.cache.get(order_id).await? {
            None => {
                // Intent expired or was never stored. Keep the
                // money-relevant event as an audit row and stop; this
                // path never creates a registration or member.
                tracing::warn!(
                    order_id = %order_id,
                    "No cached intent for notification; recording audit-only payment"
                );
                let stub = self
                    .store
                    .insert_payment(NewPayment {
                        order_id: order_id.to_string(),
                        email: String::new(),
                        amount: meta.reported_amount,
                        currency: "IDR".to_string(),
                        method: meta.reported_method,
                        gateway: Some(meta.gateway),
                        status,
                        raw_payload: Some(meta.raw_payload),
                        gateway_transaction_id: meta.gateway_transaction_id,
                    })
                    .await?;
                Ok(ReconciliationOutcome::Orphaned(stub))
            }
            Some(intent) if status != PaymentStatus::Completed => {
                // Payment not yet guaranteed: record it, keep the intent
                // cached for the settlement that may still come.
                let payment = self
                    .store
                    .insert_payment(NewPayment {
                        order_id: order_id.to_string(),
                        email: intent.email().to_string(),
                        amount: intent.amount(),
                        currency: "IDR".to_string(),
                        method: Some(intent.method()),
                        gateway: Some(meta.gateway),
                        status,
                        raw_payload: Some(meta.raw_payload),
                        gateway_transaction_id: meta.gateway_transaction_id,
                    })
                    .await?;
                Ok(ReconciliationOutcome::Recorded(payment))
            }
            Some(intent) => {
                let outcome = self.settle(order_id, intent, &meta).await?;
                // Only after the commit; a failed settlement leaves the
                // entry for the gateway's redelivery to retry.
                self.cache.delete(order_id).await?;
                Ok(outcome)
            }
        }
    }

    async fn settle(
        &self,
        order_id: &str,
        intent: RegistrationIntent,
        meta: &NotificationMeta,
    ) -> Result<ReconciliationOutcome> {
        match intent {
            RegistrationIntent::Program(program_intent) => {
                let settlement = self
                    .store
                    .settle_program(order_id, &program_intent, meta)
                    .await?;
                tracing::info!(
                    order_id = %order_id,
                    registration_id = %settlement.registration.id,
                    "Program registration settled"
                );
                Ok(ReconciliationOutcome::Program(settlement))
            }
            RegistrationIntent::Membership(membership_intent) => {
                let settlement = self
                    .store
                    .settle_membership(order_id, &membership_intent, meta)
                    .await?;
                tracing::info!(
                    order_id = %order_id,
                    member_id = %settlement.member.id,
                    "Membership settled"
                );
                Ok(ReconciliationOutcome::Membership(settlement))
            }
        }
    }
}
